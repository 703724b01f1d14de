//! Keyed window store for the item cache.
//!
//! Each entry holds one fetched window of a filtered view. Entries are
//! immutable once stored: every transition swaps in a new `Arc<CacheEntry>`,
//! so an `Arc` taken before a write is a valid snapshot for rollback.
//!
//! The store also tracks at most one live fetch per key. Starting or
//! cancelling a fetch retires any older ticket, and a retired ticket can no
//! longer commit its response. While an optimistic mutation on a key awaits
//! the server, no fetch response for that key is committed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::domain::entities::ItemRecord;
use crate::domain::types::Scope;

use super::config::CacheConfig;
use super::keys::QueryKey;
use super::lock::{mutex_lock, rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_EVICT: &str = "itembank_cache_evict_total";
pub(crate) const METRIC_FETCH_DISCARDED: &str = "itembank_cache_fetch_discarded_total";

/// One cached window: a slice of the server collection plus its count.
///
/// `total` is the server's count for the whole filter and is independent of
/// how many items the window holds.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub items: Vec<ItemRecord>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl CacheEntry {
    /// Build an entry, dropping items beyond `limit`.
    pub fn new(mut items: Vec<ItemRecord>, total: u64, limit: u32, offset: u32) -> Self {
        items.truncate(limit as usize);
        Self {
            items,
            total,
            limit,
            offset,
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.items.iter().any(|item| item.id == *id)
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.items.iter().map(|item| item.id).collect()
    }
}

/// A stored entry with the metadata needed to put it back verbatim.
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    entry: Arc<CacheEntry>,
    stored_at: Instant,
    stale: bool,
}

impl EntrySnapshot {
    pub fn entry(&self) -> &Arc<CacheEntry> {
        &self.entry
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Missing,
    Stale,
    Fresh,
}

/// Proof that a fetch was started; only the newest ticket per key commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Item cache keyed by [`QueryKey`], with LRU eviction.
pub struct ItemCacheStore {
    entries: RwLock<LruCache<QueryKey, EntrySnapshot>>,
    // Only keys with a live fetch are present.
    live_fetches: Mutex<HashMap<QueryKey, u64>>,
    // Keys written optimistically whose mutation is still in flight.
    pending_mutations: Mutex<HashMap<QueryKey, usize>>,
    next_generation: AtomicU64,
    stale_after: Duration,
}

impl ItemCacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.entry_limit_non_zero())),
            live_fetches: Mutex::new(HashMap::new()),
            pending_mutations: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            stale_after: config.stale_after(),
        }
    }

    // ========================================================================
    // Entry access
    // ========================================================================

    pub fn get(&self, key: &QueryKey) -> Option<Arc<CacheEntry>> {
        rw_write(&self.entries, SOURCE, "get")
            .get(key)
            .map(|slot| Arc::clone(&slot.entry))
    }

    /// Full snapshot of the stored slot, without touching LRU order.
    pub fn snapshot(&self, key: &QueryKey) -> Option<EntrySnapshot> {
        rw_read(&self.entries, SOURCE, "snapshot").peek(key).cloned()
    }

    pub fn freshness(&self, key: &QueryKey) -> Freshness {
        match rw_read(&self.entries, SOURCE, "freshness").peek(key) {
            None => Freshness::Missing,
            Some(slot) if slot.stale || slot.stored_at.elapsed() >= self.stale_after => {
                Freshness::Stale
            }
            Some(_) => Freshness::Fresh,
        }
    }

    pub fn set(&self, key: QueryKey, entry: CacheEntry) -> Arc<CacheEntry> {
        let entry = Arc::new(entry);
        let slot = EntrySnapshot {
            entry: Arc::clone(&entry),
            stored_at: Instant::now(),
            stale: false,
        };
        self.put(key, slot, "set");
        entry
    }

    /// Replace an optimistic entry while keeping the original fetch time.
    pub(crate) fn replace_entry(&self, key: &QueryKey, entry: CacheEntry) -> Option<Arc<CacheEntry>> {
        let mut entries = rw_write(&self.entries, SOURCE, "replace_entry");
        let slot = entries.peek_mut(key)?;
        slot.entry = Arc::new(entry);
        Some(Arc::clone(&slot.entry))
    }

    /// Put a snapshot back verbatim. `None` removes whatever is stored now.
    pub fn restore(&self, key: &QueryKey, snapshot: Option<EntrySnapshot>) {
        match snapshot {
            Some(slot) => self.put(key.clone(), slot, "restore"),
            None => {
                rw_write(&self.entries, SOURCE, "restore.remove").pop(key);
            }
        }
    }

    /// Mark an entry stale; it is still served until a refetch replaces it.
    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(slot) = rw_write(&self.entries, SOURCE, "invalidate").peek_mut(key) {
            slot.stale = true;
        }
    }

    /// Mark every window of every view in `scope` stale. Returns how many
    /// were marked.
    pub fn invalidate_scope(&self, scope: Scope) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_scope");
        let mut marked = 0;
        for (key, slot) in entries.iter_mut() {
            if key.filter().scope() == scope {
                slot.stale = true;
                marked += 1;
            }
        }
        marked
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put(&self, key: QueryKey, slot: EntrySnapshot, op: &'static str) {
        let displaced = rw_write(&self.entries, SOURCE, op).push(key.clone(), slot);
        if let Some((displaced_key, _)) = displaced
            && displaced_key != key
        {
            counter!(METRIC_EVICT).increment(1);
            debug!(evicted = ?displaced_key, "Evicted least recently used window");
        }
    }

    // ========================================================================
    // Fetch generations
    // ========================================================================

    /// Start a fetch for `key`, retiring any fetch already live for it.
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        mutex_lock(&self.live_fetches, SOURCE, "begin_fetch").insert(key.clone(), generation);
        FetchTicket {
            key: key.clone(),
            generation,
        }
    }

    /// Retire the live fetch for `key`, if any. Its response will be dropped.
    pub fn cancel(&self, key: &QueryKey) -> bool {
        mutex_lock(&self.live_fetches, SOURCE, "cancel")
            .remove(key)
            .is_some()
    }

    /// Store a fetched window if `ticket` is still the live fetch for its key
    /// and no mutation on that key is awaiting the server.
    pub fn commit_fetch(&self, ticket: &FetchTicket, entry: CacheEntry) -> Option<Arc<CacheEntry>> {
        {
            let mut live = mutex_lock(&self.live_fetches, SOURCE, "commit_fetch");
            if live.get(&ticket.key) != Some(&ticket.generation) {
                counter!(METRIC_FETCH_DISCARDED).increment(1);
                debug!(
                    key = ?ticket.key,
                    generation = ticket.generation,
                    "Discarded response from a retired fetch"
                );
                return None;
            }
            live.remove(&ticket.key);
        }
        if self.is_mutation_pending(&ticket.key) {
            counter!(METRIC_FETCH_DISCARDED).increment(1);
            debug!(
                key = ?ticket.key,
                generation = ticket.generation,
                "Discarded response overlapping an in-flight mutation"
            );
            return None;
        }
        Some(self.set(ticket.key.clone(), entry))
    }

    /// Release a failed fetch without touching the stored entry.
    pub fn abandon_fetch(&self, ticket: &FetchTicket) {
        let mut live = mutex_lock(&self.live_fetches, SOURCE, "abandon_fetch");
        if live.get(&ticket.key) == Some(&ticket.generation) {
            live.remove(&ticket.key);
        }
    }

    pub fn is_fetching(&self) -> bool {
        !mutex_lock(&self.live_fetches, SOURCE, "is_fetching").is_empty()
    }

    pub fn is_fetching_key(&self, key: &QueryKey) -> bool {
        mutex_lock(&self.live_fetches, SOURCE, "is_fetching_key").contains_key(key)
    }

    // ========================================================================
    // Pending mutations
    // ========================================================================

    /// Hold `key` for an optimistic write. Live fetches are retired and later
    /// responses are dropped until every hold is released.
    pub fn begin_mutation(&self, key: &QueryKey) {
        self.cancel(key);
        *mutex_lock(&self.pending_mutations, SOURCE, "begin_mutation")
            .entry(key.clone())
            .or_insert(0) += 1;
    }

    /// Release one hold taken by [`ItemCacheStore::begin_mutation`].
    ///
    /// Fetches started while the mutation was in flight may have read the
    /// server before it applied the change, so they are retired too.
    pub fn end_mutation(&self, key: &QueryKey) {
        {
            let mut pending = mutex_lock(&self.pending_mutations, SOURCE, "end_mutation");
            match pending.get_mut(key) {
                Some(count) if *count > 1 => *count -= 1,
                Some(_) => {
                    pending.remove(key);
                }
                None => return,
            }
        }
        self.cancel(key);
    }

    pub fn is_mutation_pending(&self, key: &QueryKey) -> bool {
        mutex_lock(&self.pending_mutations, SOURCE, "is_mutation_pending").contains_key(key)
    }
}
