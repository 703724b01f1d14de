//! Reconcile consumer.
//!
//! Drains reconcile events and refetches the windows that carry optimistic
//! edits so they are replaced by authoritative server data. A failed refetch
//! is logged and otherwise ignored: the optimistic state stays in place and
//! is locally consistent.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::fetcher::WindowFetcher;

use super::config::CacheConfig;
use super::events::{EventKind, ReconcileQueue};
use super::keys::QueryKey;
use super::store::ItemCacheStore;

pub(crate) const METRIC_RECONCILE_MS: &str = "itembank_reconcile_ms";
pub(crate) const METRIC_RECONCILE_FAILED: &str = "itembank_reconcile_failed_total";

pub struct ReconcileConsumer {
    config: CacheConfig,
    store: Arc<ItemCacheStore>,
    queue: Arc<ReconcileQueue>,
    fetcher: WindowFetcher,
}

impl ReconcileConsumer {
    pub fn new(
        config: CacheConfig,
        store: Arc<ItemCacheStore>,
        queue: Arc<ReconcileQueue>,
        fetcher: WindowFetcher,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            fetcher,
        }
    }

    /// Consume one batch of pending events.
    ///
    /// Returns true if any events were processed.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> bool {
        let started_at = Instant::now();
        let events = self
            .queue
            .drain(self.config.reconcile_batch_limit_non_zero().get());
        if events.is_empty() {
            return false;
        }

        let event_count = events.len();
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        info!(event_count, event_ids = ?event_ids, "Reconciliation starting");

        let mut seen = HashSet::new();
        let mut refetch: Vec<QueryKey> = Vec::new();
        for event in events {
            match event.kind {
                EventKind::InvalidateScope { scope } => {
                    let marked = self.store.invalidate_scope(scope);
                    debug!(marked, %scope, "Marked scope windows stale");
                }
                EventKind::Reconcile { key } => {
                    if seen.insert(key.clone()) {
                        refetch.push(key);
                    }
                }
            }
        }

        let mut failed = 0usize;
        for key in &refetch {
            // Windows evicted or rolled back to absence are rebuilt on demand.
            if self.store.snapshot(key).is_none() {
                continue;
            }
            if let Err(err) = self.fetcher.fetch(key).await {
                failed += 1;
                counter!(METRIC_RECONCILE_FAILED).increment(1);
                warn!(
                    error = %err,
                    offset = key.offset(),
                    trash = key.show_deleted(),
                    "Reconciliation refetch failed; keeping optimistic window"
                );
            }
        }

        info!(
            event_count,
            refetched = refetch.len() - failed,
            failed,
            "Reconciliation complete"
        );
        histogram!(METRIC_RECONCILE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        true
    }

    /// Consume until the queue is empty.
    pub async fn consume_all(&self) -> usize {
        let mut passes = 0;
        while self.consume().await {
            passes += 1;
        }
        passes
    }

    pub fn queue(&self) -> &Arc<ReconcileQueue> {
        &self.queue
    }

    pub fn store(&self) -> &Arc<ItemCacheStore> {
        &self.store
    }
}
