//! Windowed fetcher.
//!
//! Serves a window from the cache when it is fresh and otherwise requests it
//! from the backend under a fetch ticket, so a response that lost its ticket
//! to a newer fetch or an optimistic write never reaches the store.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, instrument, warn};

use crate::application::error::AppError;
use crate::application::repos::ItemsApi;
use crate::cache::{CacheEntry, Freshness, ItemCacheStore, QueryKey};

pub(crate) const METRIC_WINDOW_HIT: &str = "itembank_window_hit_total";
pub(crate) const METRIC_WINDOW_MISS: &str = "itembank_window_miss_total";
pub(crate) const METRIC_FETCH_MS: &str = "itembank_fetch_ms";

#[derive(Clone)]
pub struct WindowFetcher {
    api: Arc<dyn ItemsApi>,
    store: Arc<ItemCacheStore>,
}

impl WindowFetcher {
    pub fn new(api: Arc<dyn ItemsApi>, store: Arc<ItemCacheStore>) -> Self {
        Self { api, store }
    }

    pub fn store(&self) -> &Arc<ItemCacheStore> {
        &self.store
    }

    /// Return the window for `key`, fetching only when absent or stale.
    pub async fn ensure(&self, key: &QueryKey) -> Result<Arc<CacheEntry>, AppError> {
        if self.store.freshness(key) == Freshness::Fresh
            && let Some(entry) = self.store.get(key)
        {
            counter!(METRIC_WINDOW_HIT).increment(1);
            debug!(offset = key.offset(), limit = key.limit(), "Window served from cache");
            return Ok(entry);
        }

        counter!(METRIC_WINDOW_MISS).increment(1);
        debug!(offset = key.offset(), limit = key.limit(), "Window missing or stale");
        self.fetch(key).await
    }

    /// Request `key` from the backend unconditionally.
    ///
    /// When the ticket was retired while the request was in flight, the
    /// response is dropped and whatever the store now holds is returned.
    #[instrument(skip(self), fields(offset = key.offset(), limit = key.limit(), trash = key.show_deleted()))]
    pub async fn fetch(&self, key: &QueryKey) -> Result<Arc<CacheEntry>, AppError> {
        let started_at = Instant::now();
        let ticket = self.store.begin_fetch(key);
        let request = key.to_request();

        let page = match self.api.list_items(&request).await {
            Ok(page) => page,
            Err(err) => {
                self.store.abandon_fetch(&ticket);
                warn!(error = %err, "Window fetch failed");
                return Err(err.into());
            }
        };
        histogram!(METRIC_FETCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        let entry = CacheEntry::new(page.items, page.total, key.limit(), key.offset());
        if let Some(stored) = self.store.commit_fetch(&ticket, entry.clone()) {
            return Ok(stored);
        }
        Ok(self.store.get(key).unwrap_or_else(|| Arc::new(entry)))
    }
}
