//! Item bank cache.
//!
//! A volatile, process-local mirror of the paginated item collection. Each
//! entry holds one fetched window of one filtered view, addressed by a
//! [`QueryKey`]. The active and trash views of the same filter are cached
//! independently; optimistic mutations keep them in step and the reconcile
//! consumer replaces optimistic windows with server data afterwards.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! prefetch_multiplier = 3
//! entry_limit = 64
//! stale_after_ms = 30000
//! ```

mod config;
mod consumer;
mod events;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use consumer::ReconcileConsumer;
pub use events::{CacheEvent, Epoch, EventKind, ReconcileQueue};
pub use keys::{ItemFilter, QueryKey};
pub use store::{CacheEntry, EntrySnapshot, FetchTicket, Freshness, ItemCacheStore};

pub(crate) use consumer::{METRIC_RECONCILE_FAILED, METRIC_RECONCILE_MS};
pub(crate) use lock::mutex_lock;
pub(crate) use store::{METRIC_EVICT, METRIC_FETCH_DISCARDED};
