//! Cache configuration.
//!
//! Controls the window size and retention of the item cache via `itembank.toml`.

use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_PREFETCH_MULTIPLIER: u32 = 3;
const DEFAULT_ENTRY_LIMIT: usize = 64;
const DEFAULT_STALE_AFTER_MS: u64 = 30_000;
const DEFAULT_RECONCILE_BATCH_LIMIT: usize = 16;

/// Cache configuration from `itembank.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How many UI pages one fetched window spans.
    pub prefetch_multiplier: u32,
    /// Maximum cached windows before least-recently-used eviction.
    pub entry_limit: usize,
    /// Age (ms) after which a window is refetched on next access.
    pub stale_after_ms: u64,
    /// Maximum reconcile events drained per consumption pass.
    pub reconcile_batch_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefetch_multiplier: DEFAULT_PREFETCH_MULTIPLIER,
            entry_limit: DEFAULT_ENTRY_LIMIT,
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
            reconcile_batch_limit: DEFAULT_RECONCILE_BATCH_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            prefetch_multiplier: settings.prefetch_multiplier.get(),
            entry_limit: settings.entry_limit.get(),
            stale_after_ms: settings.stale_after.as_millis().try_into().unwrap_or(u64::MAX),
            reconcile_batch_limit: settings.reconcile_batch_limit.get(),
        }
    }
}

impl CacheConfig {
    /// Returns the prefetch multiplier, clamping to 1 if zero.
    pub fn prefetch_multiplier_non_zero(&self) -> NonZeroU32 {
        NonZeroU32::new(self.prefetch_multiplier).unwrap_or(NonZeroU32::MIN)
    }

    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    pub fn reconcile_batch_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.reconcile_batch_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
