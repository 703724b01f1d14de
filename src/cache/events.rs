//! Reconcile event queue.
//!
//! Mutations publish events here after the server acknowledges them; the
//! reconcile consumer drains the queue and replaces optimistic windows with
//! authoritative data.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;
use uuid::Uuid;

use crate::domain::types::Scope;

use super::keys::QueryKey;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

/// Monotonic epoch for ordering events within this process.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: EventKind,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Refetch one window that carries optimistic edits.
    Reconcile { key: QueryKey },
    /// Mark every cached window of a scope stale without refetching.
    InvalidateScope { scope: Scope },
}

/// In-memory FIFO of reconcile events.
pub struct ReconcileQueue {
    queue: Mutex<VecDeque<CacheEvent>>,
    epoch_counter: AtomicU64,
}

impl ReconcileQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish(&self, kind: EventKind) {
        let event = CacheEvent::new(kind, self.next_epoch());

        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = ?event.kind,
            "Reconcile event enqueued"
        );

        mutex_lock(&self.queue, SOURCE, "publish").push_back(event);
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<CacheEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        queue.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReconcileQueue {
    fn default() -> Self {
        Self::new()
    }
}
