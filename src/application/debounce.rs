//! Debounced search input.
//!
//! Every keystroke cancels the pending delayed task and schedules a new one;
//! only a value left untouched for the whole delay becomes the settled search
//! that participates in query keys.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct SearchDebouncer {
    delay: Duration,
    raw: String,
    settled: Arc<watch::Sender<String>>,
    pending: Option<JoinHandle<()>>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        let (settled, _) = watch::channel(String::new());
        Self {
            delay,
            raw: String::new(),
            settled: Arc::new(settled),
            pending: None,
        }
    }

    /// Record new raw input and restart the delay. Must run inside a tokio
    /// runtime.
    pub fn input(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
        self.cancel();

        let settled = Arc::clone(&self.settled);
        let value = self.raw.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            publish(&settled, value);
        }));
    }

    /// Settle the current raw input immediately.
    pub fn flush(&mut self) {
        self.cancel();
        publish(&self.settled, self.raw.clone());
    }

    /// Drop pending input and settle on the empty string.
    pub fn clear(&mut self) {
        self.raw.clear();
        self.flush();
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn settled(&self) -> String {
        self.settled.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.settled.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn publish(settled: &watch::Sender<String>, value: String) {
    settled.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        debug!(search = %value, "Search input settled");
        *current = value;
        true
    });
}
