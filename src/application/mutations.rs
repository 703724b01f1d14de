//! Mutation coordinator.
//!
//! Runs optimistic commands against the cache and the backend. On success the
//! touched windows are queued for reconciliation; on failure both windows are
//! rolled back to their snapshots and the error is surfaced without retry.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, instrument, warn};

use crate::application::command::{AppliedEffect, MutationKind, OptimisticCommand};
use crate::application::error::{AppError, ErrorKind};
use crate::application::repos::ItemsApi;
use crate::cache::{EventKind, ItemCacheStore, QueryKey, ReconcileQueue};
use crate::domain::entities::ItemRecord;
use crate::domain::items::ItemIds;

pub(crate) const METRIC_OPTIMISTIC_APPLY: &str = "itembank_optimistic_apply_total";
pub(crate) const METRIC_ROLLBACK: &str = "itembank_rollback_total";

/// Server acknowledgement of a dispatched command.
#[derive(Debug, Clone)]
pub struct MutationReceipt {
    pub kind: MutationKind,
    pub ids: ItemIds,
    pub count: u64,
    /// Records returned by the server; empty for permanent deletion.
    pub items: Vec<ItemRecord>,
    pub target: QueryKey,
    pub paired: Option<QueryKey>,
}

pub struct MutationCoordinator {
    api: Arc<dyn ItemsApi>,
    store: Arc<ItemCacheStore>,
    queue: Arc<ReconcileQueue>,
}

impl MutationCoordinator {
    pub fn new(
        api: Arc<dyn ItemsApi>,
        store: Arc<ItemCacheStore>,
        queue: Arc<ReconcileQueue>,
    ) -> Self {
        Self { api, store, queue }
    }

    /// Apply the forward effect synchronously.
    pub fn apply(&self, command: &mut OptimisticCommand) -> AppliedEffect {
        counter!(METRIC_OPTIMISTIC_APPLY, "kind" => command.kind().as_str()).increment(1);
        command.apply(&self.store)
    }

    /// Send the command to the backend. An unapplied command is applied first.
    #[instrument(skip(self, command), fields(kind = command.kind().as_str(), ids = command.ids().len()))]
    pub async fn dispatch(&self, mut command: OptimisticCommand) -> Result<MutationReceipt, AppError> {
        if !command.is_applied() {
            self.apply(&mut command);
        }

        let ids = command.id_list();
        let result = match command.kind() {
            MutationKind::Delete => self
                .api
                .delete_many(&ids)
                .await
                .map(|outcome| (outcome.count, outcome.items)),
            MutationKind::Restore => self
                .api
                .restore(&ids)
                .await
                .map(|outcome| (outcome.count, outcome.items)),
            MutationKind::PermanentDelete => self
                .api
                .permanent_delete(&ids)
                .await
                .map(|count| (count, Vec::new())),
        };

        match result {
            Ok((count, items)) => {
                info!(count, "Mutation acknowledged");
                command.release(&self.store);
                self.schedule_reconcile(&command);
                Ok(MutationReceipt {
                    kind: command.kind(),
                    ids: command.ids().clone(),
                    count,
                    items,
                    target: command.target().clone(),
                    paired: command.paired().cloned(),
                })
            }
            Err(err) => {
                let error = AppError::from(err);
                command.rollback(&self.store);
                command.release(&self.store);
                counter!(METRIC_ROLLBACK, "kind" => command.kind().as_str()).increment(1);
                warn!(error = %error, "Mutation rejected; optimistic effect rolled back");
                if error.kind() == ErrorKind::NotFound {
                    self.schedule_reconcile(&command);
                }
                Err(error)
            }
        }
    }

    fn schedule_reconcile(&self, command: &OptimisticCommand) {
        self.queue.publish(EventKind::InvalidateScope {
            scope: command.target().filter().scope(),
        });
        for key in command.affected_keys() {
            self.queue.publish(EventKind::Reconcile { key });
        }
    }

    pub fn queue(&self) -> &Arc<ReconcileQueue> {
        &self.queue
    }
}
