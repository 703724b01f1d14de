//! Pending undo token for the most recent delete.

use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::application::command::OptimisticCommand;
use crate::application::error::AppError;
use crate::cache::QueryKey;
use crate::domain::entities::ItemRecord;
use crate::domain::items::ItemIds;

pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_millis(5_000);

/// What invoking the token does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    /// Restore from the trash head window; restored rows are prepended to the
    /// head window of the active view.
    Restore { trash: QueryKey, active: QueryKey },
}

/// Time-bounded handle to reverse a confirmed delete.
#[derive(Debug, Clone)]
pub struct PendingUndo {
    ids: ItemIds,
    items: Vec<ItemRecord>,
    expires_at: Instant,
    action: UndoAction,
}

impl PendingUndo {
    pub fn new(ids: ItemIds, items: Vec<ItemRecord>, action: UndoAction, lifetime: Duration) -> Self {
        Self {
            ids,
            items,
            expires_at: Instant::now() + lifetime,
            action,
        }
    }

    pub fn ids(&self) -> &[Uuid] {
        self.ids.as_slice()
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn action(&self) -> &UndoAction {
        &self.action
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Build the restore command this token stands for.
    pub fn into_command(self) -> Result<OptimisticCommand, AppError> {
        if self.is_expired() {
            return Err(AppError::validation("undo window has expired"));
        }
        match self.action {
            UndoAction::Restore { trash, active } => {
                Ok(OptimisticCommand::restore(self.ids, trash, active)?.with_known_items(self.items))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command::MutationKind;
    use crate::cache::ItemFilter;
    use crate::domain::types::Scope;

    fn token(lifetime: Duration) -> PendingUndo {
        let active = ItemFilter::active(Scope::Personal).window(30, 0);
        let trash = active.sibling_head();
        let ids = ItemIds::new([Uuid::new_v4(), Uuid::new_v4()]).expect("ids");
        PendingUndo::new(ids, Vec::new(), UndoAction::Restore { trash, active }, lifetime)
    }

    #[tokio::test(start_paused = true)]
    async fn token_expires_after_lifetime() {
        let pending = token(DEFAULT_UNDO_WINDOW);
        assert!(!pending.is_expired());
        assert_eq!(pending.remaining(), DEFAULT_UNDO_WINDOW);

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(!pending.is_expired());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(pending.is_expired());
        assert_eq!(pending.remaining(), Duration::ZERO);

        let err = pending.into_command().expect_err("expired");
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn live_token_builds_restore_command() {
        let pending = token(DEFAULT_UNDO_WINDOW);
        let ids = pending.ids().to_vec();

        let command = pending.into_command().expect("live token");
        assert_eq!(command.kind(), MutationKind::Restore);
        assert!(command.target().show_deleted());
        assert_eq!(command.id_list(), ids);
    }
}
