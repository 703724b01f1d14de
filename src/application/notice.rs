//! User-facing notices (toasts) produced by the item bank.

use std::time::Duration;

use uuid::Uuid;

use crate::application::command::MutationKind;
use crate::application::error::AppError;

const DEFAULT_NOTICE_TTL: Duration = Duration::from_millis(6000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeKind::Success => "success",
            NoticeKind::Info => "info",
            NoticeKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: Uuid,
    pub kind: NoticeKind,
    pub text: String,
    pub ttl: Duration,
    /// Set when the notice offers an undo for the ids it reports on.
    pub undo_ids: Option<Vec<Uuid>>,
}

impl Notice {
    fn new(kind: NoticeKind, text: impl Into<String>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            text: text.into(),
            ttl,
            undo_ids: None,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, text, DEFAULT_NOTICE_TTL)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, text, DEFAULT_NOTICE_TTL)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, text, DEFAULT_NOTICE_TTL)
    }

    pub fn from_error(error: &AppError) -> Self {
        Self::error(error.notice_message())
    }

    /// Confirmation for an acknowledged mutation, e.g. "2 items deleted".
    pub fn mutation(kind: MutationKind, count: u64) -> Self {
        Self::success(format!("{} {}", item_count(count), kind.past_tense()))
    }

    /// Attach an undo offer that lives as long as the undo token.
    pub fn with_undo(mut self, ids: Vec<Uuid>, ttl: Duration) -> Self {
        self.undo_ids = Some(ids);
        self.ttl = ttl;
        self
    }
}

/// "1 item" / "N items".
pub fn item_count(count: u64) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{count} items")
    }
}
