//! Keyboard shortcuts consumed from the host UI.

use crate::application::error::AppError;

/// Word the user must type to confirm permanent deletion.
pub const PERMANENT_DELETE_WORD: &str = "DELETE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    SelectAll,
    Delete,
}

impl Shortcut {
    /// Map a key event to a shortcut. Ctrl+A selects the page; Delete asks to
    /// delete the selection.
    pub fn from_key(key: &str, ctrl: bool) -> Option<Self> {
        match key {
            "a" | "A" if ctrl => Some(Shortcut::SelectAll),
            "Delete" => Some(Shortcut::Delete),
            _ => None,
        }
    }
}

/// Request for the host to show a delete confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub count: usize,
    /// Trash view deletions are permanent and need the typed word.
    pub permanent: bool,
}

impl DeleteConfirmation {
    pub fn accepts(&self, typed: &str) -> bool {
        !self.permanent || typed == PERMANENT_DELETE_WORD
    }

    pub fn check(&self, typed: &str) -> Result<(), AppError> {
        if self.accepts(typed) {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "type {PERMANENT_DELETE_WORD} to confirm permanent deletion"
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutOutcome {
    /// A text input had focus.
    Suppressed,
    /// Nothing to act on.
    Ignored,
    /// Page items were added to the selection.
    Selected(usize),
    ConfirmDelete(DeleteConfirmation),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_mapping() {
        assert_eq!(Shortcut::from_key("a", true), Some(Shortcut::SelectAll));
        assert_eq!(Shortcut::from_key("a", false), None);
        assert_eq!(Shortcut::from_key("Delete", false), Some(Shortcut::Delete));
        assert_eq!(Shortcut::from_key("Backspace", false), None);
    }

    #[test]
    fn permanent_confirmation_requires_exact_word() {
        let soft = DeleteConfirmation {
            count: 2,
            permanent: false,
        };
        assert!(soft.accepts(""));

        let hard = DeleteConfirmation {
            count: 2,
            permanent: true,
        };
        assert!(hard.accepts("DELETE"));
        assert!(!hard.accepts("delete"));
        assert!(matches!(hard.check("nope"), Err(AppError::Validation(_))));
    }
}
