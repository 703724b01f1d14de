//! Shared domain enumerations and the tenant scope.

use std::fmt;

use uuid::Uuid;

pub use itembank_api_types::{Difficulty, ItemStatus, ItemType};

/// Tenant partition restricting which items are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Items owned by the signed-in user outside any organization.
    #[default]
    Personal,
    Organization(Uuid),
}

impl Scope {
    pub fn organization_id(self) -> Option<Uuid> {
        match self {
            Scope::Personal => None,
            Scope::Organization(id) => Some(id),
        }
    }

    pub fn from_organization(id: Option<Uuid>) -> Self {
        id.map_or(Scope::Personal, Scope::Organization)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Personal => f.write_str("personal"),
            Scope::Organization(id) => write!(f, "organization:{id}"),
        }
    }
}
