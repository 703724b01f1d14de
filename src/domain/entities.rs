//! Domain entities mirrored from the item bank backend.

use itembank_api_types::ItemPayload;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{Difficulty, ItemStatus, ItemType, Scope};

/// An item as held in the client cache.
///
/// Records are never mutated once cached; every cache transition builds new
/// records through the `with_*` helpers so snapshots taken earlier stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: Uuid,
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub statement: Value,
    pub structure: Value,
    pub resolution: Option<Value>,
    pub scope: Scope,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub deleted_at: Option<OffsetDateTime>,
}

impl ItemRecord {
    /// Timestamp the collection is ordered by: last update, else creation.
    pub fn touched_at(&self) -> OffsetDateTime {
        self.updated_at.unwrap_or(self.created_at)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Copy of this record carrying the given soft-deletion marker.
    pub fn with_deleted_at(&self, deleted_at: Option<OffsetDateTime>) -> Self {
        Self {
            deleted_at,
            ..self.clone()
        }
    }
}

impl From<ItemPayload> for ItemRecord {
    fn from(payload: ItemPayload) -> Self {
        Self {
            id: payload.id,
            item_type: payload.item_type,
            status: payload.status,
            difficulty: payload.difficulty,
            tags: payload.tags,
            statement: payload.statement,
            structure: payload.structure,
            resolution: payload.resolution,
            scope: Scope::from_organization(payload.organization_id),
            created_at: payload.created_at,
            updated_at: payload.updated_at,
            deleted_at: payload.deleted_at,
        }
    }
}

impl From<&ItemRecord> for ItemPayload {
    fn from(record: &ItemRecord) -> Self {
        Self {
            id: record.id,
            item_type: record.item_type,
            status: record.status,
            difficulty: record.difficulty,
            tags: record.tags.clone(),
            statement: record.statement.clone(),
            structure: record.structure.clone(),
            resolution: record.resolution.clone(),
            organization_id: record.scope.organization_id(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted_at: record.deleted_at,
        }
    }
}
