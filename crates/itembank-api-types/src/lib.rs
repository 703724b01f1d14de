//! Shared request and response types for the item bank API.
//!
//! The dashboard client and the backend agree on these shapes; nothing here
//! carries behaviour beyond serialization and a few label helpers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// Content kinds an item can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    McqSingle,
    McqMultiple,
    TrueFalse,
    TrueFalseMulti,
    FillBlank,
    Matching,
}

impl ItemType {
    pub const ALL: [ItemType; 6] = [
        ItemType::McqSingle,
        ItemType::McqMultiple,
        ItemType::TrueFalse,
        ItemType::TrueFalseMulti,
        ItemType::FillBlank,
        ItemType::Matching,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::McqSingle => "mcq_single",
            ItemType::McqMultiple => "mcq_multiple",
            ItemType::TrueFalse => "true_false",
            ItemType::TrueFalseMulti => "true_false_multi",
            ItemType::FillBlank => "fill_blank",
            ItemType::Matching => "matching",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ItemType::McqSingle => "Multiple choice",
            ItemType::McqMultiple => "Multiple select",
            ItemType::TrueFalse => "True/False",
            ItemType::TrueFalseMulti => "Multi True/False",
            ItemType::FillBlank => "Fill in the blanks",
            ItemType::Matching => "Matching",
        }
    }
}

impl TryFrom<&str> for ItemType {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ItemType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or(())
    }
}

/// Editorial status of an item. Soft deletion is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Draft,
    Published,
    Archived,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Draft => "draft",
            ItemStatus::Published => "published",
            ItemStatus::Archived => "archived",
        }
    }
}

impl TryFrom<&str> for ItemStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "draft" => Ok(ItemStatus::Draft),
            "published" => Ok(ItemStatus::Published),
            "archived" => Ok(ItemStatus::Archived),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// An item as transferred over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub status: ItemStatus,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub statement: Value,
    #[serde(default)]
    pub structure: Value,
    #[serde(default)]
    pub resolution: Option<Value>,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

/// Query accepted by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<Uuid>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub show_deleted: bool,
    pub limit: u32,
    pub offset: u32,
}

/// One window of the collection plus the authoritative count for the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItemsResponse {
    pub items: Vec<ItemPayload>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIdsRequest {
    pub ids: Vec<Uuid>,
}

/// Response of `deleteMany` and `restore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResponse {
    pub count: u64,
    #[serde(default)]
    pub items: Vec<ItemPayload>,
}

/// Response of `permanentDelete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub count: u64,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn payload_uses_camel_case_and_type_field() {
        let payload = ItemPayload {
            id: Uuid::nil(),
            item_type: ItemType::FillBlank,
            status: ItemStatus::Draft,
            difficulty: Difficulty::Hard,
            tags: vec!["algebra".to_string()],
            statement: Value::String("2 + _ = 4".to_string()),
            structure: Value::Null,
            resolution: None,
            organization_id: None,
            created_at: datetime!(2026-01-02 03:04:05 UTC),
            updated_at: None,
            deleted_at: None,
        };

        let json = serde_json::to_value(&payload).expect("serialize payload");
        assert_eq!(json["type"], "fill_blank");
        assert_eq!(json["createdAt"], "2026-01-02T03:04:05Z");
        assert!(json["deletedAt"].is_null());
    }

    #[test]
    fn list_request_omits_unset_filters() {
        let request = ListItemsRequest {
            organization_id: None,
            item_type: None,
            status: None,
            search: None,
            show_deleted: true,
            limit: 30,
            offset: 0,
        };

        let json = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(
            json,
            serde_json::json!({"showDeleted": true, "limit": 30, "offset": 0})
        );
    }

    #[test]
    fn item_type_parses_from_wire_name() {
        assert_eq!(
            ItemType::try_from("true_false_multi"),
            Ok(ItemType::TrueFalseMulti)
        );
        assert!(ItemType::try_from("essay").is_err());
    }

    #[test]
    fn purge_response_tolerates_missing_items() {
        let response: MutationResponse =
            serde_json::from_str(r#"{"count": 2}"#).expect("parse response");
        assert_eq!(response.count, 2);
        assert!(response.items.is_empty());
    }
}
