//! Item ordering, text projection, and id-list validation.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde_json::Value;
use uuid::Uuid;

use super::entities::ItemRecord;
use super::error::DomainError;

const STATEMENT_PREVIEW_CHARS: usize = 200;

/// Collection order: most recently touched first, ties broken by creation.
pub fn recency_order(a: &ItemRecord, b: &ItemRecord) -> Ordering {
    b.touched_at()
        .cmp(&a.touched_at())
        .then_with(|| b.created_at.cmp(&a.created_at))
}

pub fn sort_by_recency(items: &mut [ItemRecord]) {
    items.sort_by(recency_order);
}

/// Plain-text projection of a statement used for previews and search.
///
/// Strings are used as is. Rich-text trees contribute the text of the leaf
/// nodes under `root.children[*].children[*]`. Anything else falls back to
/// its JSON rendering. The result is capped at 200 characters.
pub fn statement_text(statement: &Value) -> String {
    let text = match statement {
        Value::Null => return String::new(),
        Value::String(text) => return text.clone(),
        other => rich_text_leaves(other).unwrap_or_else(|| other.to_string()),
    };
    text.chars().take(STATEMENT_PREVIEW_CHARS).collect()
}

fn rich_text_leaves(statement: &Value) -> Option<String> {
    let blocks = statement.get("root")?.get("children")?.as_array()?;
    let words: Vec<&str> = blocks
        .iter()
        .filter_map(|block| block.get("children").and_then(Value::as_array))
        .flatten()
        .filter_map(|leaf| leaf.get("text").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .collect();
    Some(words.join(" "))
}

/// Case-insensitive substring match on the id or the statement text.
pub fn matches_search(item: &ItemRecord, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    item.id.to_string().contains(&needle)
        || statement_text(&item.statement)
            .to_lowercase()
            .contains(&needle)
}

/// Non-empty, duplicate-free list of item ids in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIds(Vec<Uuid>);

impl ItemIds {
    pub fn new(ids: impl IntoIterator<Item = Uuid>) -> Result<Self, DomainError> {
        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = ids.into_iter().filter(|id| seen.insert(*id)).collect();
        if ids.is_empty() {
            return Err(DomainError::EmptyIdList);
        }
        Ok(Self(ids))
    }

    pub fn as_slice(&self) -> &[Uuid] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.0.contains(id)
    }

    pub fn into_vec(self) -> Vec<Uuid> {
        self.0
    }
}
