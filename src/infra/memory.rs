//! In-process item bank backend.
//!
//! Applies the same listing, ordering and precondition rules as the real
//! service. Used by the `demo` command and by tests, which can also inject
//! one-shot failures and slow listings.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use itembank_api_types::ListItemsRequest;
use serde_json::json;
use time::{Duration as TimeDuration, OffsetDateTime, macros::datetime};
use uuid::Uuid;

use crate::application::repos::{ApiError, ItemPage, ItemsApi, MutationOutcome};
use crate::cache::{ItemFilter, mutex_lock};
use crate::domain::entities::ItemRecord;
use crate::domain::items::sort_by_recency;
use crate::domain::types::{Difficulty, ItemStatus, ItemType, Scope};

const LOCK_TARGET: &str = "infra::memory";

#[derive(Debug, Default)]
struct MemoryState {
    items: Vec<ItemRecord>,
    fail_next_list: Option<ApiError>,
    fail_next_mutation: Option<ApiError>,
    list_delay: Duration,
    mutation_delay: Duration,
    list_calls: usize,
    mutation_calls: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryItemsApi {
    state: Mutex<MemoryState>,
}

impl InMemoryItemsApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = ItemRecord>) -> Self {
        let api = Self::new();
        api.insert_all(items);
        api
    }

    pub fn insert_all(&self, items: impl IntoIterator<Item = ItemRecord>) {
        let mut state = mutex_lock(&self.state, LOCK_TARGET, "insert_all");
        for item in items {
            state.items.retain(|existing| existing.id != item.id);
            state.items.push(item);
        }
    }

    /// Server-side copy of one item.
    pub fn get(&self, id: Uuid) -> Option<ItemRecord> {
        mutex_lock(&self.state, LOCK_TARGET, "get")
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.state, LOCK_TARGET, "len").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next listing call fail with `error`.
    pub fn fail_next_list(&self, error: ApiError) {
        mutex_lock(&self.state, LOCK_TARGET, "fail_next_list").fail_next_list = Some(error);
    }

    /// Make the next mutation call fail with `error` without touching state.
    pub fn fail_next_mutation(&self, error: ApiError) {
        mutex_lock(&self.state, LOCK_TARGET, "fail_next_mutation").fail_next_mutation =
            Some(error);
    }

    /// Delay every listing response. The snapshot is taken after the delay.
    pub fn set_list_delay(&self, delay: Duration) {
        mutex_lock(&self.state, LOCK_TARGET, "set_list_delay").list_delay = delay;
    }

    /// Delay every mutation before it touches state.
    pub fn set_mutation_delay(&self, delay: Duration) {
        mutex_lock(&self.state, LOCK_TARGET, "set_mutation_delay").mutation_delay = delay;
    }

    pub fn list_calls(&self) -> usize {
        mutex_lock(&self.state, LOCK_TARGET, "list_calls").list_calls
    }

    pub fn mutation_calls(&self) -> usize {
        mutex_lock(&self.state, LOCK_TARGET, "mutation_calls").mutation_calls
    }

    async fn mutation_delay(&self) {
        let delay = mutex_lock(&self.state, LOCK_TARGET, "mutation_delay").mutation_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn begin_mutation(&self, op: &'static str) -> Result<MutexGuard<'_, MemoryState>, ApiError> {
        let mut state = mutex_lock(&self.state, LOCK_TARGET, op);
        state.mutation_calls += 1;
        match state.fail_next_mutation.take() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

/// Ids of `ids` that are missing or do not satisfy `precondition`.
fn unmet(
    items: &[ItemRecord],
    ids: &[Uuid],
    precondition: impl Fn(&ItemRecord) -> bool,
) -> Vec<Uuid> {
    ids.iter()
        .filter(|id| {
            !items
                .iter()
                .any(|item| item.id == **id && precondition(item))
        })
        .copied()
        .collect()
}

fn not_found(ids: &[Uuid], expectation: &str) -> ApiError {
    let listed: Vec<String> = ids.iter().map(Uuid::to_string).collect();
    ApiError::not_found(format!("{expectation}: {}", listed.join(", ")))
}

fn set_deleted_at(
    items: &mut [ItemRecord],
    ids: &[Uuid],
    deleted_at: Option<OffsetDateTime>,
) -> Vec<ItemRecord> {
    let wanted: HashSet<&Uuid> = ids.iter().collect();
    let mut changed = Vec::with_capacity(ids.len());
    for item in items.iter_mut().filter(|item| wanted.contains(&item.id)) {
        item.deleted_at = deleted_at;
        changed.push(item.clone());
    }
    changed
}

#[async_trait]
impl ItemsApi for InMemoryItemsApi {
    async fn list_items(&self, request: &ListItemsRequest) -> Result<ItemPage, ApiError> {
        let delay = {
            let mut state = mutex_lock(&self.state, LOCK_TARGET, "list_items");
            state.list_calls += 1;
            if let Some(error) = state.fail_next_list.take() {
                return Err(error);
            }
            state.list_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let filter = ItemFilter::new(
            Scope::from_organization(request.organization_id),
            request.item_type,
            request.status,
            request.search.as_deref(),
            request.show_deleted,
        );
        let mut matching: Vec<ItemRecord> = mutex_lock(&self.state, LOCK_TARGET, "list_items")
            .items
            .iter()
            .filter(|item| filter.admits(item))
            .cloned()
            .collect();
        sort_by_recency(&mut matching);

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(request.offset as usize)
            .take(request.limit as usize)
            .collect();
        Ok(ItemPage { items, total })
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<MutationOutcome, ApiError> {
        self.mutation_delay().await;
        let mut state = self.begin_mutation("delete_many")?;
        let missing = unmet(&state.items, ids, |item| !item.is_deleted());
        if !missing.is_empty() {
            return Err(not_found(&missing, "no active items"));
        }
        let items = set_deleted_at(&mut state.items, ids, Some(OffsetDateTime::now_utc()));
        Ok(MutationOutcome {
            count: items.len() as u64,
            items,
        })
    }

    async fn restore(&self, ids: &[Uuid]) -> Result<MutationOutcome, ApiError> {
        self.mutation_delay().await;
        let mut state = self.begin_mutation("restore")?;
        let missing = unmet(&state.items, ids, ItemRecord::is_deleted);
        if !missing.is_empty() {
            return Err(not_found(&missing, "no trashed items"));
        }
        let items = set_deleted_at(&mut state.items, ids, None);
        Ok(MutationOutcome {
            count: items.len() as u64,
            items,
        })
    }

    async fn permanent_delete(&self, ids: &[Uuid]) -> Result<u64, ApiError> {
        self.mutation_delay().await;
        let mut state = self.begin_mutation("permanent_delete")?;
        let missing = unmet(&state.items, ids, ItemRecord::is_deleted);
        if !missing.is_empty() {
            return Err(not_found(&missing, "no trashed items"));
        }
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        let before = state.items.len();
        state.items.retain(|item| !wanted.contains(&item.id));
        Ok((before - state.items.len()) as u64)
    }
}

/// Sample items for `scope` with fresh ids, newest first.
///
/// Kinds, statuses and difficulties rotate so every filter has matches.
pub fn sample_items(scope: Scope, count: u32) -> Vec<ItemRecord> {
    const STATUSES: [ItemStatus; 3] = [
        ItemStatus::Published,
        ItemStatus::Draft,
        ItemStatus::Archived,
    ];
    const DIFFICULTIES: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
    const TOPICS: [&str; 4] = ["fractions", "photosynthesis", "cells", "vectors"];

    let newest = datetime!(2025-03-03 09:00 UTC);
    (0..count)
        .map(|index| {
            let slot = index as usize;
            let topic = TOPICS[slot % TOPICS.len()];
            let item_type = ItemType::ALL[slot % ItemType::ALL.len()];
            ItemRecord {
                id: Uuid::new_v4(),
                item_type,
                status: STATUSES[slot % STATUSES.len()],
                difficulty: DIFFICULTIES[slot % DIFFICULTIES.len()],
                tags: vec![topic.to_string()],
                statement: json!(format!("Question {}: {topic}", index + 1)),
                structure: json!({ "kind": item_type.as_str() }),
                resolution: None,
                scope,
                created_at: newest - TimeDuration::minutes(i64::from(index)),
                updated_at: None,
                deleted_at: None,
            }
        })
        .collect()
}
