//! Optimistic mutation commands.
//!
//! A command carries everything needed to apply its forward effect to the
//! cache and to undo that effect if the server rejects the mutation. The
//! forward effect touches at most two windows, the target and the head window
//! of its sibling view, and both are written before any network work starts.

use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::cache::{CacheEntry, EntrySnapshot, ItemCacheStore, QueryKey};
use crate::domain::entities::ItemRecord;
use crate::domain::items::{ItemIds, sort_by_recency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Delete,
    Restore,
    PermanentDelete,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Delete => "delete",
            MutationKind::Restore => "restore",
            MutationKind::PermanentDelete => "permanent_delete",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            MutationKind::Delete => "deleted",
            MutationKind::Restore => "restored",
            MutationKind::PermanentDelete => "permanently deleted",
        }
    }

    /// Whether the command operates on the trash view.
    pub fn targets_trash(self) -> bool {
        !matches!(self, MutationKind::Delete)
    }
}

/// What the forward effect changed, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedEffect {
    /// Items removed from the target window.
    pub removed: usize,
    /// Copies prepended to the paired window.
    pub inserted: usize,
    pub target_cached: bool,
    pub paired_cached: bool,
}

#[derive(Debug, Clone)]
struct Snapshots {
    target: Option<EntrySnapshot>,
    paired: Option<EntrySnapshot>,
}

#[derive(Debug, Clone)]
pub struct OptimisticCommand {
    kind: MutationKind,
    ids: ItemIds,
    target: QueryKey,
    paired: Option<QueryKey>,
    // Fallback records for ids the target window does not hold.
    known_items: Vec<ItemRecord>,
    snapshots: Option<Snapshots>,
    // Whether the affected keys are held against fetch commits.
    held: bool,
}

impl OptimisticCommand {
    /// Move `ids` from the active `target` window to the trash `paired` window.
    pub fn delete(ids: ItemIds, target: QueryKey, paired: QueryKey) -> Result<Self, AppError> {
        Self::new(MutationKind::Delete, ids, target, Some(paired))
    }

    /// Move `ids` from the trash `target` window to the active `paired` window.
    pub fn restore(ids: ItemIds, target: QueryKey, paired: QueryKey) -> Result<Self, AppError> {
        Self::new(MutationKind::Restore, ids, target, Some(paired))
    }

    /// Remove `ids` from the trash `target` window for good.
    pub fn permanent_delete(ids: ItemIds, target: QueryKey) -> Result<Self, AppError> {
        Self::new(MutationKind::PermanentDelete, ids, target, None)
    }

    fn new(
        kind: MutationKind,
        ids: ItemIds,
        target: QueryKey,
        paired: Option<QueryKey>,
    ) -> Result<Self, AppError> {
        if target.show_deleted() != kind.targets_trash() {
            let expected = if kind.targets_trash() { "trash" } else { "active" };
            return Err(AppError::validation(format!(
                "{} must target the {expected} view",
                kind.as_str()
            )));
        }
        if let Some(paired) = &paired
            && !paired.filter().is_sibling_of(target.filter())
        {
            return Err(AppError::validation(format!(
                "{} paired view must be the sibling of its target",
                kind.as_str()
            )));
        }
        Ok(Self {
            kind,
            ids,
            target,
            paired,
            known_items: Vec::new(),
            snapshots: None,
            held: false,
        })
    }

    /// Records to copy into the paired window when the target window does
    /// not hold them.
    pub fn with_known_items(mut self, items: Vec<ItemRecord>) -> Self {
        self.known_items = items;
        self
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn ids(&self) -> &ItemIds {
        &self.ids
    }

    pub fn target(&self) -> &QueryKey {
        &self.target
    }

    pub fn paired(&self) -> Option<&QueryKey> {
        self.paired.as_ref()
    }

    pub fn is_applied(&self) -> bool {
        self.snapshots.is_some()
    }

    /// Keys whose windows this command writes.
    pub fn affected_keys(&self) -> Vec<QueryKey> {
        std::iter::once(self.target.clone())
            .chain(self.paired.clone())
            .collect()
    }

    /// Hold both keys against fetch commits, snapshot both windows, then
    /// write the forward effect. Windows that are not cached are left absent.
    ///
    /// The hold lasts until [`OptimisticCommand::release`].
    pub fn apply(&mut self, store: &ItemCacheStore) -> AppliedEffect {
        if !self.held {
            for key in self.affected_keys() {
                store.begin_mutation(&key);
            }
            self.held = true;
        }

        let target_snapshot = store.snapshot(&self.target);
        let paired_snapshot = self.paired.as_ref().and_then(|key| store.snapshot(key));

        let mut effect = AppliedEffect {
            target_cached: target_snapshot.is_some(),
            paired_cached: paired_snapshot.is_some(),
            ..Default::default()
        };

        let mut moved = Vec::new();
        if let Some(snapshot) = &target_snapshot {
            let current = snapshot.entry();
            let (removed, kept): (Vec<ItemRecord>, Vec<ItemRecord>) = current
                .items
                .iter()
                .cloned()
                .partition(|item| self.ids.contains(&item.id));
            effect.removed = removed.len();
            let total = current.total.saturating_sub(self.ids.len() as u64);
            store.replace_entry(
                &self.target,
                CacheEntry::new(kept, total, current.limit, current.offset),
            );
            moved = removed;
        }

        if let (Some(key), Some(snapshot)) = (&self.paired, &paired_snapshot) {
            effect.inserted = self.prepend_moved(store, key, snapshot.entry(), moved);
        }

        debug!(
            kind = self.kind.as_str(),
            ids = self.ids.len(),
            removed = effect.removed,
            inserted = effect.inserted,
            "Applied optimistic effect"
        );

        self.snapshots = Some(Snapshots {
            target: target_snapshot,
            paired: paired_snapshot,
        });
        effect
    }

    fn prepend_moved(
        &self,
        store: &ItemCacheStore,
        key: &QueryKey,
        current: &CacheEntry,
        moved: Vec<ItemRecord>,
    ) -> usize {
        let deleted_at = match self.kind {
            MutationKind::Delete => Some(OffsetDateTime::now_utc()),
            MutationKind::Restore | MutationKind::PermanentDelete => None,
        };

        let mut candidates = moved;
        for id in self.ids.as_slice() {
            if candidates.iter().any(|item| item.id == *id) {
                continue;
            }
            if let Some(known) = self.known_items.iter().find(|item| item.id == *id) {
                candidates.push(known.clone());
            }
        }

        let mut rejected = 0u64;
        let mut copies: Vec<ItemRecord> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let copy = candidate.with_deleted_at(deleted_at);
            if key.filter().admits(&copy) {
                copies.push(copy);
            } else {
                rejected += 1;
            }
        }
        sort_by_recency(&mut copies);
        let inserted = copies.len();

        let mut items = copies;
        items.extend(
            current
                .items
                .iter()
                .filter(|item| !self.ids.contains(&item.id))
                .cloned(),
        );
        let total = (current.total + self.ids.len() as u64).saturating_sub(rejected);
        store.replace_entry(key, CacheEntry::new(items, total, current.limit, current.offset));
        inserted
    }

    /// Put both windows back exactly as they were before [`apply`].
    ///
    /// [`apply`]: OptimisticCommand::apply
    pub fn rollback(&self, store: &ItemCacheStore) -> bool {
        let Some(snapshots) = &self.snapshots else {
            warn!(kind = self.kind.as_str(), "Rollback requested before apply");
            return false;
        };
        store.restore(&self.target, snapshots.target.clone());
        if let Some(paired) = &self.paired {
            store.restore(paired, snapshots.paired.clone());
        }
        true
    }

    /// Let fetches commit to the affected keys again once the server has
    /// answered.
    pub fn release(&mut self, store: &ItemCacheStore) {
        if !self.held {
            return;
        }
        for key in self.affected_keys() {
            store.end_mutation(&key);
        }
        self.held = false;
    }

    pub fn id_list(&self) -> Vec<Uuid> {
        self.ids.as_slice().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;
    use time::Duration;

    use super::*;
    use crate::cache::{CacheConfig, ItemFilter};
    use crate::domain::types::{Difficulty, ItemStatus, ItemType, Scope};

    fn record(minutes_ago: i64, status: ItemStatus) -> ItemRecord {
        ItemRecord {
            id: Uuid::new_v4(),
            item_type: ItemType::TrueFalse,
            status,
            difficulty: Difficulty::Medium,
            tags: Vec::new(),
            statement: Value::String(format!("item {minutes_ago}")),
            structure: Value::Null,
            resolution: None,
            scope: Scope::Personal,
            created_at: OffsetDateTime::now_utc() - Duration::minutes(minutes_ago),
            updated_at: None,
            deleted_at: None,
        }
    }

    fn keys() -> (QueryKey, QueryKey) {
        let active = ItemFilter::active(Scope::Personal).window(30, 0);
        let trash = active.sibling_head();
        (active, trash)
    }

    fn store_with(active: Vec<ItemRecord>, trash: Option<Vec<ItemRecord>>) -> ItemCacheStore {
        let store = ItemCacheStore::new(&CacheConfig::default());
        let (active_key, trash_key) = keys();
        let total = active.len() as u64;
        store.set(active_key, CacheEntry::new(active, total, 30, 0));
        if let Some(trash) = trash {
            let total = trash.len() as u64;
            store.set(trash_key, CacheEntry::new(trash, total, 30, 0));
        }
        store
    }

    #[test]
    fn delete_moves_items_between_views() {
        let items = vec![
            record(1, ItemStatus::Draft),
            record(2, ItemStatus::Draft),
            record(3, ItemStatus::Draft),
        ];
        let older_trash = record(60, ItemStatus::Draft).with_deleted_at(Some(OffsetDateTime::now_utc()));
        let store = store_with(items.clone(), Some(vec![older_trash.clone()]));
        let (active, trash) = keys();

        let ids = ItemIds::new([items[0].id, items[2].id]).expect("ids");
        let mut command = OptimisticCommand::delete(ids, active.clone(), trash.clone()).expect("valid");
        let effect = command.apply(&store);

        assert_eq!((effect.removed, effect.inserted), (2, 2));
        let active_entry = store.get(&active).expect("active");
        assert_eq!(active_entry.total, 1);
        assert_eq!(active_entry.ids(), vec![items[1].id]);

        let trash_entry = store.get(&trash).expect("trash");
        assert_eq!(trash_entry.total, 3);
        assert_eq!(trash_entry.ids(), vec![items[0].id, items[2].id, older_trash.id]);
        assert!(trash_entry.items.iter().all(ItemRecord::is_deleted));
    }

    #[test]
    fn absent_paired_window_is_not_fabricated() {
        let items = vec![record(1, ItemStatus::Draft)];
        let store = store_with(items.clone(), None);
        let (active, trash) = keys();

        let ids = ItemIds::new([items[0].id]).expect("ids");
        let mut command = OptimisticCommand::delete(ids, active, trash.clone()).expect("valid");
        let effect = command.apply(&store);

        assert!(!effect.paired_cached);
        assert!(store.get(&trash).is_none());
    }

    #[test]
    fn restore_uses_known_items_and_clears_deleted_at() {
        let original = record(5, ItemStatus::Published);
        let deleted = original.with_deleted_at(Some(OffsetDateTime::now_utc()));
        let store = store_with(Vec::new(), None);
        let (active, trash) = keys();

        let ids = ItemIds::new([deleted.id]).expect("ids");
        let mut command = OptimisticCommand::restore(ids, trash, active.clone())
            .expect("valid")
            .with_known_items(vec![deleted]);
        command.apply(&store);

        let active_entry = store.get(&active).expect("active");
        assert_eq!(active_entry.items, vec![original]);
        assert_eq!(active_entry.total, 1);
    }

    #[test]
    fn restore_skips_copies_rejected_by_status_filter() {
        let archived = record(5, ItemStatus::Archived).with_deleted_at(Some(OffsetDateTime::now_utc()));
        let active = ItemFilter::new(Scope::Personal, None, Some(ItemStatus::Draft), None, false)
            .window(30, 0);
        let trash = ItemFilter::trash(Scope::Personal).window(30, 0);

        let store = ItemCacheStore::new(&CacheConfig::default());
        store.set(active.clone(), CacheEntry::new(Vec::new(), 0, 30, 0));
        store.set(trash.clone(), CacheEntry::new(vec![archived.clone()], 1, 30, 0));

        let ids = ItemIds::new([archived.id]).expect("ids");
        let mut command = OptimisticCommand::restore(ids, trash.clone(), active.clone()).expect("valid");
        let effect = command.apply(&store);

        assert_eq!((effect.removed, effect.inserted), (1, 0));
        assert_eq!(store.get(&active).expect("active").total, 0);
        assert_eq!(store.get(&trash).expect("trash").total, 0);
    }

    #[test]
    fn rollback_restores_exact_snapshots() {
        let items = vec![record(1, ItemStatus::Draft), record(2, ItemStatus::Draft)];
        let store = store_with(items.clone(), Some(Vec::new()));
        let (active, trash) = keys();
        let active_before = store.get(&active).expect("active");
        let trash_before = store.get(&trash).expect("trash");

        let ids = ItemIds::new([items[0].id]).expect("ids");
        let mut command = OptimisticCommand::delete(ids, active.clone(), trash.clone()).expect("valid");
        command.apply(&store);
        assert!(command.rollback(&store));

        assert!(Arc::ptr_eq(&store.get(&active).expect("active"), &active_before));
        assert!(Arc::ptr_eq(&store.get(&trash).expect("trash"), &trash_before));
    }

    #[test]
    fn permanent_delete_touches_only_target() {
        let gone = record(1, ItemStatus::Draft).with_deleted_at(Some(OffsetDateTime::now_utc()));
        let store = store_with(vec![record(2, ItemStatus::Draft)], Some(vec![gone.clone()]));
        let (active, trash) = keys();
        let active_before = store.get(&active).expect("active");

        let ids = ItemIds::new([gone.id]).expect("ids");
        let mut command = OptimisticCommand::permanent_delete(ids, trash.clone()).expect("valid");
        command.apply(&store);

        assert!(store.get(&trash).expect("trash").items.is_empty());
        assert!(Arc::ptr_eq(&store.get(&active).expect("active"), &active_before));
    }

    #[test]
    fn apply_cancels_live_fetches() {
        let store = store_with(Vec::new(), Some(Vec::new()));
        let (active, trash) = keys();
        let ticket = store.begin_fetch(&active);

        let ids = ItemIds::new([Uuid::new_v4()]).expect("ids");
        let mut command = OptimisticCommand::delete(ids, active.clone(), trash).expect("valid");
        command.apply(&store);

        assert!(store.commit_fetch(&ticket, CacheEntry::new(Vec::new(), 99, 30, 0)).is_none());
        assert_eq!(store.get(&active).expect("active").total, 0);
    }

    #[test]
    fn applied_keys_stay_held_until_release() {
        let store = store_with(Vec::new(), Some(Vec::new()));
        let (active, trash) = keys();

        let ids = ItemIds::new([Uuid::new_v4()]).expect("ids");
        let mut command = OptimisticCommand::delete(ids, active.clone(), trash.clone()).expect("valid");
        command.apply(&store);
        assert!(store.is_mutation_pending(&active));
        assert!(store.is_mutation_pending(&trash));

        let during = store.begin_fetch(&active);
        assert!(store.commit_fetch(&during, CacheEntry::new(Vec::new(), 99, 30, 0)).is_none());

        command.release(&store);
        command.release(&store);
        assert!(!store.is_mutation_pending(&active));
        assert!(!store.is_mutation_pending(&trash));

        let after = store.begin_fetch(&active);
        assert!(store.commit_fetch(&after, CacheEntry::new(Vec::new(), 7, 30, 0)).is_some());
    }

    #[test]
    fn wrong_view_is_rejected() {
        let (active, trash) = keys();
        let ids = ItemIds::new([Uuid::new_v4()]).expect("ids");

        let err = OptimisticCommand::delete(ids.clone(), trash.clone(), active.clone())
            .expect_err("delete from trash");
        assert!(matches!(err, AppError::Validation(_)));

        let other_scope = ItemFilter::trash(Scope::Organization(Uuid::new_v4())).window(30, 0);
        let err = OptimisticCommand::delete(ids.clone(), active, other_scope).expect_err("not siblings");
        assert!(matches!(err, AppError::Validation(_)));

        assert!(OptimisticCommand::permanent_delete(ids, trash).is_ok());
    }
}
