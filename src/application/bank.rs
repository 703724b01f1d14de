//! `ItemBank`: the UI-facing surface of the item bank cache.
//!
//! Holds the list view state (filters, page, selection, debounced search,
//! pending undo, notices) and drives the fetcher and the mutation coordinator.
//! One bank serves one list view; every method takes `&mut self`, so user
//! actions are applied one at a time like events on a UI loop.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::command::{MutationKind, OptimisticCommand};
use crate::application::debounce::{DEFAULT_SEARCH_DEBOUNCE, SearchDebouncer};
use crate::application::error::{AppError, ErrorKind};
use crate::application::fetcher::WindowFetcher;
use crate::application::mutations::{MutationCoordinator, MutationReceipt};
use crate::application::notice::{Notice, item_count};
use crate::application::pagination::{DEFAULT_PAGE_SIZE, PageState, Window};
use crate::application::repos::ItemsApi;
use crate::application::selection::SelectionTracker;
use crate::application::shortcuts::{DeleteConfirmation, Shortcut, ShortcutOutcome};
use crate::application::undo::{DEFAULT_UNDO_WINDOW, PendingUndo, UndoAction};
use crate::application::view::{RoutedView, ViewFilters, ViewRouter};
use crate::cache::{CacheConfig, ItemCacheStore, ReconcileConsumer, ReconcileQueue};
use crate::domain::entities::ItemRecord;
use crate::domain::error::DomainError;
use crate::domain::items::ItemIds;
use crate::domain::types::{ItemStatus, ItemType, Scope};

/// When reconciliation refetches run after a mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Spawned on the tokio runtime; the mutation returns immediately.
    #[default]
    Background,
    /// Awaited before the mutation returns.
    Inline,
    /// Left queued until [`ItemBank::reconcile`] is called.
    Manual,
}

#[derive(Debug, Clone)]
pub struct BankConfig {
    pub cache: CacheConfig,
    pub page_size: NonZeroU32,
    pub search_debounce: Duration,
    pub undo_window: Duration,
    pub reconcile: ReconcileMode,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            undo_window: DEFAULT_UNDO_WINDOW,
            reconcile: ReconcileMode::default(),
        }
    }
}

impl From<&crate::config::Settings> for BankConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            cache: CacheConfig::from(&settings.cache),
            page_size: settings.ui.page_size,
            search_debounce: settings.ui.search_debounce,
            undo_window: settings.ui.undo_window,
            reconcile: ReconcileMode::default(),
        }
    }
}

/// One rendered page plus the derived values the host UI displays.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub items: Vec<ItemRecord>,
    pub total: u64,
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub has_pagination: bool,
    pub can_go_prev: bool,
    pub can_go_next: bool,
    pub show_deleted: bool,
    pub has_active_filters: bool,
}

pub struct ItemBank {
    config: BankConfig,
    store: Arc<ItemCacheStore>,
    fetcher: WindowFetcher,
    coordinator: MutationCoordinator,
    consumer: Arc<ReconcileConsumer>,
    router: ViewRouter,
    filters: ViewFilters,
    page: PageState,
    selection: SelectionTracker,
    search: SearchDebouncer,
    search_updates: watch::Receiver<String>,
    page_ids: Vec<Uuid>,
    last_total: u64,
    pending_undo: Option<PendingUndo>,
    pending_confirmation: Option<DeleteConfirmation>,
    notices: Vec<Notice>,
}

impl ItemBank {
    pub fn new(api: Arc<dyn ItemsApi>, scope: Scope, config: BankConfig) -> Self {
        let store = Arc::new(ItemCacheStore::new(&config.cache));
        let queue = Arc::new(ReconcileQueue::new());
        let fetcher = WindowFetcher::new(Arc::clone(&api), Arc::clone(&store));
        let coordinator = MutationCoordinator::new(api, Arc::clone(&store), Arc::clone(&queue));
        let consumer = Arc::new(ReconcileConsumer::new(
            config.cache.clone(),
            Arc::clone(&store),
            queue,
            fetcher.clone(),
        ));
        let search = SearchDebouncer::new(config.search_debounce);
        let search_updates = search.subscribe();

        Self {
            router: ViewRouter::new(config.cache.prefetch_multiplier_non_zero()),
            page: PageState::new(config.page_size),
            config,
            store,
            fetcher,
            coordinator,
            consumer,
            filters: ViewFilters::new(scope),
            selection: SelectionTracker::new(),
            search,
            search_updates,
            page_ids: Vec::new(),
            last_total: 0,
            pending_undo: None,
            pending_confirmation: None,
            notices: Vec::new(),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Items of page `page_index` under `filters`, served from the cached
    /// window when possible.
    pub async fn get_page(
        &self,
        filters: &ViewFilters,
        page_index: u32,
        page_size: u32,
    ) -> Result<Vec<ItemRecord>, AppError> {
        let page_size = NonZeroU32::new(page_size).ok_or(DomainError::ZeroPageSize)?;
        let (key, window) = self.router.key_for_page(filters, page_size, page_index);
        let entry = self.fetcher.ensure(&key).await?;
        Ok(window.slice(&entry.items).to_vec())
    }

    /// Server count for `filters`, read from the window holding page 0.
    pub async fn get_total(&self, filters: &ViewFilters) -> Result<u64, AppError> {
        let (key, _) = self.router.key_for_page(filters, self.page.page_size(), 0);
        Ok(self.fetcher.ensure(&key).await?.total)
    }

    /// Load the current page of the current view.
    ///
    /// A page left empty by deletions falls back to the last page that
    /// still has items.
    #[instrument(skip(self), fields(page = self.page.current_page(), trash = self.filters.show_deleted))]
    pub async fn load(&mut self) -> Result<PageView, AppError> {
        self.sync_search();
        let view = self.load_current().await?;
        if view.items.is_empty() && view.current_page > 0 && view.total > 0 {
            self.page.go_to(view.current_page, view.total);
            debug!(page = self.page.current_page(), "Clamped to last populated page");
            return self.load_current().await;
        }
        Ok(view)
    }

    async fn load_current(&mut self) -> Result<PageView, AppError> {
        let routed = self.route();
        let entry = self.fetcher.ensure(&routed.current).await?;
        let items = routed.window.slice(&entry.items).to_vec();

        self.page_ids = items.iter().map(|item| item.id).collect();
        self.last_total = entry.total;

        Ok(PageView {
            total: entry.total,
            current_page: self.page.current_page(),
            page_size: self.page.page_size().get(),
            total_pages: self.page.total_pages(entry.total),
            has_pagination: self.page.has_pagination(entry.total),
            can_go_prev: self.page.can_go_prev(),
            can_go_next: self.page.can_go_next(entry.total),
            show_deleted: self.filters.show_deleted,
            has_active_filters: self.filters.has_active_filters(),
            items,
        })
    }

    pub fn route(&self) -> RoutedView {
        self.router.route(&self.filters, &self.page)
    }

    pub fn current_window(&self) -> Window {
        self.page.window(self.router.multiplier())
    }

    pub fn filters(&self) -> &ViewFilters {
        &self.filters
    }

    pub fn page_state(&self) -> &PageState {
        &self.page
    }

    /// Ids of the page returned by the last [`ItemBank::load`].
    pub fn page_ids(&self) -> &[Uuid] {
        &self.page_ids
    }

    pub fn is_fetching(&self) -> bool {
        self.store.is_fetching()
    }

    pub fn store(&self) -> &Arc<ItemCacheStore> {
        &self.store
    }

    // ========================================================================
    // Filters and pagination
    // ========================================================================

    pub fn set_scope(&mut self, scope: Scope) {
        if self.filters.scope != scope {
            self.filters.scope = scope;
            self.on_view_change();
        }
    }

    pub fn set_type_filter(&mut self, item_type: Option<ItemType>) {
        if self.filters.item_type != item_type {
            self.filters.item_type = item_type;
            self.on_view_change();
        }
    }

    pub fn set_status_filter(&mut self, status: Option<ItemStatus>) {
        if self.filters.status != status {
            self.filters.status = status;
            self.on_view_change();
        }
    }

    pub fn set_show_deleted(&mut self, show_deleted: bool) {
        if self.filters.show_deleted != show_deleted {
            self.filters.show_deleted = show_deleted;
            self.on_view_change();
        }
    }

    /// Raw search keystrokes; they join the query once the debounce settles.
    pub fn set_search_input(&mut self, raw: impl Into<String>) {
        self.search.input(raw);
    }

    /// Settle pending search input now.
    pub fn settle_search(&mut self) {
        self.search.flush();
        self.sync_search();
    }

    pub fn search_input(&self) -> &str {
        self.search.raw()
    }

    pub fn clear_filters(&mut self) {
        let had_filters = self.filters.has_active_filters();
        self.search.clear();
        self.filters.clear();
        self.sync_search();
        if had_filters {
            self.on_view_change();
        }
    }

    pub fn has_active_filters(&self) -> bool {
        self.filters.has_active_filters()
    }

    pub fn set_page_size(&mut self, page_size: u32) -> Result<(), AppError> {
        let page_size = NonZeroU32::new(page_size).ok_or(DomainError::ZeroPageSize)?;
        if self.page.set_page_size(page_size) {
            debug!(page_size = page_size.get(), "Page size changed");
        }
        Ok(())
    }

    pub fn next_page(&mut self) -> bool {
        self.page.next_page(self.last_total)
    }

    pub fn prev_page(&mut self) -> bool {
        self.page.prev_page()
    }

    pub fn go_to_page(&mut self, page: u32) {
        self.page.go_to(page, self.last_total);
    }

    fn sync_search(&mut self) {
        if !self.search_updates.has_changed().unwrap_or(false) {
            return;
        }
        let settled = self.search_updates.borrow_and_update().clone();
        if settled != self.filters.search {
            self.filters.search = settled;
            self.on_view_change();
        }
    }

    fn on_view_change(&mut self) {
        self.page.reset();
        self.selection.clear();
        self.page_ids.clear();
        self.pending_confirmation = None;
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn toggle_select(&mut self, id: Uuid) -> bool {
        self.selection.toggle(id)
    }

    pub fn select_all_on_page(&mut self) -> usize {
        self.selection.select_all_on_page(&self.page_ids)
    }

    /// Header checkbox: clears any selection, otherwise selects the page.
    pub fn toggle_select_all(&mut self) {
        self.selection.toggle_all_on_page(&self.page_ids);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection_order(&self, id: &Uuid) -> Option<usize> {
        self.selection.order_of(id)
    }

    pub fn selected_ids(&self) -> &[Uuid] {
        self.selection.ids()
    }

    pub fn is_all_selected(&self) -> bool {
        self.selection.is_all_selected(&self.page_ids)
    }

    pub fn is_partial_selection(&self) -> bool {
        self.selection.is_partial_selection(&self.page_ids)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub async fn delete_selected(&mut self) -> Result<MutationReceipt, AppError> {
        let command = self.selection_command(MutationKind::Delete);
        self.run(command).await
    }

    pub async fn restore_selected(&mut self) -> Result<MutationReceipt, AppError> {
        let command = self.selection_command(MutationKind::Restore);
        self.run(command).await
    }

    pub async fn permanently_delete_selected(&mut self) -> Result<MutationReceipt, AppError> {
        let command = self.selection_command(MutationKind::PermanentDelete);
        self.run(command).await
    }

    /// Restore the items of the last delete while its undo token is live.
    pub async fn undo_last_delete(&mut self) -> Result<MutationReceipt, AppError> {
        let command = match self.pending_undo.take() {
            Some(pending) => pending.into_command(),
            None => Err(AppError::validation("nothing to undo")),
        };
        self.run(command).await
    }

    pub fn pending_undo(&self) -> Option<&PendingUndo> {
        self.pending_undo.as_ref().filter(|pending| !pending.is_expired())
    }

    /// Ask the host to confirm deletion of the selection. Deleting from the
    /// trash view is permanent.
    pub fn request_delete(&mut self) -> Option<DeleteConfirmation> {
        if self.selection.is_empty() {
            return None;
        }
        let confirmation = DeleteConfirmation {
            count: self.selection.len(),
            permanent: self.filters.show_deleted,
        };
        self.pending_confirmation = Some(confirmation);
        Some(confirmation)
    }

    /// Carry out the deletion requested by [`ItemBank::request_delete`].
    pub async fn confirm_delete(&mut self, typed: &str) -> Result<MutationReceipt, AppError> {
        let Some(confirmation) = self.pending_confirmation else {
            return self.reject(AppError::validation("no deletion awaiting confirmation"));
        };
        if let Err(err) = confirmation.check(typed) {
            return self.reject(err);
        }
        self.pending_confirmation = None;
        if confirmation.permanent {
            self.permanently_delete_selected().await
        } else {
            self.delete_selected().await
        }
    }

    /// Permanently delete the selection after checking the typed word.
    pub async fn confirm_permanent_delete(&mut self, typed: &str) -> Result<MutationReceipt, AppError> {
        let confirmation = DeleteConfirmation {
            count: self.selection.len(),
            permanent: true,
        };
        if let Err(err) = confirmation.check(typed) {
            return self.reject(err);
        }
        self.pending_confirmation = None;
        self.permanently_delete_selected().await
    }

    fn selection_command(&self, kind: MutationKind) -> Result<OptimisticCommand, AppError> {
        let ids = ItemIds::new(self.selection.ids().iter().copied())?;
        let routed = self.route();
        match kind {
            MutationKind::Delete => OptimisticCommand::delete(ids, routed.current, routed.paired),
            MutationKind::Restore => OptimisticCommand::restore(ids, routed.current, routed.paired),
            MutationKind::PermanentDelete => {
                OptimisticCommand::permanent_delete(ids, routed.current)
            }
        }
    }

    async fn run(
        &mut self,
        command: Result<OptimisticCommand, AppError>,
    ) -> Result<MutationReceipt, AppError> {
        let mut command = match command {
            Ok(command) => command,
            Err(err) => return self.reject(err),
        };

        self.coordinator.apply(&mut command);
        self.selection.clear();
        self.pending_confirmation = None;

        match self.coordinator.dispatch(command).await {
            Ok(receipt) => {
                self.acknowledge(&receipt);
                self.after_mutation().await;
                Ok(receipt)
            }
            Err(err) => {
                self.notices.push(Notice::from_error(&err));
                if err.kind() == ErrorKind::NotFound {
                    self.after_mutation().await;
                }
                Err(err)
            }
        }
    }

    fn acknowledge(&mut self, receipt: &MutationReceipt) {
        let mut notice = Notice::mutation(receipt.kind, receipt.count);
        match (receipt.kind, &receipt.paired) {
            (MutationKind::Delete, Some(trash)) => {
                let pending = PendingUndo::new(
                    receipt.ids.clone(),
                    receipt.items.clone(),
                    UndoAction::Restore {
                        trash: trash.clone(),
                        active: trash.sibling_head(),
                    },
                    self.config.undo_window,
                );
                notice = notice.with_undo(pending.ids().to_vec(), self.config.undo_window);
                self.pending_undo = Some(pending);
            }
            (MutationKind::PermanentDelete, _) => {
                // A purged item can no longer be restored.
                if self
                    .pending_undo
                    .as_ref()
                    .is_some_and(|pending| pending.ids().iter().any(|id| receipt.ids.contains(id)))
                {
                    self.pending_undo = None;
                }
            }
            _ => {}
        }
        self.notices.push(notice);
    }

    fn reject(&mut self, err: AppError) -> Result<MutationReceipt, AppError> {
        self.notices.push(Notice::from_error(&err));
        Err(err)
    }

    async fn after_mutation(&self) {
        match self.config.reconcile {
            ReconcileMode::Background => {
                let consumer = Arc::clone(&self.consumer);
                tokio::spawn(async move {
                    consumer.consume_all().await;
                });
            }
            ReconcileMode::Inline => {
                self.consumer.consume_all().await;
            }
            ReconcileMode::Manual => {}
        }
    }

    /// Run queued reconciliation now. Returns the number of batches consumed.
    pub async fn reconcile(&self) -> usize {
        self.consumer.consume_all().await
    }

    pub fn pending_reconcile(&self) -> usize {
        self.coordinator.queue().len()
    }

    // ========================================================================
    // Shortcuts and notices
    // ========================================================================

    pub fn handle_shortcut(&mut self, shortcut: Shortcut, text_input_focused: bool) -> ShortcutOutcome {
        if text_input_focused {
            return ShortcutOutcome::Suppressed;
        }
        match shortcut {
            Shortcut::SelectAll => {
                if self.page_ids.is_empty() || self.is_all_selected() {
                    return ShortcutOutcome::Ignored;
                }
                let added = self.select_all_on_page();
                self.notices.push(Notice::info(format!(
                    "{} selected",
                    item_count(self.page_ids.len() as u64)
                )));
                ShortcutOutcome::Selected(added)
            }
            Shortcut::Delete => match self.request_delete() {
                Some(confirmation) => ShortcutOutcome::ConfirmDelete(confirmation),
                None => ShortcutOutcome::Ignored,
            },
        }
    }

    /// Drain queued notices for display.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
