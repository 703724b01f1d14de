//! Cache key definitions.
//!
//! `ItemFilter` names one logical view of the collection (scope, filters and
//! the active/trash switch). `QueryKey` adds the fetched window and addresses
//! exactly one cache entry.

use itembank_api_types::ListItemsRequest;

use crate::domain::entities::ItemRecord;
use crate::domain::items::matches_search;
use crate::domain::types::{ItemStatus, ItemType, Scope};

/// Canonical filter tuple.
///
/// Construction normalizes the tuple: blank search collapses to `None`, and
/// trash views drop the status filter because trash is not filterable by
/// status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemFilter {
    scope: Scope,
    item_type: Option<ItemType>,
    status: Option<ItemStatus>,
    search: Option<String>,
    show_deleted: bool,
}

impl ItemFilter {
    pub fn new(
        scope: Scope,
        item_type: Option<ItemType>,
        status: Option<ItemStatus>,
        search: Option<&str>,
        show_deleted: bool,
    ) -> Self {
        let search = search
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Self {
            scope,
            item_type,
            status: if show_deleted { None } else { status },
            search,
            show_deleted,
        }
    }

    /// Active view of a scope with no filters applied.
    pub fn active(scope: Scope) -> Self {
        Self::new(scope, None, None, None, false)
    }

    /// Trash view of a scope with no filters applied.
    pub fn trash(scope: Scope) -> Self {
        Self::new(scope, None, None, None, true)
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn item_type(&self) -> Option<ItemType> {
        self.item_type
    }

    pub fn status(&self) -> Option<ItemStatus> {
        self.status
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn show_deleted(&self) -> bool {
        self.show_deleted
    }

    /// Same filter tuple on the other side of the active/trash split.
    ///
    /// Flipping from trash to active cannot recover a status filter the
    /// trash side dropped; callers that still know the status build the
    /// active filter directly.
    pub fn sibling(&self) -> Self {
        Self::new(
            self.scope,
            self.item_type,
            self.status,
            self.search.as_deref(),
            !self.show_deleted,
        )
    }

    /// Two filters are siblings when they differ only in `show_deleted`.
    ///
    /// The status filter of the active side is disregarded because the trash
    /// side never carries one.
    pub fn is_sibling_of(&self, other: &Self) -> bool {
        self.show_deleted != other.show_deleted
            && self.scope == other.scope
            && self.item_type == other.item_type
            && self.search == other.search
    }

    /// Whether an item belongs in this view under the server's filter rules.
    pub fn admits(&self, item: &ItemRecord) -> bool {
        item.scope == self.scope
            && item.is_deleted() == self.show_deleted
            && self.item_type.is_none_or(|kind| kind == item.item_type)
            && self.status.is_none_or(|status| status == item.status)
            && self
                .search
                .as_deref()
                .is_none_or(|needle| matches_search(item, needle))
    }

    pub fn window(&self, limit: u32, offset: u32) -> QueryKey {
        QueryKey {
            filter: self.clone(),
            limit,
            offset,
        }
    }
}

/// Filter tuple plus fetched window; addresses one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    filter: ItemFilter,
    limit: u32,
    offset: u32,
}

impl QueryKey {
    pub fn filter(&self) -> &ItemFilter {
        &self.filter
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn show_deleted(&self) -> bool {
        self.filter.show_deleted
    }

    /// First window of the sibling view with the same window size.
    ///
    /// Optimistic inserts are prepended, so only the head window of the
    /// other view can absorb them.
    pub fn sibling_head(&self) -> Self {
        self.filter.sibling().window(self.limit, 0)
    }

    pub fn to_request(&self) -> ListItemsRequest {
        ListItemsRequest {
            organization_id: self.filter.scope.organization_id(),
            item_type: self.filter.item_type,
            status: self.filter.status,
            search: self.filter.search.clone(),
            show_deleted: self.filter.show_deleted,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
