//! View router: UI filter state to query keys.

use std::num::NonZeroU32;

use crate::application::pagination::{PageState, Window};
use crate::cache::{ItemFilter, QueryKey};
use crate::domain::types::{ItemStatus, ItemType, Scope};

/// Filter controls as the host UI holds them.
///
/// `status` is retained while the trash toggle is on even though trash
/// queries ignore it, so switching back restores the user's choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilters {
    pub scope: Scope,
    pub item_type: Option<ItemType>,
    pub status: Option<ItemStatus>,
    /// Settled (debounced) search text.
    pub search: String,
    pub show_deleted: bool,
}

impl ViewFilters {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            ..Default::default()
        }
    }

    /// Whether any filter control is set, including a status retained
    /// while viewing trash.
    pub fn has_active_filters(&self) -> bool {
        self.item_type.is_some() || self.status.is_some() || !self.search.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.item_type = None;
        self.status = None;
        self.search.clear();
    }

    pub fn current_filter(&self) -> ItemFilter {
        self.filter_for(self.show_deleted)
    }

    /// Filter of the other side of the active/trash split.
    pub fn paired_filter(&self) -> ItemFilter {
        self.filter_for(!self.show_deleted)
    }

    fn filter_for(&self, show_deleted: bool) -> ItemFilter {
        ItemFilter::new(
            self.scope,
            self.item_type,
            self.status,
            Some(self.search.as_str()),
            show_deleted,
        )
    }
}

/// Keys addressed by one rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedView {
    pub current: QueryKey,
    /// Head window of the opposite view with the same window size.
    pub paired: QueryKey,
    pub window: Window,
}

#[derive(Debug, Clone, Copy)]
pub struct ViewRouter {
    multiplier: NonZeroU32,
}

impl ViewRouter {
    pub fn new(multiplier: NonZeroU32) -> Self {
        Self { multiplier }
    }

    pub fn multiplier(&self) -> NonZeroU32 {
        self.multiplier
    }

    pub fn route(&self, filters: &ViewFilters, page: &PageState) -> RoutedView {
        let window = page.window(self.multiplier);
        RoutedView {
            current: filters
                .current_filter()
                .window(window.limit, window.offset),
            paired: filters.paired_filter().window(window.limit, 0),
            window,
        }
    }

    /// Key of the window that serves `page` under `filters`.
    pub fn key_for_page(&self, filters: &ViewFilters, page_size: NonZeroU32, page: u32) -> (QueryKey, Window) {
        let window = Window::for_page(page_size, page, self.multiplier);
        let key = filters
            .current_filter()
            .window(window.limit, window.offset);
        (key, window)
    }
}
