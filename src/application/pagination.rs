//! Window arithmetic and page state.
//!
//! One fetched window spans `multiplier` UI pages. Page turns inside a window
//! are served by slicing the cached window; only crossing into another window
//! changes the query key.

use std::num::NonZeroU32;
use std::ops::Range;

use crate::domain::error::DomainError;

/// Page sizes offered by the host UI.
pub const PAGE_SIZES: [u32; 3] = [5, 10, 20];
pub const DEFAULT_PAGE_SIZE: NonZeroU32 = NonZeroU32::MIN.saturating_add(9);

/// Fetch range backing one UI page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u32,
    pub offset: u32,
    /// Position of the page's first item inside the window.
    pub local_offset: u32,
    pub page_size: u32,
}

impl Window {
    pub fn compute(page_size: u32, page: u32, multiplier: u32) -> Result<Self, DomainError> {
        let page_size = NonZeroU32::new(page_size).ok_or(DomainError::ZeroPageSize)?;
        let multiplier = NonZeroU32::new(multiplier).ok_or(DomainError::ZeroMultiplier)?;
        Ok(Self::for_page(page_size, page, multiplier))
    }

    pub fn for_page(page_size: NonZeroU32, page: u32, multiplier: NonZeroU32) -> Self {
        let page_size = u64::from(page_size.get());
        let multiplier = u64::from(multiplier.get());
        let page = u64::from(page);

        let limit = page_size * multiplier;
        let offset = (page / multiplier) * limit;
        let local_offset = page * page_size - offset;

        Self {
            limit: saturate(limit),
            offset: saturate(offset),
            local_offset: saturate(local_offset),
            page_size: saturate(page_size),
        }
    }

    /// Index range of the page inside a window holding `len` items.
    pub fn page_range(&self, len: usize) -> Range<usize> {
        let start = (self.local_offset as usize).min(len);
        let end = start.saturating_add(self.page_size as usize).min(len);
        start..end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.page_range(items.len())]
    }
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Number of pages needed for `total` items; zero for an empty collection.
pub fn total_pages(total: u64, page_size: NonZeroU32) -> u64 {
    total.div_ceil(u64::from(page_size.get()))
}

/// Page size and zero-based current page of one list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    page_size: NonZeroU32,
    current_page: u32,
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageState {
    pub fn new(page_size: NonZeroU32) -> Self {
        Self {
            page_size,
            current_page: 0,
        }
    }

    pub fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Change the page size. Any change returns to the first page.
    pub fn set_page_size(&mut self, page_size: NonZeroU32) -> bool {
        if self.page_size == page_size {
            return false;
        }
        self.page_size = page_size;
        self.current_page = 0;
        true
    }

    pub fn reset(&mut self) {
        self.current_page = 0;
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total_pages(total, self.page_size)
    }

    pub fn has_pagination(&self, total: u64) -> bool {
        self.total_pages(total) > 1
    }

    pub fn can_go_prev(&self) -> bool {
        self.current_page > 0
    }

    pub fn can_go_next(&self, total: u64) -> bool {
        u64::from(self.current_page) + 1 < self.total_pages(total)
    }

    /// Jump to `page`, clamped to the last page for `total` items.
    pub fn go_to(&mut self, page: u32, total: u64) {
        let last = self.total_pages(total).saturating_sub(1);
        self.current_page = saturate(u64::from(page).min(last));
    }

    pub fn next_page(&mut self, total: u64) -> bool {
        if !self.can_go_next(total) {
            return false;
        }
        self.current_page += 1;
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if !self.can_go_prev() {
            return false;
        }
        self.current_page -= 1;
        true
    }

    pub fn window(&self, multiplier: NonZeroU32) -> Window {
        Window::for_page(self.page_size, self.current_page, multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).expect("non-zero")
    }

    #[test]
    fn window_spans_three_pages() {
        let cases = [
            // (page, limit, offset, local_offset)
            (0, 30, 0, 0),
            (1, 30, 0, 10),
            (2, 30, 0, 20),
            (3, 30, 30, 0),
            (7, 30, 60, 10),
        ];
        for (page, limit, offset, local) in cases {
            let window = Window::for_page(nz(10), page, nz(3));
            assert_eq!(
                (window.limit, window.offset, window.local_offset),
                (limit, offset, local),
                "page {page}"
            );
        }
    }

    #[test]
    fn zero_inputs_are_rejected() {
        assert_eq!(Window::compute(0, 0, 3), Err(DomainError::ZeroPageSize));
        assert_eq!(Window::compute(10, 0, 0), Err(DomainError::ZeroMultiplier));
    }

    #[test]
    fn slice_yields_short_last_page() {
        let window = Window::for_page(nz(10), 2, nz(3));
        let items: Vec<u32> = (0..25).collect();
        assert_eq!(window.slice(&items), &items[20..25]);

        let beyond = Window::for_page(nz(10), 2, nz(3));
        assert!(beyond.slice(&items[..5]).is_empty());
    }

    #[test]
    fn page_size_change_resets_to_first_page() {
        let mut state = PageState::default();
        state.go_to(4, 100);
        assert_eq!(state.current_page(), 4);

        assert!(state.set_page_size(nz(5)));
        assert_eq!(state.current_page(), 0);

        let window = state.window(nz(3));
        assert_eq!((window.limit, window.offset), (15, 0));
        assert!(!state.set_page_size(nz(5)));
    }

    #[test]
    fn navigation_clamps_to_range() {
        let mut state = PageState::new(nz(10));
        assert_eq!(state.total_pages(0), 0);
        assert!(!state.has_pagination(3));
        assert!(state.has_pagination(11));

        assert!(!state.prev_page());
        assert!(state.next_page(11));
        assert!(!state.next_page(11));
        assert_eq!(state.current_page(), 1);

        state.go_to(40, 11);
        assert_eq!(state.current_page(), 1);
        state.go_to(40, 0);
        assert_eq!(state.current_page(), 0);
    }
}
