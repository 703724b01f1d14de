//! Order-preserving selection of item ids.

use uuid::Uuid;

/// Selected ids in the order they were picked. No duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    ids: Vec<Uuid>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless it is already selected. Returns whether it was added.
    pub fn select(&mut self, id: Uuid) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn deselect(&mut self, id: &Uuid) -> bool {
        let before = self.ids.len();
        self.ids.retain(|selected| selected != id);
        self.ids.len() != before
    }

    /// Flip membership of `id`. Returns true if it is selected afterwards.
    pub fn toggle(&mut self, id: Uuid) -> bool {
        if self.deselect(&id) {
            false
        } else {
            self.select(id)
        }
    }

    /// Append every unselected id of `page` in page order. Returns how many
    /// were added.
    pub fn select_all_on_page(&mut self, page: &[Uuid]) -> usize {
        page.iter().filter(|id| self.select(**id)).count()
    }

    /// Empty the whole selection, including ids from other pages.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Action of the header checkbox: clear when anything is selected,
    /// otherwise select the page.
    pub fn toggle_all_on_page(&mut self, page: &[Uuid]) {
        if self.ids.is_empty() {
            self.select_all_on_page(page);
        } else {
            self.clear();
        }
    }

    /// 1-based position of `id` in selection order.
    pub fn order_of(&self, id: &Uuid) -> Option<usize> {
        self.ids
            .iter()
            .position(|selected| selected == id)
            .map(|index| index + 1)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_all_selected(&self, page: &[Uuid]) -> bool {
        !page.is_empty() && page.iter().all(|id| self.contains(id))
    }

    pub fn is_partial_selection(&self, page: &[Uuid]) -> bool {
        !self.ids.is_empty() && !self.is_all_selected(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(count: usize) -> Vec<Uuid> {
        (0..count).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn select_all_keeps_existing_order_first() {
        let page = ids(4);
        let (x, y, z, w) = (page[2], page[0], page[1], page[3]);
        let mut selection = SelectionTracker::new();
        selection.select(x);
        selection.select(y);

        let added = selection.select_all_on_page(&page);

        assert_eq!(added, 2);
        assert_eq!(selection.ids(), &[x, y, z, w]);
        assert_eq!(selection.order_of(&x), Some(1));
        assert_eq!(selection.order_of(&w), Some(4));
    }

    #[test]
    fn deselect_preserves_relative_order() {
        let picked = ids(3);
        let mut selection = SelectionTracker::new();
        for id in &picked {
            selection.select(*id);
        }
        assert!(!selection.select(picked[0]));

        assert!(selection.deselect(&picked[1]));
        assert_eq!(selection.ids(), &[picked[0], picked[2]]);
        assert_eq!(selection.order_of(&picked[2]), Some(2));
        assert_eq!(selection.order_of(&picked[1]), None);
    }

    #[test]
    fn toggle_flips_membership() {
        let id = Uuid::new_v4();
        let mut selection = SelectionTracker::new();
        assert!(selection.toggle(id));
        assert!(!selection.toggle(id));
        assert!(selection.is_empty());
    }

    #[test]
    fn partial_selection_toggles_to_clear_everything() {
        let page = ids(3);
        let off_page = Uuid::new_v4();
        let mut selection = SelectionTracker::new();
        selection.select(off_page);
        selection.select(page[0]);

        assert!(selection.is_partial_selection(&page));
        assert!(!selection.is_all_selected(&page));

        selection.toggle_all_on_page(&page);
        assert!(selection.is_empty());

        selection.toggle_all_on_page(&page);
        assert!(selection.is_all_selected(&page));
        assert!(!selection.is_partial_selection(&page));
    }

    #[test]
    fn empty_page_is_never_all_selected() {
        let selection = SelectionTracker::new();
        assert!(!selection.is_all_selected(&[]));
        assert!(!selection.is_partial_selection(&[]));
    }
}
