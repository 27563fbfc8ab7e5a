/// Page cursor of a server-paged collection.
///
/// Navigation outside `1..=last_page()` is ignored rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    page: u32,
    page_size: u32,
    total_items: u64,
}

impl PaginationState {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total_items: 0,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn total_pages(&self) -> u32 {
        let pages = self.total_items.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// An empty collection still has page 1.
    pub fn last_page(&self) -> u32 {
        self.total_pages().max(1)
    }

    pub fn can_go_to(&self, page: u32) -> bool {
        page >= 1 && page <= self.last_page()
    }

    pub fn has_next(&self) -> bool {
        self.can_go_to(self.page.saturating_add(1))
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn go_to(&mut self, page: u32) -> bool {
        if !self.can_go_to(page) || page == self.page {
            return false;
        }
        self.page = page;
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.page.saturating_add(1))
    }

    pub fn prev(&mut self) -> bool {
        self.go_to(self.page.saturating_sub(1))
    }

    pub fn reset(&mut self) -> bool {
        let moved = self.page != 1;
        self.page = 1;
        moved
    }

    /// Records the server total; pulls the page back inside the range when
    /// the collection shrank. Returns true when the page moved.
    pub fn apply_total(&mut self, total_items: u64) -> bool {
        self.total_items = total_items;
        let last = self.last_page();
        if self.page > last {
            self.page = last;
            return true;
        }
        false
    }

    /// One-based inclusive item range shown on the current page.
    pub fn item_range(&self) -> Option<(u64, u64)> {
        if self.total_items == 0 {
            return None;
        }
        let size = u64::from(self.page_size);
        let start = u64::from(self.page - 1) * size + 1;
        if start > self.total_items {
            return None;
        }
        Some((start, (start + size - 1).min(self.total_items)))
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_total(page_size: u32, total: u64) -> PaginationState {
        let mut state = PaginationState::new(page_size);
        state.apply_total(total);
        state
    }

    #[test]
    fn derives_total_pages() {
        assert_eq!(with_total(10, 95).total_pages(), 10);
        assert_eq!(with_total(10, 100).total_pages(), 10);
        assert_eq!(with_total(10, 0).total_pages(), 0);
        assert_eq!(with_total(10, 0).last_page(), 1);
    }

    #[test]
    fn ignores_out_of_range_pages() {
        let mut state = with_total(10, 95);
        assert!(!state.go_to(11));
        assert!(!state.go_to(0));
        assert_eq!(state.page(), 1);
        assert!(state.go_to(10));
        assert!(!state.next());
        assert_eq!(state.page(), 10);
        assert!(state.prev());
        assert_eq!(state.page(), 9);
    }

    #[test]
    fn prev_on_first_page_is_noop() {
        let mut state = with_total(10, 95);
        assert!(!state.has_prev());
        assert!(!state.prev());
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn shrinking_total_clamps_page() {
        let mut state = with_total(10, 95);
        state.go_to(10);
        assert!(state.apply_total(25));
        assert_eq!(state.page(), 3);
        assert!(!state.apply_total(25));
    }

    #[test]
    fn reports_item_range() {
        let mut state = with_total(10, 95);
        assert_eq!(state.item_range(), Some((1, 10)));
        state.go_to(10);
        assert_eq!(state.item_range(), Some((91, 95)));
        assert_eq!(with_total(10, 0).item_range(), None);
    }
}
