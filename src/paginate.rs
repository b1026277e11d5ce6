#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    page_size: usize,
    page_index: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub rows: &'a [T],
    pub page_count: usize,
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1))
}

/// Slice of `ordered` shown on page `page_index`. Out of range pages are empty.
pub fn paginate<T>(ordered: &[T], page_size: usize, page_index: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let begin = page_index.saturating_mul(page_size).min(ordered.len());
    let end = begin.saturating_add(page_size).min(ordered.len());
    Page {
        rows: &ordered[begin..end],
        page_count: page_count(ordered.len(), page_size),
    }
}

impl PageState {
    pub fn new(page_size: usize) -> Self {
        PageState {
            page_size: page_size.max(1),
            page_index: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn reset(&mut self) {
        self.page_index = 0;
    }

    pub fn has_next(&self, total: usize) -> bool {
        (self.page_index + 1) * self.page_size < total
    }

    pub fn has_prev(&self) -> bool {
        self.page_index > 0
    }

    /// Returns false and leaves the index untouched when already on the last page.
    pub fn next(&mut self, total: usize) -> bool {
        if self.has_next(total) {
            self.page_index += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.has_prev() {
            self.page_index -= 1;
            true
        } else {
            false
        }
    }

    pub fn first(&mut self) {
        self.page_index = 0;
    }

    pub fn last(&mut self, total: usize) {
        self.page_index = page_count(total, self.page_size).saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_rows_in_pages_of_two() {
        let rows: Vec<usize> = (0..5).collect();
        let sizes: Vec<usize> = (0..3).map(|i| paginate(&rows, 2, i).rows.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(paginate(&rows, 2, 0).page_count, 3);

        let mut state = PageState::new(2);
        assert!(state.next(5));
        assert!(state.next(5));
        assert_eq!(state.page_index(), 2);
        assert!(!state.has_next(5));
        assert!(!state.next(5));
        assert_eq!(state.page_index(), 2);
    }

    #[test]
    fn pages_cover_rows_without_overlap() {
        for total in [0usize, 1, 2, 7, 10, 11] {
            for size in [1usize, 3, 5, 10] {
                let rows: Vec<usize> = (0..total).collect();
                let count = page_count(total, size);
                let joined: Vec<usize> = (0..count)
                    .flat_map(|i| paginate(&rows, size, i).rows.iter().copied())
                    .collect();
                assert_eq!(joined, rows, "total {total}, size {size}");
            }
        }
    }

    #[test]
    fn empty_rows_have_no_pages() {
        let rows: Vec<usize> = Vec::new();
        let page = paginate(&rows, 10, 0);
        assert!(page.rows.is_empty());
        assert_eq!(page.page_count, 0);

        let mut state = PageState::new(10);
        assert!(!state.next(0));
        assert!(!state.prev());
        state.last(0);
        assert_eq!(state.page_index(), 0);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let rows: Vec<usize> = (0..3).collect();
        assert!(paginate(&rows, 2, 9).rows.is_empty());
        assert!(paginate(&rows, 2, usize::MAX).rows.is_empty());
    }

    #[test]
    fn prev_refused_on_first_page() {
        let mut state = PageState::new(2);
        assert!(!state.has_prev());
        assert!(!state.prev());
        assert_eq!(state.page_index(), 0);
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let mut state = PageState::new(2);
        assert_eq!(page_count(4, 2), 2);
        assert!(state.next(4));
        assert!(!state.has_next(4));
    }

    #[test]
    fn first_and_last() {
        let mut state = PageState::new(3);
        state.last(10);
        assert_eq!(state.page_index(), 3);
        state.first();
        assert_eq!(state.page_index(), 0);
    }

    #[test]
    fn zero_page_size_is_clamped() {
        assert_eq!(PageState::new(0).page_size(), 1);
        assert_eq!(page_count(3, 0), 3);
    }
}
