use tracing::{debug, trace};

use crate::expansion::{ExpandedCell, ExpansionTracker};
use crate::highlight::{Highlighter, Segment};
use crate::layout::ColumnLayout;
use crate::paginate::{PageState, page_count, paginate};
use crate::rows::{ResultSet, Row, RowId};
use crate::sort::{SortDirection, SortState, apply_sort, next_sort_state};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTreatment {
    // Single line, cut to the header width with an ellipsis
    Truncated,
    // Full text, wrapped
    Expanded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCell {
    pub column: String,
    pub text: String,
    pub segments: Vec<Segment>,
    pub treatment: CellTreatment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub id: RowId,
    pub cells: Vec<RenderedCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHeader {
    pub key: String,
    pub width: u16,
    pub sort: Option<SortDirection>,
}

/// Everything the ui needs to draw the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRender {
    pub keyword: String,
    pub headers: Vec<ColumnHeader>,
    pub rows: Vec<RenderedRow>,
    pub page_index: usize,
    pub page_count: usize,
    pub total_rows: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageRender {
    pub fn empty() -> Self {
        PageRender {
            keyword: String::new(),
            headers: Vec::new(),
            rows: Vec::new(),
            page_index: 0,
            page_count: 0,
            total_rows: 0,
            has_prev: false,
            has_next: false,
        }
    }
}

/// Owns the current result set and the view state derived from it (sort, page, expanded cell,
/// column widths). All changes go through the methods below.
pub struct ResultsPresenter {
    results: ResultSet,
    order: Vec<usize>, // Display order as positions into results.rows()
    sort: Option<SortState>,
    page: PageState,
    expansion: ExpansionTracker,
    layout: ColumnLayout,
    highlighter: Highlighter,
}

impl ResultsPresenter {
    pub fn new(page_size: usize, primary_columns: &[String]) -> Self {
        ResultsPresenter {
            results: ResultSet::empty(),
            order: Vec::new(),
            sort: None,
            page: PageState::new(page_size),
            expansion: ExpansionTracker::default(),
            layout: ColumnLayout::new(primary_columns),
            highlighter: Highlighter::default(),
        }
    }

    /// Swaps in a new result set. Sort, page and expansion start over, column widths stay.
    pub fn replace_results(&mut self, results: ResultSet) {
        debug!(
            "Replacing {} rows with {} rows for {:?}",
            self.results.len(),
            results.len(),
            results.keyword()
        );
        self.highlighter = Highlighter::new(results.keyword());
        self.results = results;
        self.sort = None;
        self.order = apply_sort(self.results.rows(), None);
        self.page.reset();
        self.expansion.clear();
    }

    pub fn clear_results(&mut self) {
        self.replace_results(ResultSet::empty());
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn page_index(&self) -> usize {
        self.page.page_index()
    }

    pub fn page_count(&self) -> usize {
        page_count(self.results.len(), self.page.page_size())
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn expanded(&self) -> Option<&ExpandedCell> {
        self.expansion.current()
    }

    pub fn click_header(&mut self, column: &str) -> Option<&SortState> {
        self.sort = next_sort_state(self.sort.as_ref(), column);
        self.order = apply_sort(self.results.rows(), self.sort.as_ref());
        self.page.reset();
        trace!("Sort is now {:?}", self.sort);
        self.sort.as_ref()
    }

    pub fn next_page(&mut self) -> bool {
        self.page.next(self.results.len())
    }

    pub fn prev_page(&mut self) -> bool {
        self.page.prev()
    }

    pub fn first_page(&mut self) {
        self.page.first();
    }

    pub fn last_page(&mut self) {
        self.page.last(self.results.len());
    }

    /// Returns whether the cell is expanded afterwards.
    pub fn toggle_cell(&mut self, row: RowId, column: &str) -> bool {
        self.expansion.toggle(row, column).is_some()
    }

    pub fn resize_column(&mut self, column: &str, delta: i32) -> u16 {
        self.layout.resize(column, delta)
    }

    pub fn begin_resize(&mut self, column: &str) {
        self.layout.begin_drag(column);
    }

    pub fn drag_resize(&mut self, cumulative_delta: i32) -> Option<u16> {
        self.layout.drag_to(cumulative_delta)
    }

    pub fn end_resize(&mut self) {
        self.layout.end_drag();
    }

    pub fn page_rows(&self) -> Vec<&Row> {
        let page = paginate(&self.order, self.page.page_size(), self.page.page_index());
        page.rows.iter().map(|&pos| &self.results.rows()[pos]).collect()
    }

    pub fn render(&self) -> PageRender {
        let columns = self.results.columns();
        let headers = columns
            .iter()
            .map(|key| ColumnHeader {
                key: key.clone(),
                width: self.layout.width(key),
                sort: self
                    .sort
                    .as_ref()
                    .filter(|s| &s.column == key)
                    .map(|s| s.direction),
            })
            .collect();

        let rows = self
            .page_rows()
            .into_iter()
            .map(|row| RenderedRow {
                id: row.id(),
                cells: columns
                    .iter()
                    .map(|column| self.render_cell(row, column))
                    .collect(),
            })
            .collect();

        PageRender {
            keyword: self.results.keyword().to_string(),
            headers,
            rows,
            page_index: self.page.page_index(),
            page_count: self.page_count(),
            total_rows: self.results.len(),
            has_prev: self.page.has_prev(),
            has_next: self.page.has_next(self.results.len()),
        }
    }

    fn render_cell(&self, row: &Row, column: &str) -> RenderedCell {
        let text = row.text(column);
        let segments = self.highlighter.highlight(&text);
        let treatment = if self.expansion.is_expanded(row.id(), column) {
            CellTreatment::Expanded
        } else {
            CellTreatment::Truncated
        };
        RenderedCell {
            column: column.to_string(),
            text,
            segments,
            treatment,
        }
    }
}
