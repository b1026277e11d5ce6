use crate::rows::RowId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedCell {
    pub row: RowId,
    pub column: String,
}

/// Keeps track of the single cell shown untruncated.
#[derive(Debug, Default)]
pub struct ExpansionTracker {
    expanded: Option<ExpandedCell>,
}

impl ExpansionTracker {
    pub fn toggle(&mut self, row: RowId, column: &str) -> Option<&ExpandedCell> {
        let same = self
            .expanded
            .as_ref()
            .is_some_and(|cell| cell.row == row && cell.column == column);
        self.expanded = if same {
            None
        } else {
            Some(ExpandedCell {
                row,
                column: column.to_string(),
            })
        };
        self.expanded.as_ref()
    }

    pub fn is_expanded(&self, row: RowId, column: &str) -> bool {
        self.expanded
            .as_ref()
            .is_some_and(|cell| cell.row == row && cell.column == column)
    }

    pub fn current(&self) -> Option<&ExpandedCell> {
        self.expanded.as_ref()
    }

    pub fn clear(&mut self) {
        self.expanded = None;
    }
}
