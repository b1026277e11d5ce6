use std::collections::HashMap;

use tracing::trace;

pub const MIN_COLUMN_WIDTH: u16 = 6;
pub const DEFAULT_COLUMN_WIDTH: u16 = 14;
pub const PRIMARY_COLUMN_WIDTH: u16 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Drag {
    column: String,
    start_width: u16,
}

/// Display width per column in terminal cells.
///
/// Entries only exist for columns the user resized, everything else resolves to a default.
/// Widths survive new search results.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    widths: HashMap<String, u16>,
    primary_columns: Vec<String>,
    drag: Option<Drag>,
}

impl ColumnLayout {
    pub fn new(primary_columns: &[String]) -> Self {
        ColumnLayout {
            widths: HashMap::new(),
            primary_columns: primary_columns.iter().map(|c| c.to_lowercase()).collect(),
            drag: None,
        }
    }

    pub fn default_width(&self, column: &str) -> u16 {
        let lower = column.to_lowercase();
        if self.primary_columns.contains(&lower) {
            PRIMARY_COLUMN_WIDTH
        } else {
            DEFAULT_COLUMN_WIDTH
        }
    }

    pub fn width(&self, column: &str) -> u16 {
        self.widths
            .get(column)
            .copied()
            .unwrap_or_else(|| self.default_width(column))
    }

    pub fn resize(&mut self, column: &str, delta: i32) -> u16 {
        let width = Self::apply_delta(self.width(column), delta);
        self.widths.insert(column.to_string(), width);
        trace!("Resized column {column:?} to {width}");
        width
    }

    /// Starts a drag gesture, subsequent updates are relative to the width at this point.
    pub fn begin_drag(&mut self, column: &str) {
        self.drag = Some(Drag {
            column: column.to_string(),
            start_width: self.width(column),
        });
    }

    pub fn drag_to(&mut self, cumulative_delta: i32) -> Option<u16> {
        let drag = self.drag.as_ref()?;
        let width = Self::apply_delta(drag.start_width, cumulative_delta);
        self.widths.insert(drag.column.clone(), width);
        Some(width)
    }

    pub fn end_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            trace!(
                "Finished resizing {:?}: {} -> {}",
                drag.column,
                drag.start_width,
                self.width(&drag.column)
            );
        }
    }

    pub fn dragging(&self) -> Option<&str> {
        self.drag.as_ref().map(|d| d.column.as_str())
    }

    fn apply_delta(width: u16, delta: i32) -> u16 {
        let width = i32::from(width)
            .saturating_add(delta)
            .clamp(i32::from(MIN_COLUMN_WIDTH), i32::from(u16::MAX));
        width as u16
    }
}
