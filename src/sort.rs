use rayon::prelude::*;
use tracing::trace;

use crate::rows::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub column: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn ascending(column: &str) -> Self {
        SortState {
            column: column.to_string(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(column: &str) -> Self {
        SortState {
            column: column.to_string(),
            direction: SortDirection::Descending,
        }
    }
}

/// Sort state after a click on `clicked`: ascending, then descending, then back to the
/// backend order.
pub fn next_sort_state(current: Option<&SortState>, clicked: &str) -> Option<SortState> {
    match current {
        Some(state) if state.column == clicked => match state.direction {
            SortDirection::Ascending => Some(SortState::descending(clicked)),
            SortDirection::Descending => None,
        },
        _ => Some(SortState::ascending(clicked)),
    }
}

/// Returns the positions of `rows` in display order.
///
/// Values are compared by their text. The sort is stable in both directions, rows with equal
/// values keep their relative input order.
pub fn apply_sort(rows: &[Row], state: Option<&SortState>) -> Vec<usize> {
    let Some(state) = state else {
        return (0..rows.len()).collect();
    };

    let mut keyed: Vec<(usize, String)> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| (idx, row.text(&state.column)))
        .collect();

    // par_sort_by is a stable merge sort
    match state.direction {
        SortDirection::Ascending => keyed.par_sort_by(|(_, a), (_, b)| a.cmp(b)),
        SortDirection::Descending => keyed.par_sort_by(|(_, a), (_, b)| b.cmp(a)),
    }
    trace!("Sorted {} rows by {:?}", keyed.len(), state);

    keyed.into_iter().map(|(idx, _)| idx).collect()
}
