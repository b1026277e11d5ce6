use std::io::Error;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::search::SearchError;

#[derive(Debug, Error)]
pub enum RsvError {
    #[error("io error: {0}")]
    IoError(#[from] Error),
    #[error("{0}")]
    SearchError(#[from] SearchError),
    #[error("failed to set up logging: {0}")]
    LoggingFailed(String),
}

#[derive(Debug, Clone, Setters)]
pub struct RsvConfig {
    pub backend_url: String,
    pub page_size: usize,
    pub event_poll_time: u64,
    pub health_interval: u64,
    pub request_timeout: u64,
    pub primary_columns: Vec<String>,
    pub max_log_lines: usize,
}

impl Default for RsvConfig {
    fn default() -> Self {
        RsvConfig {
            backend_url: "http://localhost:8008".to_string(),
            page_size: 50,
            event_poll_time: 100,
            health_interval: 1000,
            request_timeout: 30,
            primary_columns: vec!["id".to_string(), "name".to_string(), "title".to_string()],
            max_log_lines: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Exit,
    Help,
    Resize(usize, usize),
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    SortColumn,
    SortBy(usize),
    ToggleCell,
    ToggleCellAt(usize, usize), // Page row, column
    GrowColumn,
    ShrinkColumn,
    BeginResize(usize, u16), // Column, pointer x
    DragResize(u16),
    EndResize,
    CopyCell,
    EnterSearch,
    ToggleFullscreen,
    RawKey(KeyEvent),
}

pub const GENERIC_SEARCH_FAILURE: &str = "Search failed. Please try again.";

pub const HELP_TEXT: &str = "\
Search
  /            Enter a keyword, <Enter> to search, <Esc> to cancel

Table
  arrows       Move the selected cell
  s            Sort by the selected column (asc, desc, off)
  Enter Space  Expand or collapse the selected cell
  < >          Shrink or grow the selected column
  y            Copy the selected cell
  n p          Next or previous page (also PageDown PageUp)
  Home End     First or last page

Mouse
  click header         Sort by column
  drag header border   Resize column
  click cell           Expand or collapse

Other
  F11          Toggle fullscreen table
  ?            Show this help, <Esc> to close
  q            Quit";
