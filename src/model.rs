use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use ratatui::layout::{Constraint, Layout, Rect};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace};

use crate::domain::{GENERIC_SEARCH_FAILURE, HELP_TEXT, Message, RsvConfig};
use crate::inputter::{InputResult, Inputter};
use crate::presenter::{CellTreatment, PageRender, ResultsPresenter};
use crate::search::{Backend, HealthProbe, ProbeEvent, SearchOrchestrator, SearchOutcome};
use crate::sort::SortDirection;
use crate::ui::{
    self, COLUMN_RESIZE_STEP, COLUMN_SPACING, LOG_PANEL_HEIGHT, PAGER_HEIGHT, SEARCH_HEIGHT,
    STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT, TITLE_HEIGHT,
};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Status {
    CONNECTING,
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    SEARCHINPUT,
    POPUP,
}

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct UILayout {
    pub width: u16,
    pub height: u16,
    pub title: Rect,
    pub search: Rect,
    pub table: Rect, // Header line and body
    pub pager: Rect,
    pub logs: Rect,
    pub statusline: Rect,
}

impl UILayout {
    pub fn from_values(ui_width: u16, ui_height: u16, fullscreen: bool) -> Self {
        let area = Rect::new(0, 0, ui_width, ui_height);
        // Fullscreen hides everything except the table, its pager and the search line
        let (title_height, log_height) = if fullscreen {
            (0, 0)
        } else {
            (TITLE_HEIGHT, LOG_PANEL_HEIGHT)
        };
        let [title, search, table, pager, logs, statusline] = Layout::vertical([
            Constraint::Length(title_height),
            Constraint::Length(SEARCH_HEIGHT),
            Constraint::Min(TABLE_HEADER_HEIGHT + 1),
            Constraint::Length(PAGER_HEIGHT),
            Constraint::Length(log_height),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .areas(area);

        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            title,
            search,
            table,
            pager,
            logs,
            statusline,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpan {
    pub column: usize, // Index into PageRender.headers
    pub x: u16,
    pub width: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowSpan {
    pub row: usize, // Index into PageRender.rows
    pub y: u16,
    pub height: u16,
    // Expanded cell of this row, may reach over the columns to its right
    pub expanded: Option<ColumnSpan>,
}

/// Screen position of every visible column and row, shared by drawing and mouse handling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableGeometry {
    pub header_y: u16,
    pub columns: Vec<ColumnSpan>,
    pub rows: Vec<RowSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hit {
    Header(usize),
    HeaderBorder(usize),
    Cell(usize, usize),
}

impl TableGeometry {
    fn build(render: &PageRender, table: Rect, offset_column: usize, offset_row: usize) -> Self {
        let right = table.right();
        let bottom = table.bottom();

        let mut columns = Vec::new();
        let mut x = table.x;
        for (idx, header) in render.headers.iter().enumerate().skip(offset_column) {
            if x >= right {
                break;
            }
            // The last column may only be partially visible
            let width = header.width.min(right - x);
            columns.push(ColumnSpan { column: idx, x, width });
            x = x.saturating_add(width).saturating_add(COLUMN_SPACING);
        }

        let mut rows = Vec::new();
        let mut y = table.y.saturating_add(TABLE_HEADER_HEIGHT);
        for (idx, row) in render.rows.iter().enumerate().skip(offset_row) {
            if y >= bottom {
                break;
            }
            let expanded = columns.iter().find_map(|span| {
                let cell = row.cells.get(span.column)?;
                (cell.treatment == CellTreatment::Expanded).then(|| ColumnSpan {
                    column: span.column,
                    x: span.x,
                    width: ui::expanded_width(&cell.segments, span.width, right - span.x),
                })
            });
            let height = expanded
                .and_then(|span| {
                    let cell = row.cells.get(span.column)?;
                    Some(ui::wrapped_height(&cell.segments, span.width))
                })
                .unwrap_or(1);
            let height = u16::try_from(height).unwrap_or(u16::MAX).min(bottom - y);
            rows.push(RowSpan {
                row: idx,
                y,
                height,
                expanded,
            });
            y += height;
        }

        TableGeometry {
            header_y: table.y,
            columns,
            rows,
        }
    }

    pub fn hit(&self, x: u16, y: u16) -> Option<Hit> {
        if y == self.header_y {
            for span in self.columns.iter() {
                if x >= span.x && x < span.x + span.width {
                    return Some(Hit::Header(span.column));
                }
                if x == span.x + span.width {
                    return Some(Hit::HeaderBorder(span.column));
                }
            }
            return None;
        }
        let row = self
            .rows
            .iter()
            .find(|r| y >= r.y && y < r.y.saturating_add(r.height))?;
        if let Some(span) = row.expanded
            && x >= span.x
            && x < span.x.saturating_add(span.width)
        {
            return Some(Hit::Cell(row.row, span.column));
        }
        let column = self
            .columns
            .iter()
            .find(|c| x >= c.x && x < c.x.saturating_add(c.width))?;
        Some(Hit::Cell(row.row, column.column))
    }
}

pub struct UIData {
    pub name: String,
    pub status: Status,
    pub render: PageRender,
    pub geometry: TableGeometry,
    pub layout: UILayout,
    pub selected_row: usize,
    pub selected_column: usize,
    pub search_input: Option<InputResult>,
    pub searching: bool,
    pub fullscreen: bool,
    pub logs: Vec<String>,
    pub show_popup: bool,
    pub popup_message: String,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            status: Status::CONNECTING,
            render: PageRender::empty(),
            geometry: TableGeometry::default(),
            layout: UILayout::default(),
            selected_row: 0,
            selected_column: 0,
            search_input: None,
            searching: false,
            fullscreen: false,
            logs: Vec::new(),
            show_popup: false,
            popup_message: String::new(),
            status_message: String::new(),
        }
    }
}

pub struct Model {
    config: RsvConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    presenter: ResultsPresenter,
    orchestrator: SearchOrchestrator,
    probe: HealthProbe,
    pending_keyword: Option<String>,
    render: PageRender,
    geometry: TableGeometry,
    uilayout: UILayout,
    uidata: UIData,
    cursor_row: usize,    // Row on the current page
    cursor_column: usize, // Column in the result set
    offset_row: usize,
    offset_column: usize,
    resize_origin: Option<u16>,
    input: Inputter,
    last_input: InputResult,
    fullscreen: bool,
    logs: VecDeque<String>,
    status_message: String,
    clipboard: Option<Clipboard>,
}

impl Model {
    pub fn init(
        config: &RsvConfig,
        backend: Arc<dyn Backend>,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let probe = HealthProbe::start(
            Arc::clone(&backend),
            Duration::from_millis(config.health_interval),
        );
        let mut model = Self {
            config: config.clone(),
            status: Status::CONNECTING,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            presenter: ResultsPresenter::new(config.page_size, &config.primary_columns),
            orchestrator: SearchOrchestrator::new(backend),
            probe,
            pending_keyword: None,
            render: PageRender::empty(),
            geometry: TableGeometry::default(),
            uilayout: UILayout::from_values(clamp_u16(ui_width), clamp_u16(ui_height), false),
            uidata: UIData::empty(),
            cursor_row: 0,
            cursor_column: 0,
            offset_row: 0,
            offset_column: 0,
            resize_origin: None,
            input: Inputter::default(),
            last_input: InputResult::default(),
            fullscreen: false,
            logs: VecDeque::new(),
            status_message: String::new(),
            clipboard: None,
        };
        model.log("[ui] Waiting for backend to connect...");
        model.set_status_message(format!("Connecting to {} ...", config.backend_url));
        model.update_table_data();
        model
    }

    /// Keyword to search for as soon as the backend is reachable.
    pub fn queue_search(&mut self, keyword: &str) {
        if self.status == Status::READY {
            self.perform_search(keyword);
        } else {
            self.pending_keyword = Some(keyword.to_string());
        }
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SEARCHINPUT
    }

    pub fn is_resizing(&self) -> bool {
        self.resize_origin.is_some() && self.presenter.layout().dragging().is_some()
    }

    pub fn hit_test(&self, x: u16, y: u16) -> Option<Hit> {
        if self.status != Status::READY || self.modus != Modus::TABLE {
            return None;
        }
        self.geometry.hit(x, y)
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) {
        self.poll_background();

        if let Some(msg) = message {
            if self.status == Status::CONNECTING {
                // Nothing to interact with until the backend is up
                match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::ToggleFullscreen => self.toggle_fullscreen(),
                    _ => (),
                }
            } else {
                match self.modus {
                    Modus::TABLE => match msg {
                        Message::Quit => self.quit(),
                        Message::Resize(width, height) => self.ui_resize(width, height),
                        Message::MoveUp => self.move_selection_up(),
                        Message::MoveDown => self.move_selection_down(),
                        Message::MoveLeft => self.move_selection_left(),
                        Message::MoveRight => self.move_selection_right(),
                        Message::NextPage => self.change_page(Message::NextPage),
                        Message::PrevPage => self.change_page(Message::PrevPage),
                        Message::FirstPage => self.change_page(Message::FirstPage),
                        Message::LastPage => self.change_page(Message::LastPage),
                        Message::SortColumn => self.sort_column(self.cursor_column),
                        Message::SortBy(column) => self.sort_column(column),
                        Message::ToggleCell => self.toggle_cell(self.cursor_row, self.cursor_column),
                        Message::ToggleCellAt(row, column) => self.toggle_cell(row, column),
                        Message::GrowColumn => self.resize_selected_column(COLUMN_RESIZE_STEP),
                        Message::ShrinkColumn => {
                            self.resize_selected_column(-COLUMN_RESIZE_STEP)
                        }
                        Message::BeginResize(column, x) => self.begin_resize(column, x),
                        Message::DragResize(x) => self.drag_resize(x),
                        Message::EndResize => self.end_resize(),
                        Message::CopyCell => self.copy_cell(),
                        Message::EnterSearch => self.enter_search_mode(),
                        Message::ToggleFullscreen => self.toggle_fullscreen(),
                        Message::Help => self.show_help(),
                        Message::Exit | Message::RawKey(_) => (),
                    },
                    Modus::SEARCHINPUT => match msg {
                        Message::RawKey(key) => self.raw_input(key),
                        Message::Resize(width, height) => self.ui_resize(width, height),
                        _ => (),
                    },
                    Modus::POPUP => match msg {
                        Message::Quit => self.quit(),
                        Message::Resize(width, height) => self.ui_resize(width, height),
                        Message::Exit | Message::Help => self.close_popup(),
                        _ => (),
                    },
                }
            }
        }

        self.update_uidata();
    }

    // ------------------------ Background events --------------------------- //

    fn poll_background(&mut self) {
        for event in self.probe.poll() {
            match event {
                // Announced once in init, retries only go to the log file
                ProbeEvent::Waiting(e) => debug!("Backend not reachable yet: {e}"),
                ProbeEvent::Connected => {
                    self.status = Status::READY;
                    self.log("[ui] Backend connected successfully.");
                    self.set_status_message("Connected. Press / to search, ? for help.");
                    if let Some(keyword) = self.pending_keyword.take() {
                        self.perform_search(&keyword);
                    }
                }
            }
        }

        for outcome in self.orchestrator.poll() {
            self.apply_search_outcome(outcome);
        }
    }

    fn perform_search(&mut self, keyword: &str) {
        match self.orchestrator.submit(keyword) {
            Ok(id) => {
                trace!("Submitted search #{id}");
                self.set_status_message(format!("Searching for \"{keyword}\" ..."));
            }
            Err(e) => {
                // Rejected before anything is sent
                info!("Search rejected: {e}");
                self.log(format!("[ui] {e}"));
            }
        }
    }

    fn apply_search_outcome(&mut self, outcome: SearchOutcome) {
        match outcome {
            SearchOutcome::Loaded(results) => {
                let count = results.len();
                self.presenter.replace_results(results);
                self.log(format!("[ui] Found {count} matching rows."));
                self.set_status_message(format!("Found {count} matching rows."));
            }
            SearchOutcome::Failed { keyword, error } => {
                error!("Search for {keyword:?} failed: {error}");
                // Stale rows are not kept around without a label
                self.presenter.clear_results();
                self.log(format!("[ui] {GENERIC_SEARCH_FAILURE}"));
                self.set_status_message(GENERIC_SEARCH_FAILURE);
            }
        }
        self.reset_selection();
        self.update_table_data();
    }

    // -------------------- Control handling functions ---------------------- //

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(clamp_u16(width), clamp_u16(height), self.fullscreen);
        self.update_table_data();
    }

    fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
        trace!("Fullscreen: {}", self.fullscreen);
        self.uilayout =
            UILayout::from_values(self.uilayout.width, self.uilayout.height, self.fullscreen);
        self.update_table_data();
    }

    fn reset_selection(&mut self) {
        self.cursor_row = 0;
        self.offset_row = 0;
    }

    fn move_selection_up(&mut self) {
        self.cursor_row = self.cursor_row.saturating_sub(1);
        self.update_table_data();
    }

    fn move_selection_down(&mut self) {
        if self.cursor_row + 1 < self.render.rows.len() {
            self.cursor_row += 1;
            self.update_table_data();
        }
    }

    fn move_selection_left(&mut self) {
        self.cursor_column = self.cursor_column.saturating_sub(1);
        self.update_table_data();
    }

    fn move_selection_right(&mut self) {
        if self.cursor_column + 1 < self.render.headers.len() {
            self.cursor_column += 1;
            self.update_table_data();
        }
    }

    fn change_page(&mut self, direction: Message) {
        let before = self.presenter.page_index();
        match direction {
            Message::NextPage => {
                if !self.presenter.next_page() {
                    self.set_status_message("Already on the last page.");
                }
            }
            Message::PrevPage => {
                if !self.presenter.prev_page() {
                    self.set_status_message("Already on the first page.");
                }
            }
            Message::FirstPage => self.presenter.first_page(),
            Message::LastPage => self.presenter.last_page(),
            _ => return,
        }
        if self.presenter.page_index() != before {
            self.reset_selection();
            self.update_table_data();
        }
    }

    fn column_key(&self, column: usize) -> Option<String> {
        self.render.headers.get(column).map(|h| h.key.clone())
    }

    fn sort_column(&mut self, column: usize) {
        let Some(key) = self.column_key(column) else {
            return;
        };
        self.cursor_column = column;
        let message = match self.presenter.click_header(&key).map(|s| s.direction) {
            Some(SortDirection::Ascending) => format!("Sorted by {key} ascending."),
            Some(SortDirection::Descending) => format!("Sorted by {key} descending."),
            None => "Sort cleared.".to_string(),
        };
        self.set_status_message(message);
        self.reset_selection();
        self.update_table_data();
    }

    fn toggle_cell(&mut self, row: usize, column: usize) {
        let Some(row_id) = self.render.rows.get(row).map(|r| r.id) else {
            return;
        };
        let Some(key) = self.column_key(column) else {
            return;
        };
        self.cursor_row = row;
        self.cursor_column = column;
        if !self.presenter.toggle_cell(row_id, &key) {
            trace!("Collapsed {row_id:?}/{key}");
        }
        trace!("Expanded cell: {:?}", self.presenter.expanded());
        self.update_table_data();
    }

    fn resize_selected_column(&mut self, delta: i32) {
        if let Some(key) = self.column_key(self.cursor_column) {
            let width = self.presenter.resize_column(&key, delta);
            self.set_status_message(format!("Column {key} is {width} wide."));
            self.update_table_data();
        }
    }

    fn begin_resize(&mut self, column: usize, x: u16) {
        if let Some(key) = self.column_key(column) {
            self.presenter.begin_resize(&key);
            self.resize_origin = Some(x);
        }
    }

    fn drag_resize(&mut self, x: u16) {
        if let Some(origin) = self.resize_origin {
            let delta = i32::from(x) - i32::from(origin);
            if self.presenter.drag_resize(delta).is_some() {
                self.update_table_data();
            }
        }
    }

    fn end_resize(&mut self) {
        if self.resize_origin.take().is_some() {
            self.presenter.end_resize();
            self.update_table_data();
        }
    }

    fn selected_cell_text(&self) -> Option<String> {
        self.render
            .rows
            .get(self.cursor_row)?
            .cells
            .get(self.cursor_column)
            .map(|c| c.text.clone())
    }

    fn copy_cell(&mut self) {
        let Some(cell) = self.selected_cell_text() else {
            return;
        };
        trace!("Cell content: {}", cell);

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    error!("Clipboard is not available: {:?}", e);
                    self.set_status_message("Clipboard is not available.");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(cell) {
                Ok(_) => self.set_status_message("Copied cell content to clipboard."),
                Err(e) => error!("Error copying to clipboard: {:?}", e),
            }
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
    }

    fn enter_search_mode(&mut self) {
        trace!("Entering search input ...");
        self.previous_modus = self.modus;
        self.modus = Modus::SEARCHINPUT;
        let keyword = self.presenter.results().keyword().to_string();
        self.input.set(&keyword);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.modus = self.previous_modus;
            self.previous_modus = Modus::SEARCHINPUT;
            if !self.last_input.canceled {
                let keyword = self.last_input.input.clone();
                self.perform_search(&keyword);
            }
        }
    }

    // --------------------------- View data -------------------------------- //

    fn update_table_data(&mut self) {
        self.render = self.presenter.render();

        self.cursor_row = self.cursor_row.min(self.render.rows.len().saturating_sub(1));
        self.cursor_column = self
            .cursor_column
            .min(self.render.headers.len().saturating_sub(1));
        self.offset_row = self.offset_row.min(self.cursor_row);
        self.offset_column = self.offset_column.min(self.cursor_column);

        // Scroll until the selected cell is on screen
        loop {
            self.geometry = TableGeometry::build(
                &self.render,
                self.uilayout.table,
                self.offset_column,
                self.offset_row,
            );
            let row_visible = self.render.rows.is_empty()
                || self.geometry.rows.iter().any(|r| r.row == self.cursor_row);
            let column_visible = self.render.headers.is_empty()
                || self
                    .geometry
                    .columns
                    .iter()
                    .any(|c| c.column == self.cursor_column);

            let mut moved = false;
            if !row_visible && self.offset_row < self.cursor_row {
                self.offset_row += 1;
                moved = true;
            }
            if !column_visible && self.offset_column < self.cursor_column {
                self.offset_column += 1;
                moved = true;
            }
            if !moved {
                break;
            }
        }

        trace!(
            "Table: Cr {}, Cc {}, Or {}, Oc {}, rows {}, columns {}",
            self.cursor_row,
            self.cursor_column,
            self.offset_row,
            self.offset_column,
            self.geometry.rows.len(),
            self.geometry.columns.len()
        );
        self.update_uidata();
    }

    fn update_uidata(&mut self) {
        let search_input = (self.modus == Modus::SEARCHINPUT).then(|| self.last_input.clone());
        let show_popup = self.modus == Modus::POPUP;
        self.uidata = UIData {
            name: self.config.backend_url.clone(),
            status: self.status,
            render: self.render.clone(),
            geometry: self.geometry.clone(),
            layout: self.uilayout,
            selected_row: self.cursor_row,
            selected_column: self.cursor_column,
            search_input,
            searching: self.orchestrator.in_flight(),
            fullscreen: self.fullscreen,
            logs: self.logs.iter().cloned().collect(),
            show_popup,
            popup_message: if show_popup {
                HELP_TEXT.to_string()
            } else {
                String::new()
            },
            status_message: self.status_message.clone(),
        }
    }

    fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");
        self.logs.push_back(line);
        while self.logs.len() > self.config.max_log_lines.max(1) {
            self.logs.pop_front();
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }
}

fn clamp_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::FakeBackend;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use std::sync::atomic::Ordering;
    use std::thread;
    use std::time::Instant;

    fn config() -> RsvConfig {
        RsvConfig::default().health_interval(10).page_size(1)
    }

    fn wait_until(model: &mut Model, cond: impl Fn(&Model) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond(model) && Instant::now() < deadline {
            model.update(None);
            thread::sleep(Duration::from_millis(5));
        }
        assert!(cond(model), "condition not reached in time");
    }

    fn connected(backend: Arc<FakeBackend>, config: &RsvConfig) -> Model {
        connected_with_width(backend, config, 100)
    }

    fn connected_with_width(backend: Arc<FakeBackend>, config: &RsvConfig, width: usize) -> Model {
        let mut model = Model::init(config, backend, width, 40);
        wait_until(&mut model, |m| m.status == Status::READY);
        model
    }

    fn type_keyword(model: &mut Model, keyword: &str) {
        model.update(Some(Message::EnterSearch));
        model.update(Some(Message::RawKey(KeyEvent::new(
            KeyCode::Char('u'),
            KeyModifiers::CONTROL,
        ))));
        for c in keyword.chars() {
            model.update(Some(Message::RawKey(KeyEvent::new(
                KeyCode::Char(c),
                KeyModifiers::NONE,
            ))));
        }
        model.update(Some(Message::RawKey(KeyEvent::new(
            KeyCode::Enter,
            KeyModifiers::NONE,
        ))));
    }

    fn search(model: &mut Model, keyword: &str) {
        type_keyword(model, keyword);
        wait_until(model, |m| !m.orchestrator.in_flight());
    }

    fn count_logs(model: &Model, line: &str) -> usize {
        model.get_uidata().logs.iter().filter(|l| *l == line).count()
    }

    #[test]
    fn stays_on_connecting_screen_until_backend_answers() {
        let backend = Arc::new(FakeBackend::default());
        backend.health_failures.store(usize::MAX, Ordering::SeqCst);
        let mut model = Model::init(&config(), backend.clone(), 100, 40);
        model.update(Some(Message::EnterSearch));
        model.update(Some(Message::MoveDown));
        assert_eq!(model.status, Status::CONNECTING);
        assert!(!model.raw_keyevents());
        model.update(Some(Message::Quit));
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn search_shows_rows() {
        let backend = Arc::new(FakeBackend::default());
        let mut model = connected(backend.clone(), &config().page_size(10));
        assert_eq!(count_logs(&model, "[ui] Backend connected successfully."), 1);

        search(&mut model, "ann");
        let ui = model.get_uidata();
        assert_eq!(ui.render.rows.len(), 2);
        assert_eq!(ui.render.keyword, "ann");
        assert_eq!(count_logs(&model, "[ui] Found 2 matching rows."), 1);
        assert_eq!(*backend.searches.lock().unwrap(), vec!["ann".to_string()]);
    }

    #[test]
    fn empty_keyword_is_rejected_locally() {
        let backend = Arc::new(FakeBackend::default());
        let mut model = connected(backend.clone(), &config());
        type_keyword(&mut model, "  ");
        assert!(!model.raw_keyevents());
        assert_eq!(
            count_logs(&model, "[ui] Please enter a keyword to search."),
            1
        );
        assert!(backend.searches.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_search_clears_results() {
        let backend = Arc::new(FakeBackend::default());
        let mut model = connected(backend, &config().page_size(10));
        search(&mut model, "ann");
        assert_eq!(model.get_uidata().render.total_rows, 2);

        search(&mut model, "failing");
        let ui = model.get_uidata();
        assert_eq!(ui.render.total_rows, 0);
        assert!(ui.render.rows.is_empty());
        assert_eq!(ui.status_message, GENERIC_SEARCH_FAILURE);
        assert_eq!(
            count_logs(&model, &format!("[ui] {GENERIC_SEARCH_FAILURE}")),
            1
        );
    }

    #[test]
    fn queued_keyword_runs_after_connect() {
        let backend = Arc::new(FakeBackend::default());
        backend.health_failures.store(2, Ordering::SeqCst);
        let mut model = Model::init(&config(), backend.clone(), 100, 40);
        model.queue_search("bob");
        wait_until(&mut model, |m| m.get_uidata().render.total_rows == 2);
        assert_eq!(model.get_uidata().render.keyword, "bob");
    }

    #[test]
    fn paging_and_sorting_through_messages() {
        let backend = Arc::new(FakeBackend::default());
        let mut model = connected(backend, &config());
        search(&mut model, "x");
        // Page size 1: Bob, then Ann
        let first = |m: &Model| m.get_uidata().render.rows[0].cells[0].text.clone();
        assert_eq!(first(&model), "Bob");

        model.update(Some(Message::NextPage));
        assert_eq!(first(&model), "Ann");
        assert_eq!(model.get_uidata().render.page_index, 1);
        model.update(Some(Message::NextPage));
        assert_eq!(model.get_uidata().render.page_index, 1);
        assert_eq!(model.get_uidata().status_message, "Already on the last page.");

        model.update(Some(Message::SortBy(0)));
        assert_eq!(model.get_uidata().render.page_index, 0);
        assert_eq!(first(&model), "Ann");
        model.update(Some(Message::SortColumn));
        assert_eq!(first(&model), "Bob");
        assert_eq!(model.get_uidata().status_message, "Sorted by name descending.");

        model.update(Some(Message::LastPage));
        assert_eq!(first(&model), "Ann");
        model.update(Some(Message::FirstPage));
        assert_eq!(first(&model), "Bob");
    }

    #[test]
    fn toggle_selected_cell() {
        let backend = Arc::new(FakeBackend::default());
        let mut model = connected(backend, &config().page_size(10));
        search(&mut model, "x");
        model.update(Some(Message::MoveDown));
        model.update(Some(Message::MoveRight));
        model.update(Some(Message::ToggleCell));
        let ui = model.get_uidata();
        assert_eq!(ui.selected_row, 1);
        assert_eq!(ui.selected_column, 1);
        assert_eq!(ui.render.rows[1].cells[1].treatment, CellTreatment::Expanded);

        model.update(Some(Message::ToggleCellAt(0, 0)));
        let ui = model.get_uidata();
        assert_eq!(ui.render.rows[0].cells[0].treatment, CellTreatment::Expanded);
        assert_ne!(ui.render.rows[1].cells[1].treatment, CellTreatment::Expanded);
    }

    #[test]
    fn mouse_geometry_matches_columns() {
        let backend = Arc::new(FakeBackend::default());
        let mut model = connected(backend, &config().page_size(10));
        search(&mut model, "x");
        let ui = model.get_uidata();
        let table = ui.layout.table;
        let name = ui.geometry.columns[0];
        assert_eq!(name.x, table.x);

        assert_eq!(model.hit_test(table.x, table.y), Some(Hit::Header(0)));
        assert_eq!(
            model.hit_test(table.x + name.width, table.y),
            Some(Hit::HeaderBorder(0))
        );
        assert_eq!(
            model.hit_test(table.x + name.width + 1, table.y + 2),
            Some(Hit::Cell(1, 1))
        );
    }

    #[test]
    fn drag_resizes_column() {
        let backend = Arc::new(FakeBackend::default());
        let mut model = connected(backend, &config().page_size(10));
        search(&mut model, "x");
        let before = model.get_uidata().render.headers[1].width;

        model.update(Some(Message::BeginResize(1, 40)));
        assert!(model.is_resizing());
        model.update(Some(Message::DragResize(42)));
        model.update(Some(Message::DragResize(45)));
        model.update(Some(Message::EndResize));
        assert!(!model.is_resizing());
        assert_eq!(model.get_uidata().render.headers[1].width, before + 5);

        model.update(Some(Message::ShrinkColumn));
        assert_eq!(
            model.get_uidata().render.headers[0].width,
            crate::layout::PRIMARY_COLUMN_WIDTH - COLUMN_RESIZE_STEP as u16
        );
    }

    #[test]
    fn fullscreen_hides_title_and_logs() {
        let backend = Arc::new(FakeBackend::default());
        let mut model = connected(backend, &config());
        let normal = model.get_uidata().layout;
        model.update(Some(Message::ToggleFullscreen));
        let full = model.get_uidata().layout;
        assert!(model.get_uidata().fullscreen);
        assert_eq!(full.title.height, 0);
        assert_eq!(full.logs.height, 0);
        assert!(full.table.height > normal.table.height);
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let backend = Arc::new(FakeBackend::default());
        let mut model = connected(backend, &config());
        model.update(Some(Message::Help));
        assert!(model.get_uidata().show_popup);
        assert_eq!(model.get_uidata().popup_message, HELP_TEXT);
        model.update(Some(Message::MoveDown));
        model.update(Some(Message::Exit));
        assert!(!model.get_uidata().show_popup);
    }

    #[test]
    fn expanded_row_grows() {
        let backend = Arc::new(FakeBackend::default());
        // 50 wide: column "q" starts at 40 and only has 10 cells left
        let mut model = connected_with_width(backend, &config().page_size(10), 50);
        search(&mut model, "a keyword long enough to wrap in a narrow column");
        // Column "q" holds the keyword
        model.update(Some(Message::ToggleCellAt(0, 2)));
        let rows = &model.get_uidata().geometry.rows;
        assert_eq!(rows[0].expanded.map(|s| s.width), Some(10));
        assert_eq!(rows[0].height, 5);
        assert_eq!(rows[1].y, rows[0].y + rows[0].height);
    }

    #[test]
    fn expanded_cell_uses_free_table_width() {
        let backend = Arc::new(FakeBackend::default());
        let mut model = connected(backend, &config().page_size(10));
        let keyword = "a keyword that fits on one table line ok";
        search(&mut model, keyword);
        model.update(Some(Message::ToggleCellAt(0, 2)));

        let ui = model.get_uidata();
        let column = ui.geometry.columns[2];
        assert_eq!(column.width, crate::layout::DEFAULT_COLUMN_WIDTH);
        let row = ui.geometry.rows[0];
        let expanded = row.expanded.unwrap();
        assert_eq!(expanded.column, 2);
        assert_eq!(expanded.x, column.x);
        assert_eq!(usize::from(expanded.width), keyword.len());
        assert_eq!(row.height, 1);
        assert!(ui.geometry.rows[1].expanded.is_none());

        // Clicks past the column border still land on the expanded cell
        assert_eq!(
            model.hit_test(column.x + column.width + 5, row.y),
            Some(Hit::Cell(0, 2))
        );
        model.update(Some(Message::ToggleCellAt(0, 2)));
        assert!(model.get_uidata().geometry.rows[0].expanded.is_none());
    }

    #[test]
    fn searched_keyword_is_kept_as_typed() {
        let backend = Arc::new(FakeBackend::default());
        let mut model = connected(backend.clone(), &config().page_size(10));
        model.queue_search(" Ann ");
        wait_until(&mut model, |m| m.get_uidata().render.total_rows == 2);
        assert_eq!(*backend.searches.lock().unwrap(), vec![" Ann ".to_string()]);
        assert_eq!(model.get_uidata().render.keyword, " Ann ");
    }

    #[test]
    fn geometry_without_rows() {
        let geometry = TableGeometry::build(&PageRender::empty(), Rect::new(0, 0, 10, 10), 0, 0);
        assert!(geometry.columns.is_empty());
        assert!(geometry.rows.is_empty());
        assert_eq!(geometry.hit(1, 1), None);
    }
}
