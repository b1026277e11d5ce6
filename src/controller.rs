use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, RsvConfig, RsvError};
use crate::model::{Hit, Model};
use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &RsvConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, RsvError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            let message = match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    self.handle_key(key, model.raw_keyevents())
                }
                Event::Mouse(mouse) => self.handle_mouse(mouse, model),
                Event::Resize(width, height) => {
                    Some(Message::Resize(width as usize, height as usize))
                }
                _ => None,
            };
            return Ok(message);
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent, raw_input: bool) -> Option<Message> {
        if raw_input {
            return Some(Message::RawKey(key));
        }
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Char('/'), _) => Some(Message::EnterSearch),
            (KeyCode::Up | KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down | KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left | KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right | KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::Char('s'), _) => Some(Message::SortColumn),
            (KeyCode::Enter | KeyCode::Char(' '), _) => Some(Message::ToggleCell),
            (KeyCode::Char('<'), _) => Some(Message::ShrinkColumn),
            (KeyCode::Char('>'), _) => Some(Message::GrowColumn),
            (KeyCode::Char('y'), _) => Some(Message::CopyCell),
            (KeyCode::Char('n') | KeyCode::PageDown, _) => Some(Message::NextPage),
            (KeyCode::Char('p') | KeyCode::PageUp, _) => Some(Message::PrevPage),
            (KeyCode::Home, _) => Some(Message::FirstPage),
            (KeyCode::End, _) => Some(Message::LastPage),
            (KeyCode::F(11), _) => Some(Message::ToggleFullscreen),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn handle_mouse(&self, mouse: MouseEvent, model: &Model) -> Option<Message> {
        let message = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                match model.hit_test(mouse.column, mouse.row)? {
                    Hit::Header(column) => Some(Message::SortBy(column)),
                    Hit::HeaderBorder(column) => Some(Message::BeginResize(column, mouse.column)),
                    Hit::Cell(row, column) => Some(Message::ToggleCellAt(row, column)),
                }
            }
            MouseEventKind::Drag(MouseButton::Left) if model.is_resizing() => {
                Some(Message::DragResize(mouse.column))
            }
            MouseEventKind::Up(MouseButton::Left) if model.is_resizing() => {
                Some(Message::EndResize)
            }
            MouseEventKind::ScrollDown => Some(Message::MoveDown),
            MouseEventKind::ScrollUp => Some(Message::MoveUp),
            _ => None,
        };
        if message.is_some() {
            trace!("Mapped: {mouse:?} => {message:?}");
        }
        message
    }
}
