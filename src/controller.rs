use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};

use crate::domain::{CedConfig, CedError, Message};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &CedConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, CedError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                // While a prompt is active the editor consumes keys raw.
                if model.raw_keyevents() {
                    Ok(Some(Message::RawKey(key)))
                } else {
                    Ok(self.handle_key(key))
                }
            }
            Event::Mouse(mouse) => Ok(self.handle_mouse(mouse)),
            Event::Resize(width, height) => Ok(Some(Message::Resize(width, height))),
            _ => Ok(None),
        }
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Esc => Some(Message::Exit),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::Char('g') => Some(Message::MoveBeginning),
            KeyCode::Char('G') => Some(Message::MoveEnd),
            KeyCode::Home => Some(Message::MoveToFirstColumn),
            KeyCode::End => Some(Message::MoveToLastColumn),
            KeyCode::Char('o') => Some(Message::OpenFile),
            KeyCode::Char('w') => Some(Message::Export),
            KeyCode::Char('y') => Some(Message::CopyCell),
            KeyCode::Char('Y') => Some(Message::CopyRow),
            KeyCode::Char('i') => Some(Message::ToggleIndex),
            KeyCode::Char('p') => Some(Message::TogglePreview),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char('>') => Some(Message::WidenColumn),
            KeyCode::Char('<') => Some(Message::NarrowColumn),
            KeyCode::Char('}') => Some(Message::GrowPanel),
            KeyCode::Char('{') => Some(Message::ShrinkPanel),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn handle_mouse(&self, mouse: MouseEvent) -> Option<Message> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                Some(Message::MouseDown(mouse.column, mouse.row))
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                Some(Message::MouseDrag(mouse.column, mouse.row))
            }
            MouseEventKind::Up(MouseButton::Left) => {
                Some(Message::MouseUp(mouse.column, mouse.row))
            }
            MouseEventKind::ScrollUp => Some(Message::MoveUp),
            MouseEventKind::ScrollDown => Some(Message::MoveDown),
            _ => None,
        }
    }
}
