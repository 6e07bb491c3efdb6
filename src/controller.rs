use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, TVConfig, TVError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        Some(Message::RawKey(key))
                    } else {
                        self.handle_key(key)
                    }
                }
                Event::Resize(width, height) => {
                    Some(Message::Resize(width as usize, height as usize))
                }
                _ => None,
            });
        }
        Ok(None)
    }

    pub fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Down | KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Up | KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Left | KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right | KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::Home | KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
            (KeyCode::End | KeyCode::Char('G'), _) => Some(Message::MoveEnd),
            (KeyCode::PageDown | KeyCode::Char('n'), _) => Some(Message::NextPage),
            (KeyCode::PageUp | KeyCode::Char('p'), _) => Some(Message::PrevPage),
            (KeyCode::Char('N'), _) => Some(Message::LastPage),
            (KeyCode::Char('P'), _) => Some(Message::FirstPage),
            (KeyCode::Char('z'), _) => Some(Message::CyclePageSize),
            (KeyCode::Char('/') | KeyCode::Char('f'), _) => Some(Message::OpenFilter),
            (KeyCode::Char('r'), KeyModifiers::NONE) => Some(Message::ResetFilter),
            (KeyCode::Char('R'), _) => Some(Message::ResetAllFilters),
            (KeyCode::Char('s'), _) => Some(Message::Sort),
            (KeyCode::Char('c'), KeyModifiers::NONE) => Some(Message::CopyCell),
            (KeyCode::Char('C'), _) => Some(Message::CopyRow),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
