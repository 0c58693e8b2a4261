use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, PVConfig, PVError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &PVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, PVError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Ok(Some(Message::RawKey(key)))
                } else {
                    Ok(self.handle_key(key))
                }
            }
            Event::Resize(width, height) => {
                Ok(Some(Message::Resize(width as usize, height as usize)))
            }
            _ => Ok(None),
        }
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Down | KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Up | KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Left | KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right | KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::Home | KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
            (KeyCode::End | KeyCode::Char('G'), _) => Some(Message::MoveEnd),
            (KeyCode::Char('/'), _) => Some(Message::FilterByName),
            (KeyCode::Char('v'), _) => Some(Message::EditValue),
            (KeyCode::Char('c'), _) => Some(Message::NextColumn),
            (KeyCode::Char('C'), _) => Some(Message::PreviousColumn),
            (KeyCode::Char('o'), _) => Some(Message::NextComparison),
            (KeyCode::Char('a'), _) => Some(Message::ApplyNumericFilter),
            (KeyCode::Char('y'), _) => Some(Message::CopyCell),
            (KeyCode::Char('Y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('r'), _) => Some(Message::Reload),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn map(code: KeyCode, modifiers: KeyModifiers) -> Option<Message> {
        Controller::new(&PVConfig::default()).handle_key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn filter_controls_have_keys() {
        assert_eq!(map(KeyCode::Char('/'), KeyModifiers::NONE), Some(Message::FilterByName));
        assert_eq!(map(KeyCode::Char('c'), KeyModifiers::NONE), Some(Message::NextColumn));
        assert_eq!(map(KeyCode::Char('C'), KeyModifiers::SHIFT), Some(Message::PreviousColumn));
        assert_eq!(map(KeyCode::Char('o'), KeyModifiers::NONE), Some(Message::NextComparison));
        assert_eq!(map(KeyCode::Char('v'), KeyModifiers::NONE), Some(Message::EditValue));
        assert_eq!(map(KeyCode::Char('a'), KeyModifiers::NONE), Some(Message::ApplyNumericFilter));
    }

    #[test]
    fn quitting_and_unmapped_keys() {
        assert_eq!(map(KeyCode::Char('q'), KeyModifiers::NONE), Some(Message::Quit));
        assert_eq!(map(KeyCode::Char('c'), KeyModifiers::CONTROL), Some(Message::Quit));
        assert_eq!(map(KeyCode::Char('z'), KeyModifiers::NONE), None);
        assert_eq!(map(KeyCode::Esc, KeyModifiers::NONE), Some(Message::Exit));
    }
}
