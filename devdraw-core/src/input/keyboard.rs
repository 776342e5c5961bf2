//! Keyboard record translation.
//!
//! Each record is a tag byte followed by UTF-8 runes:
//!
//! - `c` one or more typed characters
//! - `k` every key now held, sent after a press
//! - `K` every key still held, sent after a release

use crate::error::DrawError;
use crate::input::event::KeyEvent;

/// Tracks which keys are held so raw key records become press and
/// release events.
#[derive(Debug, Default)]
pub struct KeyboardTranslator {
    down: Vec<char>,
}

impl KeyboardTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held(&self) -> &[char] {
        &self.down
    }

    /// Events for one record, without its NUL terminator.
    pub fn translate(&mut self, record: &[u8]) -> Result<Vec<KeyEvent>, DrawError> {
        let (&tag, body) = record
            .split_first()
            .ok_or_else(|| DrawError::InvalidRecord("empty keyboard record".into()))?;
        let runes: Vec<char> = std::str::from_utf8(body)
            .map_err(|e| DrawError::InvalidRecord(format!("keyboard record: {e}")))?
            .chars()
            .collect();

        let events = match tag {
            b'c' => runes.iter().copied().map(KeyEvent::typed).collect(),
            b'k' => {
                let pressed = runes
                    .iter()
                    .filter(|r| !self.down.contains(r))
                    .copied()
                    .map(KeyEvent::press)
                    .collect();
                self.down = runes;
                pressed
            }
            b'K' => {
                let released = self
                    .down
                    .iter()
                    .filter(|r| !runes.contains(r))
                    .copied()
                    .map(KeyEvent::release)
                    .collect();
                self.down = runes;
                released
            }
            other => {
                return Err(DrawError::InvalidRecord(format!(
                    "unknown keyboard record tag {:?}",
                    other as char
                )));
            }
        };
        Ok(events)
    }
}
