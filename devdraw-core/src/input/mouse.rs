//! Mouse record parsing and button-transition translation.
//!
//! A mouse record is a tag byte followed by four 12-byte fields, each
//! an 11-character right-aligned decimal and a space:
//!
//! ```text
//! m     123     456       1   98765
//! ```
//!
//! Tag `m` carries position and button state; tag `r` announces that
//! the host window was resized.

use bitflags::bitflags;

use crate::error::DrawError;
use crate::input::event::{Button, Direction, MouseEvent};

const FIELD_LEN: usize = 12;
const FIELD_DIGITS: usize = 11;

bitflags! {
    /// Buttons and scroll directions active in one mouse record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ButtonMask: u32 {
        const LEFT = 1 << 0;
        const MIDDLE = 1 << 1;
        const RIGHT = 1 << 2;
        const WHEEL_UP = 1 << 3;
        const WHEEL_DOWN = 1 << 4;
    }
}

/// Bits checked per record, in emission order.
const TRACKED: [(ButtonMask, Button); 5] = [
    (ButtonMask::LEFT, Button::Left),
    (ButtonMask::MIDDLE, Button::Middle),
    (ButtonMask::RIGHT, Button::Right),
    (ButtonMask::WHEEL_UP, Button::WheelUp),
    (ButtonMask::WHEEL_DOWN, Button::WheelDown),
];

// ── MouseRecord ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseRecord {
    Move { x: f32, y: f32, buttons: ButtonMask },
    Resize,
}

impl MouseRecord {
    pub fn parse(record: &[u8]) -> Result<Self, DrawError> {
        match record.first() {
            Some(b'r') => Ok(MouseRecord::Resize),
            Some(b'm') => {
                let x = field(record, 0)?;
                let y = field(record, 1)?;
                let mask = field(record, 2)?;
                Ok(MouseRecord::Move {
                    x: parse_number(x, "x")?,
                    y: parse_number(y, "y")?,
                    buttons: ButtonMask::from_bits_truncate(parse_number(mask, "buttons")?),
                })
            }
            Some(&tag) => Err(DrawError::InvalidRecord(format!(
                "unknown mouse record tag {:?}",
                tag as char
            ))),
            None => Err(DrawError::InvalidRecord("empty mouse record".into())),
        }
    }
}

fn field(record: &[u8], index: usize) -> Result<&str, DrawError> {
    let start = 1 + index * FIELD_LEN;
    let bytes = record.get(start..start + FIELD_DIGITS).ok_or_else(|| {
        DrawError::InvalidRecord(format!(
            "mouse record of {} bytes has no field {index}",
            record.len()
        ))
    })?;
    std::str::from_utf8(bytes)
        .map(str::trim)
        .map_err(|e| DrawError::InvalidRecord(format!("mouse field {index}: {e}")))
}

fn parse_number<T: std::str::FromStr>(text: &str, name: &str) -> Result<T, DrawError>
where
    T::Err: std::fmt::Display,
{
    text.parse()
        .map_err(|e| DrawError::InvalidRecord(format!("mouse {name} {text:?}: {e}")))
}

// ── MouseTranslator ──────────────────────────────────────────────

/// Turns successive button masks into press and release events.
#[derive(Debug, Default)]
pub struct MouseTranslator {
    prev: ButtonMask,
}

impl MouseTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buttons(&self) -> ButtonMask {
        self.prev
    }

    /// Events for one record, in left, middle, right, wheel-up,
    /// wheel-down order. A record that changes no button yields a
    /// single motion event.
    pub fn translate(&mut self, x: f32, y: f32, buttons: ButtonMask) -> Vec<MouseEvent> {
        let mut events = Vec::new();
        for (bit, button) in TRACKED {
            let was = self.prev.contains(bit);
            let is = buttons.contains(bit);
            if is && !was {
                events.push(MouseEvent::new(x, y, button, Direction::Press));
            } else if was && !is {
                events.push(MouseEvent::new(x, y, button, Direction::Release));
            }
        }
        if events.is_empty() {
            events.push(MouseEvent::moved(x, y));
        }
        self.prev = buttons;
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tag: u8, x: i64, y: i64, buttons: u32) -> Vec<u8> {
        let mut out = vec![tag];
        for v in [x, y, buttons as i64, 12345] {
            out.extend_from_slice(format!("{v:>11} ").as_bytes());
        }
        out
    }

    #[test]
    fn parse_move_record() {
        let rec = record(b'm', 123, -4, 5);
        assert_eq!(rec.len(), crate::codec::MOUSE_RECORD_LEN);
        let parsed = MouseRecord::parse(&rec).unwrap();
        assert_eq!(
            parsed,
            MouseRecord::Move {
                x: 123.0,
                y: -4.0,
                buttons: ButtonMask::LEFT | ButtonMask::RIGHT,
            }
        );
    }

    #[test]
    fn parse_resize_record() {
        assert_eq!(MouseRecord::parse(&record(b'r', 0, 0, 0)).unwrap(), MouseRecord::Resize);
    }

    #[test]
    fn malformed_records_are_errors() {
        assert!(MouseRecord::parse(b"").is_err());
        assert!(MouseRecord::parse(&record(b'z', 1, 2, 0)).is_err());
        assert!(MouseRecord::parse(b"m         12").is_err());

        let mut bad = record(b'm', 1, 2, 0);
        bad[5] = b'x';
        assert!(matches!(MouseRecord::parse(&bad), Err(DrawError::InvalidRecord(_))));
    }

    #[test]
    fn left_then_middle_then_release_both() {
        let mut t = MouseTranslator::new();

        let first = t.translate(1.0, 2.0, ButtonMask::LEFT);
        assert_eq!(first, vec![MouseEvent::new(1.0, 2.0, Button::Left, Direction::Press)]);

        let second = t.translate(1.0, 2.0, ButtonMask::LEFT | ButtonMask::MIDDLE);
        assert_eq!(second, vec![MouseEvent::new(1.0, 2.0, Button::Middle, Direction::Press)]);

        let third = t.translate(3.0, 4.0, ButtonMask::empty());
        assert_eq!(
            third,
            vec![
                MouseEvent::new(3.0, 4.0, Button::Left, Direction::Release),
                MouseEvent::new(3.0, 4.0, Button::Middle, Direction::Release),
            ]
        );
        assert!(t.buttons().is_empty());
    }

    #[test]
    fn unchanged_mask_emits_one_motion() {
        let mut t = MouseTranslator::new();
        t.translate(0.0, 0.0, ButtonMask::RIGHT);
        let events = t.translate(5.0, 6.0, ButtonMask::RIGHT);
        assert_eq!(events, vec![MouseEvent::moved(5.0, 6.0)]);
    }

    #[test]
    fn wheel_transitions_follow_buttons() {
        let mut t = MouseTranslator::new();
        let events = t.translate(0.0, 0.0, ButtonMask::all());
        let order: Vec<Button> = events.iter().map(|e| e.button).collect();
        assert_eq!(
            order,
            vec![Button::Left, Button::Middle, Button::Right, Button::WheelUp, Button::WheelDown]
        );
    }

    #[test]
    fn untracked_bits_are_ignored() {
        let mut t = MouseTranslator::new();
        let events = t.translate(0.0, 0.0, ButtonMask::from_bits_truncate(1 << 7));
        assert_eq!(events, vec![MouseEvent::moved(0.0, 0.0)]);
    }
}
