//! Events delivered to a window's inbound queue.

use crate::geometry::Point;

/// Mouse button or scroll direction a [`MouseEvent`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Pointer motion with no button change.
    None,
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

/// Whether a button or key went down, came up, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    None,
    Press,
    Release,
}

// ── Mouse ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    pub x: f32,
    pub y: f32,
    pub button: Button,
    pub direction: Direction,
}

impl MouseEvent {
    pub fn new(x: f32, y: f32, button: Button, direction: Direction) -> Self {
        Self {
            x,
            y,
            button,
            direction,
        }
    }

    /// Pointer motion without a button transition.
    pub fn moved(x: f32, y: f32) -> Self {
        Self::new(x, y, Button::None, Direction::None)
    }

    /// The same event relative to `origin`.
    pub fn relative_to(self, origin: Point) -> Self {
        Self {
            x: self.x - origin.x as f32,
            y: self.y - origin.y as f32,
            ..self
        }
    }
}

// ── Keyboard ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub rune: char,
    /// `None` for a typed character, `Press`/`Release` for raw key state.
    pub direction: Direction,
}

impl KeyEvent {
    pub fn typed(rune: char) -> Self {
        Self {
            rune,
            direction: Direction::None,
        }
    }

    pub fn press(rune: char) -> Self {
        Self {
            rune,
            direction: Direction::Press,
        }
    }

    pub fn release(rune: char) -> Self {
        Self {
            rune,
            direction: Direction::Release,
        }
    }
}

// ── Event ────────────────────────────────────────────────────────

/// Anything a window can receive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Mouse(MouseEvent),
    Key(KeyEvent),
    /// The window now has this size in pixels.
    Size(Point),
    /// The window's contents should be drawn and published.
    Paint,
}
