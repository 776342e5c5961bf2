//! Screen lifecycle state machine.
//!
//! Models the lifetime of a driver session with validated transitions
//! that return `Result` instead of panicking.

use crate::error::DrawError;

// ── ScreenPhase ──────────────────────────────────────────────────

/// The current phase of a screen.
///
/// ```text
///  Uninitialized ──► Connected ──► WindowActive ◄──► Resizing
///                        │              │
///                        ▼              ▼
///                        └────────► Released
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenPhase {
    /// No device connection yet.
    #[default]
    Uninitialized,

    /// Connection open, host window attached, screen slot allocated.
    Connected,

    /// At least one window image exists.
    WindowActive,

    /// Window images are being recreated for a new host frame.
    Resizing,

    /// All device resources freed. Terminal.
    Released,
}

impl ScreenPhase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Connected => "Connected",
            Self::WindowActive => "WindowActive",
            Self::Resizing => "Resizing",
            Self::Released => "Released",
        }
    }

    pub fn is_released(self) -> bool {
        matches!(self, Self::Released)
    }

    /// Whether drawing and window creation are allowed.
    pub fn is_usable(self) -> bool {
        matches!(self, Self::Connected | Self::WindowActive | Self::Resizing)
    }

    fn invalid(self, to: Self) -> DrawError {
        DrawError::InvalidTransition {
            from: self.name(),
            to: to.name(),
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connected`.
    ///
    /// Valid from: `Uninitialized`.
    pub fn connect(&mut self) -> Result<(), DrawError> {
        match self {
            Self::Uninitialized => {
                *self = Self::Connected;
                Ok(())
            }
            other => Err(other.invalid(Self::Connected)),
        }
    }

    /// Transition to `WindowActive` when a window is created.
    ///
    /// Valid from: `Connected`, `WindowActive`.
    pub fn open_window(&mut self) -> Result<(), DrawError> {
        match self {
            Self::Connected | Self::WindowActive => {
                *self = Self::WindowActive;
                Ok(())
            }
            other => Err(other.invalid(Self::WindowActive)),
        }
    }

    /// Transition to `Resizing`.
    ///
    /// Valid from: `WindowActive`.
    pub fn begin_resize(&mut self) -> Result<(), DrawError> {
        match self {
            Self::WindowActive => {
                *self = Self::Resizing;
                Ok(())
            }
            other => Err(other.invalid(Self::Resizing)),
        }
    }

    /// Transition back to `WindowActive` once every window is recreated.
    ///
    /// Valid from: `Resizing`.
    pub fn finish_resize(&mut self) -> Result<(), DrawError> {
        match self {
            Self::Resizing => {
                *self = Self::WindowActive;
                Ok(())
            }
            other => Err(other.invalid(Self::WindowActive)),
        }
    }

    /// Transition to `Released`.
    ///
    /// Valid from: `Connected`, `WindowActive`, `Resizing` (a resize
    /// that failed part way).
    pub fn release(&mut self) -> Result<(), DrawError> {
        match self {
            Self::Connected | Self::WindowActive | Self::Resizing => {
                *self = Self::Released;
                Ok(())
            }
            other => Err(other.invalid(Self::Released)),
        }
    }
}

impl std::fmt::Display for ScreenPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Tests ────────────────────────────────────────────────────────
