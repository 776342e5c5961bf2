//! Domain-specific error types for the draw device driver.
//!
//! All fallible operations return `Result<T, DrawError>`.
//! Malformed device records are reported as errors and skipped by the
//! reader loops; a broken data channel is reported and never retried.

use std::io;

use thiserror::Error;

/// The canonical error type for the driver.
#[derive(Debug, Error)]
pub enum DrawError {
    // ── Session setup ────────────────────────────────────────────
    /// The control string, the data channel, or the transfer unit
    /// could not be obtained or understood.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Every screen slot (0..=254) was rejected by the device.
    #[error("could not allocate screen: all slots rejected")]
    NoScreenAvailable,

    // ── Channel errors ───────────────────────────────────────────
    /// The device returned fewer pixel bytes than the read request
    /// guarantees. The channel is considered broken.
    #[error("short read on data channel: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// The device or the OS reported an I/O failure.
    #[error("device I/O error: {0}")]
    Io(#[from] io::Error),

    /// An internal event queue was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    // ── Input records ────────────────────────────────────────────
    /// A mouse, keyboard, or frame-geometry record could not be parsed.
    #[error("invalid device record: {0}")]
    InvalidRecord(String),

    // ── Lifecycle ────────────────────────────────────────────────
    /// A screen state transition was requested from the wrong state.
    #[error("invalid screen transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    /// The window or screen has already been released.
    #[error("resource already released")]
    Released,
}

impl DrawError {
    /// Returns `true` when the error means the data channel can no
    /// longer be trusted.
    pub fn is_fatal(&self) -> bool {
        match self {
            DrawError::ShortRead { .. } => true,
            DrawError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

impl From<std::string::FromUtf8Error> for DrawError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        DrawError::InvalidRecord(format!("invalid utf-8: {e}"))
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for DrawError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        DrawError::ChannelClosed
    }
}
