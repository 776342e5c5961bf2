//! # devdraw-core
//!
//! Driver for the `/dev/draw` compositor: windows, textures and
//! buffers on top of the draw device's tagged binary command set.
//!
//! This crate contains:
//! - **Protocol**: `DrawCommand`, `DrawCodec` and `DrawClient`, which
//!   owns the data channel, image id allocation and transfer-unit
//!   chunking
//! - **Compression**: the device's back-reference pixel codec
//! - **Input**: mouse and keyboard record translation into
//!   press/release events
//! - **Screen**: `Screen`, `Window`, `Texture` and `Buffer`, with the
//!   `ScreenPhase` lifecycle
//! - **Blit**: affine compositing with a translation fast path and a
//!   read-back, resample and re-upload general path
//! - **Driver**: `run`, the reader threads and the dispatch loop
//! - **Error**: `DrawError`, a typed `thiserror`-based error

pub mod blit;
pub mod codec;
pub mod command;
pub mod compress;
pub mod config;
pub mod draw;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod input;
pub mod screen;
pub mod state;

/// Bytes per pixel in every buffer and transfer (`r8g8b8a8`).
pub const BYTES_PER_PIXEL: usize = 4;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use blit::{Drawer, affine_transform};
pub use codec::{DrawCodec, KeyboardDecoder, MouseDecoder};
pub use command::{DrawCommand, ImageId, Op};
pub use config::DevicePaths;
pub use draw::{ControlMessage, DrawClient};
pub use driver::run;
pub use error::DrawError;
pub use geometry::{Affine, Color, Point, Rect};
pub use input::{Button, Direction, Event, HostWindow, KeyEvent, MouseEvent};
pub use screen::{Buffer, Screen, Texture, Uploader, Window};
pub use state::ScreenPhase;
