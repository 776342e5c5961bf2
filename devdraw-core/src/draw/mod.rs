//! The draw device connection: control string, transfer sizing and
//! the command client.

pub mod client;
pub mod ctl;
pub mod transfer;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{DrawBatch, DrawChannel, DrawClient, MAX_SCREEN_SLOT};
pub use ctl::{ControlMessage, parse_iounit, read_control_string};
pub use transfer::{CompressedBlock, LoadPath};
