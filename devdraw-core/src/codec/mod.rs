//! Framing for the data channel and the input devices.
//!
//! - [`DrawCodec`] encodes [`DrawCommand`]s into single data-channel
//!   messages.
//! - [`MouseDecoder`] splits the mouse device stream into fixed-size
//!   records.
//! - [`KeyboardDecoder`] splits the keyboard device stream into
//!   NUL-terminated records.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::command::{DrawCommand, RGBA32};
use crate::error::DrawError;
use crate::geometry::{Point, Rect};

/// Size of one mouse record: a tag and four 12-byte fields.
pub const MOUSE_RECORD_LEN: usize = 1 + 4 * 12;

/// Longest keyboard record accepted before the stream is declared corrupt.
pub const MAX_KEYBOARD_RECORD: usize = 256;

// ── DrawCodec ────────────────────────────────────────────────────

/// Encoder for data-channel messages. Each encoded command is one
/// message and must reach the device in a single write.
#[derive(Debug, Default, Clone, Copy)]
pub struct DrawCodec;

impl<'a> Encoder<DrawCommand<'a>> for DrawCodec {
    type Error = DrawError;

    fn encode(&mut self, item: DrawCommand<'a>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.encoded_len());
        put_command(&item, dst);
        Ok(())
    }
}

fn put_command(cmd: &DrawCommand<'_>, dst: &mut BytesMut) {
    dst.put_u8(cmd.tag());
    match *cmd {
        DrawCommand::AllocScreen { slot } => {
            dst.put_u32_le(slot);
            dst.put_bytes(0, 9);
        }
        DrawCommand::FreeScreen { slot } => dst.put_u32_le(slot),
        DrawCommand::AllocImage {
            id,
            refresh,
            repl,
            bounds,
            clip,
            color,
        } => {
            dst.put_u32_le(id.0);
            // Screen id; images are never allocated on a public screen.
            dst.put_u32_le(0);
            dst.put_u8(refresh);
            dst.put_slice(&RGBA32);
            dst.put_u8(repl as u8);
            put_rect(dst, bounds);
            put_rect(dst, clip);
            dst.put_u32_le(color.to_rgba32());
        }
        DrawCommand::FreeImage { id } => dst.put_u32_le(id.0),
        DrawCommand::SetOp(op) => dst.put_u8(op.wire_code()),
        DrawCommand::Composite {
            dst: target,
            src,
            mask,
            rect,
            src_point,
            mask_point,
        } => {
            dst.put_u32_le(target.0);
            dst.put_u32_le(src.0);
            dst.put_u32_le(mask.0);
            put_rect(dst, rect);
            put_point(dst, src_point);
            put_point(dst, mask_point);
        }
        DrawCommand::Load {
            dst: target,
            rect,
            pixels,
        } => {
            dst.put_u32_le(target.0);
            put_rect(dst, rect);
            dst.put_slice(pixels);
        }
        DrawCommand::LoadCompressed {
            dst: target,
            rect,
            data,
        } => {
            dst.put_u32_le(target.0);
            put_rect(dst, rect);
            dst.put_slice(data);
        }
        DrawCommand::Read { src, rect } => {
            dst.put_u32_le(src.0);
            put_rect(dst, rect);
        }
        DrawCommand::Reclip { id, repl, rect } => {
            dst.put_u32_le(id.0);
            dst.put_u8(repl as u8);
            put_rect(dst, rect);
        }
        DrawCommand::AttachName { name } => {
            dst.put_u32_le(0);
            dst.put_u8(name.len() as u8);
            dst.put_slice(name);
        }
        DrawCommand::Flush => {}
    }
}

fn put_rect(dst: &mut BytesMut, r: Rect) {
    put_point(dst, r.min);
    put_point(dst, r.max);
}

fn put_point(dst: &mut BytesMut, p: Point) {
    dst.put_i32_le(p.x);
    dst.put_i32_le(p.y);
}

// ── MouseDecoder ─────────────────────────────────────────────────

/// Splits the mouse stream into [`MOUSE_RECORD_LEN`]-byte records.
#[derive(Debug, Default, Clone, Copy)]
pub struct MouseDecoder;

impl Decoder for MouseDecoder {
    type Item = Bytes;
    type Error = DrawError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MOUSE_RECORD_LEN {
            return Ok(None);
        }
        Ok(Some(src.split_to(MOUSE_RECORD_LEN).freeze()))
    }
}

// ── KeyboardDecoder ──────────────────────────────────────────────

/// Splits the keyboard stream at NUL terminators.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyboardDecoder;

impl Decoder for KeyboardDecoder {
    type Item = Bytes;
    type Error = DrawError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.iter().position(|&b| b == 0) {
            Some(end) => {
                let record = src.split_to(end + 1);
                Ok(Some(record.freeze().slice(..end)))
            }
            None if src.len() > MAX_KEYBOARD_RECORD => {
                let len = src.len();
                src.clear();
                Err(DrawError::InvalidRecord(format!(
                    "keyboard record exceeds {MAX_KEYBOARD_RECORD} bytes ({len} buffered)"
                )))
            }
            None => Ok(None),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
