//! Draw device command set.
//!
//! Every message on the data channel starts with a one-letter tag
//! followed by a fixed little-endian payload:
//!
//! | Tag | Command            | Payload                                              |
//! |-----|--------------------|------------------------------------------------------|
//! | `A` | alloc screen       | slot(4) + 9 zero bytes                               |
//! | `F` | free screen        | slot(4)                                              |
//! | `b` | alloc image        | id(4) screen(4) refresh(1) chan(4) repl(1) r(16) clip(16) color(4) |
//! | `f` | free image         | id(4)                                                |
//! | `O` | compositing op     | op(1)                                                |
//! | `d` | composite          | dst(4) src(4) mask(4) r(16) sp(8) mp(8)              |
//! | `y` | load raw pixels    | id(4) r(16) + RGBA bytes                             |
//! | `Y` | load compressed    | id(4) r(16) + compressed bytes                       |
//! | `r` | read pixels        | id(4) r(16)                                          |
//! | `c` | reclip             | id(4) repl(1) r(16)                                  |
//! | `n` | attach host image  | id(4)=0 len(1) name                                  |
//! | `v` | flush              | (none)                                               |

use std::fmt;

use crate::geometry::{Color, Point, Rect};

/// Channel descriptor for `r8g8b8a8`, the byte order of [`crate::Buffer`]
/// pixels, so buffers upload without conversion.
pub const RGBA32: [u8; 4] = [8, 24, 40, 72];

/// Tag plus image id plus rectangle, the fixed prefix of `y`, `Y` and `r`.
pub const LOAD_HEADER_LEN: usize = 1 + 4 + 16;

// ── ImageId ──────────────────────────────────────────────────────

/// Handle of an image allocated on the draw device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u32);

impl ImageId {
    /// The host window image, attached with the `n` command.
    pub const HOST: ImageId = ImageId(0);
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Op ───────────────────────────────────────────────────────────

/// Porter-Duff compositing operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Op {
    /// Replace the destination (`S`, `SinD|SoutD`).
    Src,
    /// Source over destination (`SoverD`).
    #[default]
    Over,
}

impl Op {
    pub const fn wire_code(self) -> u8 {
        match self {
            Op::Src => 10,
            Op::Over => 11,
        }
    }
}

// ── DrawCommand ──────────────────────────────────────────────────

/// One message on the data channel.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand<'a> {
    AllocScreen {
        slot: u32,
    },
    FreeScreen {
        slot: u32,
    },
    AllocImage {
        id: ImageId,
        refresh: u8,
        repl: bool,
        bounds: Rect,
        clip: Rect,
        color: Color,
    },
    FreeImage {
        id: ImageId,
    },
    SetOp(Op),
    Composite {
        dst: ImageId,
        src: ImageId,
        mask: ImageId,
        rect: Rect,
        src_point: Point,
        mask_point: Point,
    },
    Load {
        dst: ImageId,
        rect: Rect,
        pixels: &'a [u8],
    },
    LoadCompressed {
        dst: ImageId,
        rect: Rect,
        data: &'a [u8],
    },
    Read {
        src: ImageId,
        rect: Rect,
    },
    Reclip {
        id: ImageId,
        repl: bool,
        rect: Rect,
    },
    AttachName {
        name: &'a [u8],
    },
    Flush,
}

impl DrawCommand<'_> {
    pub const fn tag(&self) -> u8 {
        match self {
            DrawCommand::AllocScreen { .. } => b'A',
            DrawCommand::FreeScreen { .. } => b'F',
            DrawCommand::AllocImage { .. } => b'b',
            DrawCommand::FreeImage { .. } => b'f',
            DrawCommand::SetOp(_) => b'O',
            DrawCommand::Composite { .. } => b'd',
            DrawCommand::Load { .. } => b'y',
            DrawCommand::LoadCompressed { .. } => b'Y',
            DrawCommand::Read { .. } => b'r',
            DrawCommand::Reclip { .. } => b'c',
            DrawCommand::AttachName { .. } => b'n',
            DrawCommand::Flush => b'v',
        }
    }

    /// Size of the encoded message, tag included.
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            DrawCommand::AllocScreen { .. } => 13,
            DrawCommand::FreeScreen { .. } | DrawCommand::FreeImage { .. } => 4,
            DrawCommand::AllocImage { .. } => 50,
            DrawCommand::SetOp(_) => 1,
            DrawCommand::Composite { .. } => 44,
            DrawCommand::Load { pixels, .. } => 20 + pixels.len(),
            DrawCommand::LoadCompressed { data, .. } => 20 + data.len(),
            DrawCommand::Read { .. } => 20,
            DrawCommand::Reclip { .. } => 21,
            DrawCommand::AttachName { name } => 5 + name.len(),
            DrawCommand::Flush => 0,
        }
    }
}
