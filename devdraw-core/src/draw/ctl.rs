//! Control string and transfer-unit discovery.
//!
//! Opening the connection source yields twelve 11-character fields,
//! each followed by a space:
//!
//! ```text
//! conn  image  chan  reserved  display(x0 y0 x1 y1)  clip(x0 y0 x1 y1)
//! ```

use std::io::Read;

use crate::error::DrawError;
use crate::geometry::Rect;

/// Bytes read from the control source in one go.
const CTL_READ_LEN: usize = 256;
/// Shortest acceptable control string (12 fields of 12 bytes, the
/// final space optional).
const CTL_MIN_LEN: usize = 143;
const CTL_LEN: usize = 144;
const CTL_FIELDS: usize = 12;

// ── ControlMessage ───────────────────────────────────────────────

/// Parsed control string of a draw connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlMessage {
    /// Connection index, used to name the data channel.
    pub index: i32,
    /// Image id of the display.
    pub display_image: i32,
    /// Channel format of the display, e.g. `x8r8g8b8`.
    pub channel_format: String,
    /// Undocumented fourth field, kept verbatim.
    pub reserved: String,
    pub display: Rect,
    pub clip: Rect,
}

impl ControlMessage {
    pub fn parse(text: &str) -> Result<Self, DrawError> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() != CTL_FIELDS {
            return Err(DrawError::Protocol(format!(
                "control string has {} fields, expected {CTL_FIELDS}: {text:?}",
                fields.len()
            )));
        }

        let int = |i: usize| -> Result<i32, DrawError> {
            fields[i].parse::<i32>().map_err(|e| {
                DrawError::Protocol(format!("control field {i} ({:?}): {e}", fields[i]))
            })
        };

        let msg = Self {
            index: int(0)?,
            display_image: int(1)?,
            channel_format: fields[2].to_string(),
            reserved: fields[3].to_string(),
            display: Rect::new(int(4)?, int(5)?, int(6)?, int(7)?),
            clip: Rect::new(int(8)?, int(9)?, int(10)?, int(11)?),
        };

        if msg.index < 1 {
            return Err(DrawError::Protocol(format!(
                "connection index must be positive, got {}",
                msg.index
            )));
        }
        Ok(msg)
    }
}

/// Read the raw control string with a single read.
pub fn read_control_string(src: &mut impl Read) -> Result<String, DrawError> {
    let mut buf = [0u8; CTL_READ_LEN];
    let n = src.read(&mut buf)?;
    if n < CTL_MIN_LEN {
        return Err(DrawError::Protocol(format!(
            "control string too short: {n} bytes"
        )));
    }
    Ok(String::from_utf8_lossy(&buf[..n.min(CTL_LEN)]).into_owned())
}

/// Find the transfer unit of `path` in an open-file table.
///
/// The first line holds the working directory; every other line
/// describes one descriptor, with the transfer unit in the 8th field
/// and the file name in the 10th.
pub fn parse_iounit(table: &str, path: &str) -> Option<usize> {
    table.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() >= 10 && fields[9] == path {
            fields[7].parse().ok().filter(|&n: &usize| n > 0)
        } else {
            None
        }
    })
}

// ── Tests ────────────────────────────────────────────────────────
