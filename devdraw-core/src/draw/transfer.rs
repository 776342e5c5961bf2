//! Splitting pixel transfers into messages that fit the transfer unit.
//!
//! Every split happens on a whole-row boundary, so each message's
//! rectangle describes exactly the bytes it carries.

use crate::command::LOAD_HEADER_LEN;
use crate::compress::compress;
use crate::geometry::Rect;

/// A transfer unit at least this large means an in-memory device.
pub const NATIVE_IOUNIT: usize = 65535;

/// Payloads up to this size are never compressed.
pub const COMPRESS_THRESHOLD: usize = 256;

// ── LoadPath ─────────────────────────────────────────────────────

/// How an upload reaches the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPath {
    /// One `y` message.
    Direct,
    /// Several `y` messages, each a band of whole rows.
    Split,
    /// Row-compressed `Y` messages packed up to the transfer unit.
    Compressed,
}

/// Choose the upload path for `payload` bytes on a channel with the
/// given transfer unit.
///
/// Small transfer units indicate a remote device where the link, not
/// the CPU, is the bottleneck.
pub fn load_path(iounit: usize, payload: usize) -> LoadPath {
    if iounit < NATIVE_IOUNIT && payload > COMPRESS_THRESHOLD {
        LoadPath::Compressed
    } else if payload + LOAD_HEADER_LEN <= iounit {
        LoadPath::Direct
    } else {
        LoadPath::Split
    }
}

// ── Row bands ────────────────────────────────────────────────────

/// Cut `rect` into consecutive bands of at most `budget` bytes each.
///
/// A band always holds at least one row, even if that row alone
/// exceeds the budget.
pub fn row_bands(rect: Rect, budget: usize) -> Vec<Rect> {
    if rect.is_empty() {
        return Vec::new();
    }
    let row_len = rect.dx() as usize * crate::BYTES_PER_PIXEL;
    let rows = (budget / row_len).max(1) as i32;

    let mut bands = Vec::with_capacity((rect.dy() / rows + 1) as usize);
    let mut y = rect.min.y;
    while y < rect.max.y {
        let end = (y + rows).min(rect.max.y);
        bands.push(Rect::new(rect.min.x, y, rect.max.x, end));
        y = end;
    }
    bands
}

/// Row bands for `y` messages: the budget leaves room for the header.
pub fn load_bands(rect: Rect, iounit: usize) -> Vec<Rect> {
    row_bands(rect, iounit.saturating_sub(LOAD_HEADER_LEN))
}

/// Row bands for `r` replies, which carry pixels only.
pub fn read_bands(rect: Rect, iounit: usize) -> Vec<Rect> {
    row_bands(rect, iounit)
}

// ── Compressed blocks ────────────────────────────────────────────

/// One `Y` message: the rows it covers and their compressed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlock {
    pub rect: Rect,
    pub data: Vec<u8>,
}

/// Compress `pixels` row by row and pack the rows into as few blocks
/// as fit the transfer unit.
///
/// A pending block is flushed before the row that would overflow it;
/// the final block always ends with the last row.
pub fn compressed_blocks(rect: Rect, pixels: &[u8], iounit: usize) -> Vec<CompressedBlock> {
    if rect.is_empty() {
        return Vec::new();
    }
    let row_len = rect.dx() as usize * crate::BYTES_PER_PIXEL;
    let budget = iounit.saturating_sub(LOAD_HEADER_LEN);

    let mut blocks = Vec::new();
    let mut pending = Vec::new();
    let mut start = rect.min.y;

    for (i, row) in pixels.chunks_exact(row_len).take(rect.dy() as usize).enumerate() {
        let y = rect.min.y + i as i32;
        let line = compress(row);
        if !pending.is_empty() && pending.len() + line.len() > budget {
            blocks.push(CompressedBlock {
                rect: Rect::new(rect.min.x, start, rect.max.x, y),
                data: std::mem::take(&mut pending),
            });
            start = y;
        }
        pending.extend_from_slice(&line);
    }

    blocks.push(CompressedBlock {
        rect: Rect::new(rect.min.x, start, rect.max.x, rect.max.y),
        data: pending,
    });
    blocks
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::decompress;

    /// Bands must tile `rect` top to bottom without gaps or overlap.
    fn assert_partition(rect: Rect, bands: &[Rect]) {
        let mut y = rect.min.y;
        for band in bands {
            assert_eq!(band.min.x, rect.min.x);
            assert_eq!(band.max.x, rect.max.x);
            assert_eq!(band.min.y, y, "gap or overlap at row {y}");
            assert!(band.max.y > band.min.y);
            y = band.max.y;
        }
        assert_eq!(y, rect.max.y);
    }

    fn noisy_pixels(rect: Rect) -> Vec<u8> {
        let mut state = 0x1234_5678u32;
        (0..rect.byte_len())
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn path_selection() {
        assert_eq!(load_path(65535, 100), LoadPath::Direct);
        assert_eq!(load_path(65535, 65535 - LOAD_HEADER_LEN), LoadPath::Direct);
        assert_eq!(load_path(65535, 65535), LoadPath::Split);
        assert_eq!(load_path(8192, 256), LoadPath::Direct);
        assert_eq!(load_path(8192, 257), LoadPath::Compressed);
        assert_eq!(load_path(100, 200), LoadPath::Split);
    }

    #[test]
    fn bands_partition_rectangle() {
        let rect = Rect::new(10, 5, 60, 55);
        let bands = load_bands(rect, 1000);
        // 200-byte rows, 979 usable bytes per message.
        assert_eq!(bands.len(), 13);
        assert!(bands.iter().all(|b| b.dy() <= 4));
        assert_partition(rect, &bands);
    }

    #[test]
    fn oversized_row_still_gets_a_band() {
        let rect = Rect::new(0, 0, 1000, 3);
        let bands = read_bands(rect, 1000);
        assert_eq!(bands.len(), 3);
        assert_partition(rect, &bands);
    }

    #[test]
    fn empty_rect_has_no_bands() {
        assert!(row_bands(Rect::new(0, 0, 0, 10), 100).is_empty());
        assert!(compressed_blocks(Rect::ZERO, &[], 1000).is_empty());
    }

    #[test]
    fn compressed_blocks_partition_and_decode() {
        let rect = Rect::new(0, 0, 50, 50);
        let pixels = noisy_pixels(rect);
        let blocks = compressed_blocks(rect, &pixels, 1000);

        assert!(blocks.len() > 1);
        let rects: Vec<Rect> = blocks.iter().map(|b| b.rect).collect();
        assert_partition(rect, &rects);

        let mut decoded = Vec::new();
        for block in &blocks {
            assert!(block.data.len() + LOAD_HEADER_LEN <= 1000 || block.rect.dy() == 1);
            let bytes = decompress(&block.data).unwrap();
            assert_eq!(bytes.len(), block.rect.byte_len());
            decoded.extend(bytes);
        }
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn uniform_image_fits_one_block() {
        let rect = Rect::new(0, 0, 50, 50);
        let pixels = vec![0x7F; rect.byte_len()];
        let blocks = compressed_blocks(rect, &pixels, 1000);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].rect, rect);
        assert_eq!(decompress(&blocks[0].data).unwrap(), pixels);
    }
}
