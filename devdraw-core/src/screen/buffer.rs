//! In-memory RGBA pixel buffers.
//!
//! A buffer never touches the device; its pixels reach a window or a
//! texture through [`crate::Uploader::upload`].

use crate::command::Op;
use crate::error::DrawError;
use crate::geometry::{Color, Point, Rect};
use crate::BYTES_PER_PIXEL;

/// Premultiplied RGBA pixels, row-major, origin at `(0, 0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    size: Point,
    pix: Vec<u8>,
}

impl Buffer {
    /// A fully transparent buffer. Negative sizes yield an empty buffer.
    pub fn new(size: Point) -> Self {
        let size = Point::new(size.x.max(0), size.y.max(0));
        Self {
            size,
            pix: vec![0; Rect::from_size(size).byte_len()],
        }
    }

    /// Wrap existing pixels; `pix` must hold exactly `size` pixels.
    pub fn from_pixels(size: Point, pix: Vec<u8>) -> Result<Self, DrawError> {
        let expected = Rect::from_size(size).byte_len();
        if size.x < 0 || size.y < 0 || pix.len() != expected {
            return Err(DrawError::Protocol(format!(
                "{} pixel bytes do not fill a {}x{} buffer",
                pix.len(),
                size.x,
                size.y
            )));
        }
        Ok(Self { size, pix })
    }

    pub fn size(&self) -> Point {
        self.size
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pix
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pix
    }

    fn offset(&self, p: Point) -> Option<usize> {
        self.bounds()
            .contains(p)
            .then(|| (p.y as usize * self.size.x as usize + p.x as usize) * BYTES_PER_PIXEL)
    }

    /// The pixel at `p`, or transparent outside the buffer.
    pub fn pixel(&self, p: Point) -> [u8; 4] {
        match self.offset(p) {
            Some(i) => [self.pix[i], self.pix[i + 1], self.pix[i + 2], self.pix[i + 3]],
            None => [0; 4],
        }
    }

    pub fn set_pixel(&mut self, p: Point, px: [u8; 4]) {
        if let Some(i) = self.offset(p) {
            self.pix[i..i + BYTES_PER_PIXEL].copy_from_slice(&px);
        }
    }

    /// Combine `px` into the pixel at `p` with `op`.
    pub fn blend(&mut self, p: Point, px: [u8; 4], op: Op) {
        let Some(i) = self.offset(p) else {
            return;
        };
        let dst = &mut self.pix[i..i + BYTES_PER_PIXEL];
        match op {
            Op::Src => dst.copy_from_slice(&px),
            Op::Over => {
                let keep = 255 - px[3] as u32;
                for (d, s) in dst.iter_mut().zip(px) {
                    *d = (s as u32 + (*d as u32 * keep + 127) / 255).min(255) as u8;
                }
            }
        }
    }

    /// Set every pixel of `r` to `color`.
    pub fn fill(&mut self, r: Rect, color: Color) {
        let r = r.intersect(&self.bounds());
        for y in r.min.y..r.max.y {
            for x in r.min.x..r.max.x {
                self.set_pixel(Point::new(x, y), color.to_bytes());
            }
        }
    }

    /// Copy out the pixels of `r`, row by row, clipped to the buffer.
    pub fn sub_pixels(&self, r: Rect) -> Vec<u8> {
        let r = r.intersect(&self.bounds());
        let mut out = Vec::with_capacity(r.byte_len());
        let row = r.dx() as usize * BYTES_PER_PIXEL;
        for y in r.min.y..r.max.y {
            if let Some(start) = self.offset(Point::new(r.min.x, y)) {
                out.extend_from_slice(&self.pix[start..start + row]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_transparent() {
        let b = Buffer::new(Point::new(3, 2));
        assert_eq!(b.pixels().len(), 24);
        assert!(b.pixels().iter().all(|&v| v == 0));
        assert_eq!(Buffer::new(Point::new(-1, 5)).pixels().len(), 0);
    }

    #[test]
    fn from_pixels_checks_length() {
        assert!(Buffer::from_pixels(Point::new(2, 2), vec![0; 16]).is_ok());
        assert!(Buffer::from_pixels(Point::new(2, 2), vec![0; 15]).is_err());
    }

    #[test]
    fn sub_pixels_copies_rows() {
        let mut b = Buffer::new(Point::new(4, 4));
        b.set_pixel(Point::new(1, 1), [1, 2, 3, 4]);
        b.set_pixel(Point::new(2, 2), [5, 6, 7, 8]);
        let sub = b.sub_pixels(Rect::new(1, 1, 3, 3));
        assert_eq!(sub.len(), 16);
        assert_eq!(&sub[0..4], &[1, 2, 3, 4]);
        assert_eq!(&sub[12..16], &[5, 6, 7, 8]);
        assert_eq!(b.sub_pixels(Rect::new(3, 3, 9, 9)).len(), 4);
    }

    #[test]
    fn out_of_bounds_access_is_ignored() {
        let mut b = Buffer::new(Point::new(1, 1));
        b.set_pixel(Point::new(5, 5), [9; 4]);
        assert_eq!(b.pixel(Point::new(5, 5)), [0; 4]);
        assert_eq!(b.pixel(Point::new(-1, 0)), [0; 4]);
    }

    #[test]
    fn over_blends_premultiplied() {
        let mut b = Buffer::new(Point::new(1, 1));
        b.fill(b.bounds(), Color::WHITE);
        b.blend(Point::ZERO, [0, 0, 0x80, 0x80], Op::Over);
        assert_eq!(b.pixel(Point::ZERO), [127, 127, 255, 255]);

        b.blend(Point::ZERO, [0, 0, 0, 0], Op::Src);
        assert_eq!(b.pixel(Point::ZERO), [0; 4]);
    }
}
