//! Affine compositing onto windows.
//!
//! The draw device only composites axis-aligned rectangles. A pure
//! translation maps onto one composite of the source texture. Anything
//! else takes the general path: read the source pixels back, resample
//! them on the CPU, upload the result as a transient image and
//! composite that.

use tracing::debug;

use crate::command::Op;
use crate::error::DrawError;
use crate::geometry::{Affine, Color, Point, Rect};
use crate::screen::upload::TransientImage;
use crate::screen::{Buffer, Texture, Window};

/// Map the corners of `r` through `m`, truncating toward zero, and
/// return their bounding box.
pub fn affine_transform(m: &Affine, r: Rect) -> Rect {
    let corners = [
        r.min,
        Point::new(r.max.x, r.min.y),
        Point::new(r.min.x, r.max.y),
        r.max,
    ]
    .map(|p| m.map_point(p));

    let mut out = Rect {
        min: corners[0],
        max: corners[0],
    };
    for p in &corners[1..] {
        out.min.x = out.min.x.min(p.x);
        out.min.y = out.min.y.min(p.y);
        out.max.x = out.max.x.max(p.x);
        out.max.y = out.max.y.max(p.y);
    }
    out
}

/// Integer offset of a translation-only matrix.
fn translation_of(m: &Affine) -> Point {
    Point::new(m.0[2] as i32, m.0[5] as i32)
}

/// Resample `src`, whose pixel `(0, 0)` sits at `sr.min`, into a buffer
/// covering `dr` using nearest-neighbour sampling under `m`.
///
/// Each destination pixel centre is mapped back through the inverse
/// matrix. A singular matrix yields a transparent buffer.
pub fn resample(m: &Affine, src: &Buffer, sr: Rect, dr: Rect, op: Op) -> Buffer {
    let mut out = Buffer::new(dr.size());
    let Some(inv) = m.invert() else {
        return out;
    };
    for_each_source(&inv, sr, dr, |dp, sp| {
        out.blend(dp, src.pixel(sp - sr.min), op);
    });
    out
}

/// Opaque wherever the inverse-mapped pixel centre of `dr` falls in `sr`.
pub fn coverage_mask(m: &Affine, sr: Rect, dr: Rect) -> Buffer {
    let mut out = Buffer::new(dr.size());
    if let Some(inv) = m.invert() {
        for_each_source(&inv, sr, dr, |dp, _| {
            out.set_pixel(dp, Color::BLACK.to_bytes());
        });
    }
    out
}

/// Call `f(dst, src)` for every pixel of `dr` whose centre maps into
/// `sr`. `dst` is relative to `dr.min`, `src` is in source coordinates.
fn for_each_source(inv: &Affine, sr: Rect, dr: Rect, mut f: impl FnMut(Point, Point)) {
    for y in dr.min.y..dr.max.y {
        for x in dr.min.x..dr.max.x {
            let (sx, sy) = inv.map(x as f64 + 0.5, y as f64 + 0.5);
            let sp = Point::new(sx.floor() as i32, sy.floor() as i32);
            if sr.contains(sp) {
                f(Point::new(x - dr.min.x, y - dr.min.y), sp);
            }
        }
    }
}

// ── Drawer ───────────────────────────────────────────────────────

/// Transformed compositing of textures and colours.
pub trait Drawer {
    /// Composite `sr` of `src`, transformed by `src2dst`, with `op`.
    fn draw(&self, src2dst: Affine, src: &Texture, sr: Rect, op: Op) -> Result<(), DrawError>;

    /// Composite a solid colour covering `sr`, transformed by `src2dst`.
    fn draw_uniform(
        &self,
        src2dst: Affine,
        color: Color,
        sr: Rect,
        op: Op,
    ) -> Result<(), DrawError>;

    /// Draw `sr` of `src` with its top-left corner at `dp`.
    fn copy(&self, dp: Point, src: &Texture, sr: Rect, op: Op) -> Result<(), DrawError> {
        let t = dp - sr.min;
        self.draw(Affine::translation(t.x as f64, t.y as f64), src, sr, op)
    }

    /// Draw `sr` of `src` stretched to fill `dr`.
    fn scale(&self, dr: Rect, src: &Texture, sr: Rect, op: Op) -> Result<(), DrawError> {
        if sr.is_empty() || dr.is_empty() {
            return Ok(());
        }
        let kx = dr.dx() as f64 / sr.dx() as f64;
        let ky = dr.dy() as f64 / sr.dy() as f64;
        let m = Affine([
            kx,
            0.0,
            dr.min.x as f64 - kx * sr.min.x as f64,
            0.0,
            ky,
            dr.min.y as f64 - ky * sr.min.y as f64,
        ]);
        self.draw(m, src, sr, op)
    }
}

impl Drawer for Window {
    fn draw(&self, src2dst: Affine, src: &Texture, sr: Rect, op: Op) -> Result<(), DrawError> {
        let dst = self.image()?;
        let tex = src.image()?;
        let client = &self.shared().client;

        if src2dst.is_translation() {
            let dr = sr.translate(translation_of(&src2dst));
            return client.draw(dst, tex, tex, dr, sr.min, sr.min, op);
        }

        let dr = affine_transform(&src2dst, sr);
        if dr.is_empty() || sr.is_empty() {
            return Ok(());
        }
        let pixels = client.read_subimage(tex, sr)?;
        let source = Buffer::from_pixels(sr.size(), pixels)?;
        let resampled = resample(&src2dst, &source, sr, dr, op);
        debug!(?sr, ?dr, "general-path draw");

        let image = TransientImage::upload(self.shared(), Some(self.key()), &resampled)?;
        client.draw(dst, image.id(), image.id(), dr, Point::ZERO, Point::ZERO, op)
    }

    fn draw_uniform(
        &self,
        src2dst: Affine,
        color: Color,
        sr: Rect,
        op: Op,
    ) -> Result<(), DrawError> {
        let dst = self.image()?;
        let client = &self.shared().client;

        if src2dst.is_translation() {
            let dr = sr.translate(translation_of(&src2dst));
            let paint = TransientImage::solid(self.shared(), Some(self.key()), color)?;
            return client.draw(dst, paint.id(), paint.id(), dr, Point::ZERO, Point::ZERO, op);
        }

        let dr = affine_transform(&src2dst, sr);
        if dr.is_empty() || sr.is_empty() {
            return Ok(());
        }
        let paint = TransientImage::solid(self.shared(), Some(self.key()), color)?;
        let mask = TransientImage::upload(
            self.shared(),
            Some(self.key()),
            &coverage_mask(&src2dst, sr, dr),
        )?;
        client.draw(dst, paint.id(), mask.id(), dr, Point::ZERO, Point::ZERO, op)
    }
}

// ── Tests ────────────────────────────────────────────────────────
