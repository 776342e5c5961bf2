//! Integer geometry, affine matrices and colours shared by every layer.
//!
//! All geometry on the wire is integral; floating point only appears in
//! [`Affine`] matrices and in translated mouse coordinates.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

// ── Point ────────────────────────────────────────────────────────

/// An integer X/Y pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

// ── Rect ─────────────────────────────────────────────────────────

/// A half-open rectangle `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        min: Point::ZERO,
        max: Point::ZERO,
    };

    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            min: Point::new(x0, y0),
            max: Point::new(x1, y1),
        }
    }

    /// A rectangle anchored at the origin with the given size.
    pub const fn from_size(size: Point) -> Self {
        Self {
            min: Point::ZERO,
            max: size,
        }
    }

    pub const fn dx(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub const fn dy(&self) -> i32 {
        self.max.y - self.min.y
    }

    pub const fn size(&self) -> Point {
        Point::new(self.dx(), self.dy())
    }

    pub const fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    /// Number of pixels covered, zero for empty rectangles.
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.dx() as usize * self.dy() as usize
        }
    }

    /// Byte length of the rectangle's pixels at 4 bytes per pixel.
    pub fn byte_len(&self) -> usize {
        self.area() * crate::BYTES_PER_PIXEL
    }

    pub fn translate(&self, p: Point) -> Rect {
        Rect {
            min: self.min + p,
            max: self.max + p,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    /// Shrink every side by `n` pixels.
    pub fn inset(&self, n: i32) -> Rect {
        Rect::new(self.min.x + n, self.min.y + n, self.max.x - n, self.max.y - n)
    }

    /// The largest rectangle inside both, or [`Rect::ZERO`] if they do
    /// not overlap.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let r = Rect::new(
            self.min.x.max(other.min.x),
            self.min.y.max(other.min.y),
            self.max.x.min(other.max.x),
            self.max.y.min(other.max.y),
        );
        if r.is_empty() { Rect::ZERO } else { r }
    }
}

// ── Affine ───────────────────────────────────────────────────────

/// A 2D affine matrix stored as two rows of three coefficients:
///
/// ```text
/// x' = m[0]*x + m[1]*y + m[2]
/// y' = m[3]*x + m[4]*y + m[5]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine(pub [f64; 6]);

impl Affine {
    pub const IDENTITY: Affine = Affine([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

    pub const fn translation(tx: f64, ty: f64) -> Self {
        Affine([1.0, 0.0, tx, 0.0, 1.0, ty])
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Affine([sx, 0.0, 0.0, 0.0, sy, 0.0])
    }

    /// Counter-clockwise rotation by `radians` around `(cx, cy)`.
    pub fn rotation_about(radians: f64, cx: f64, cy: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Affine([c, -s, cx - c * cx + s * cy, s, c, cy - s * cx - c * cy])
    }

    /// `true` when the linear part is exactly the identity, so only a
    /// translation remains.
    ///
    /// The comparison is exact; near-identity matrices take the general
    /// path.
    pub fn is_translation(&self) -> bool {
        let m = &self.0;
        m[0] == 1.0 && m[1] == 0.0 && m[3] == 0.0 && m[4] == 1.0
    }

    pub fn map(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.0;
        (
            m[0] * x + m[1] * y + m[2],
            m[3] * x + m[4] * y + m[5],
        )
    }

    /// Map an integer point, truncating toward zero.
    pub fn map_point(&self, p: Point) -> Point {
        let (x, y) = self.map(p.x as f64, p.y as f64);
        Point::new(x as i32, y as i32)
    }

    /// The inverse matrix, or `None` if the linear part is singular.
    pub fn invert(&self) -> Option<Affine> {
        let [a, b, c, d, e, f] = self.0;
        let det = a * e - b * d;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let ia = e / det;
        let ib = -b / det;
        let id = -d / det;
        let ie = a / det;
        Some(Affine([
            ia,
            ib,
            -(ia * c + ib * f),
            id,
            ie,
            -(id * c + ie * f),
        ]))
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ── Color ────────────────────────────────────────────────────────

/// An 8-bit-per-channel, alpha-premultiplied RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 0xFF);
    pub const WHITE: Color = Color::rgba(0xFF, 0xFF, 0xFF, 0xFF);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// The colour as `0xRRGGBBAA`, the value the device expects
    /// little-endian on the wire.
    pub const fn to_rgba32(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

// ── Tests ────────────────────────────────────────────────────────
