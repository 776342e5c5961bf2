//! Pixel upload and solid fills, shared by windows and textures.

use crate::command::{ImageId, Op};
use crate::draw::DrawClient;
use crate::error::DrawError;
use crate::geometry::{Color, Point, Rect};
use crate::screen::buffer::Buffer;
use crate::screen::{ScreenShared, WindowKey};

/// Clip rectangle for replicated images: large enough that tiling
/// never runs out.
pub const REPL_CLIP: Rect = Rect::new(-0x3FFF_FFFF, -0x3FFF_FFFF, 0x3FFF_FFFF, 0x3FFF_FFFF);

const UNIT: Rect = Rect::new(0, 0, 1, 1);

// ── Uploader ─────────────────────────────────────────────────────

/// A device image that accepts pixels from the host.
pub trait Uploader {
    /// Copy `sr` of `src` into this image with its top-left at `dp`.
    fn upload(&self, dp: Point, src: &Buffer, sr: Rect) -> Result<(), DrawError>;

    /// Composite a solid `color` over `dr`.
    fn fill(&self, dr: Rect, color: Color, op: Op) -> Result<(), DrawError>;

    /// Free the image and anything allocated on its behalf.
    fn release(&self);
}

pub(crate) fn upload_to(
    client: &DrawClient,
    dst: ImageId,
    dp: Point,
    src: &Buffer,
    sr: Rect,
) -> Result<(), DrawError> {
    let sr = sr.intersect(&src.bounds());
    if sr.is_empty() {
        return Ok(());
    }
    let dr = Rect::from_size(sr.size()).translate(dp);
    client.replace_subimage(dst, dr, &src.sub_pixels(sr))
}

pub(crate) fn fill_to(
    screen: &ScreenShared,
    owner: Option<WindowKey>,
    dst: ImageId,
    dr: Rect,
    color: Color,
    op: Op,
) -> Result<(), DrawError> {
    let paint = TransientImage::solid(screen, owner, color)?;
    let mask = TransientImage::solid(screen, owner, Color::BLACK)?;
    screen
        .client
        .draw(dst, paint.id(), mask.id(), dr, Point::ZERO, Point::ZERO, op)
}

// ── TransientImage ───────────────────────────────────────────────

/// A device image that lives for one compositing call.
///
/// While alive it is listed as an auxiliary image of its window, so a
/// window release frees it too. Dropping it frees the image.
pub(crate) struct TransientImage<'a> {
    screen: &'a ScreenShared,
    owner: Option<WindowKey>,
    id: ImageId,
}

impl<'a> TransientImage<'a> {
    pub(crate) fn alloc(
        screen: &'a ScreenShared,
        owner: Option<WindowKey>,
        repl: bool,
        bounds: Rect,
        clip: Rect,
        color: Color,
    ) -> Result<Self, DrawError> {
        let id = screen.client.alloc_image(0, repl, bounds, clip, color)?;
        if let Some(key) = owner {
            screen.add_aux(key, id);
        }
        Ok(Self { screen, owner, id })
    }

    /// A 1x1 replicated image of `color`.
    pub(crate) fn solid(
        screen: &'a ScreenShared,
        owner: Option<WindowKey>,
        color: Color,
    ) -> Result<Self, DrawError> {
        Self::alloc(screen, owner, true, UNIT, REPL_CLIP, color)
    }

    /// An image holding `pixels`, anchored at the origin.
    pub(crate) fn upload(
        screen: &'a ScreenShared,
        owner: Option<WindowKey>,
        pixels: &Buffer,
    ) -> Result<Self, DrawError> {
        let r = pixels.bounds();
        let image = Self::alloc(screen, owner, false, r, r, Color::TRANSPARENT)?;
        screen.client.replace_subimage(image.id, r, pixels.pixels())?;
        Ok(image)
    }

    pub(crate) fn id(&self) -> ImageId {
        self.id
    }
}

impl Drop for TransientImage<'_> {
    fn drop(&mut self) {
        let registered = match self.owner {
            Some(key) => self.screen.remove_aux(key, self.id),
            None => true,
        };
        if registered {
            self.screen.client.free_id(self.id);
        }
    }
}
