//! Device-resident images used as drawing sources.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::command::{ImageId, Op};
use crate::error::DrawError;
use crate::geometry::{Color, Point, Rect};
use crate::screen::ScreenShared;
use crate::screen::buffer::Buffer;
use crate::screen::upload::{Uploader, fill_to, upload_to};

/// An image on the draw device, cleared to transparent on creation.
pub struct Texture {
    screen: Arc<ScreenShared>,
    image: ImageId,
    size: Point,
    released: AtomicBool,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("image", &self.image)
            .field("size", &self.size)
            .field("released", &self.released.load(Ordering::Relaxed))
            .finish()
    }
}

impl Texture {
    pub(crate) fn alloc(screen: Arc<ScreenShared>, size: Point) -> Result<Self, DrawError> {
        let r = Rect::from_size(size);
        let image = screen
            .client
            .alloc_image(0, false, r, r, Color::TRANSPARENT)?;
        debug!(%image, ?size, "texture created");
        Ok(Self {
            screen,
            image,
            size,
            released: AtomicBool::new(false),
        })
    }

    pub fn size(&self) -> Point {
        self.size
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }

    /// The device image id, unless the texture was released.
    pub fn image(&self) -> Result<ImageId, DrawError> {
        if self.released.load(Ordering::Acquire) {
            Err(DrawError::Released)
        } else {
            Ok(self.image)
        }
    }
}

impl Uploader for Texture {
    fn upload(&self, dp: Point, src: &Buffer, sr: Rect) -> Result<(), DrawError> {
        upload_to(&self.screen.client, self.image()?, dp, src, sr)
    }

    fn fill(&self, dr: Rect, color: Color, op: Op) -> Result<(), DrawError> {
        fill_to(&self.screen, None, self.image()?, dr, color, op)
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.screen.client.free_id(self.image);
        }
    }
}
