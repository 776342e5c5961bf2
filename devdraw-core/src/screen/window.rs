//! Windows: device images composited onto the host window.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::command::{ImageId, Op};
use crate::error::DrawError;
use crate::geometry::{Color, Point, Rect};
use crate::input::Event;
use crate::screen::buffer::Buffer;
use crate::screen::upload::{Uploader, fill_to, upload_to};
use crate::screen::{ScreenShared, WindowKey};

/// A handle to one window of a [`crate::Screen`].
///
/// The image behind the window is replaced when the host window is
/// resized; the handle always refers to the current one.
pub struct Window {
    screen: Arc<ScreenShared>,
    key: WindowKey,
    events: Mutex<mpsc::UnboundedReceiver<Event>>,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("key", &self.key)
            .field("image", &self.image().ok())
            .finish()
    }
}

impl Window {
    pub(crate) fn new(
        screen: Arc<ScreenShared>,
        key: WindowKey,
        events: mpsc::UnboundedReceiver<Event>,
    ) -> Self {
        Self {
            screen,
            key,
            events: Mutex::new(events),
        }
    }

    pub(crate) fn shared(&self) -> &ScreenShared {
        &self.screen
    }

    pub(crate) fn key(&self) -> WindowKey {
        self.key
    }

    /// The current device image, unless the window was released.
    pub fn image(&self) -> Result<ImageId, DrawError> {
        self.screen.window_image(self.key)
    }

    /// Window size; every window matches the host frame.
    pub fn size(&self) -> Point {
        self.screen.frame().size()
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size())
    }

    /// Whether input is currently delivered to this window.
    pub fn is_active(&self) -> bool {
        self.screen.is_active(self.key)
    }

    /// Composite every window onto the host window and flush.
    pub fn publish(&self) -> Result<(), DrawError> {
        self.screen.redraw()
    }

    /// Queue an event for this window's own consumer.
    pub fn send(&self, event: Event) -> Result<(), DrawError> {
        self.screen.post(self.key, event)
    }

    /// Block until the next event arrives. Returns `None` once the
    /// window or its screen has been released and the queue is empty.
    ///
    /// Must not be called from within an async runtime.
    pub fn next_event(&self) -> Option<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .blocking_recv()
    }

    /// The next queued event, if any, without blocking.
    pub fn try_next_event(&self) -> Option<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok()
    }
}

impl Uploader for Window {
    fn upload(&self, dp: Point, src: &Buffer, sr: Rect) -> Result<(), DrawError> {
        upload_to(&self.screen.client, self.image()?, dp, src, sr)
    }

    fn fill(&self, dr: Rect, color: Color, op: Op) -> Result<(), DrawError> {
        fill_to(&self.screen, Some(self.key), self.image()?, dr, color, op)
    }

    fn release(&self) {
        self.screen.release_window(self.key);
    }
}
