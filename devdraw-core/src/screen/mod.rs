//! Screens and the device resources they own.
//!
//! A [`Screen`] holds the session's screen slot and an arena of window
//! slots. [`Window`] handles refer to their slot by key, so the image
//! id behind a window can be replaced on resize while the handle stays
//! valid. Lock order is screen state first, then the client's draw
//! lock.

pub mod buffer;
pub mod texture;
pub mod upload;
pub mod window;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::{ImageId, Op};
use crate::draw::DrawClient;
use crate::error::DrawError;
use crate::geometry::{Color, Point, Rect};
use crate::input::{Event, HostWindow};
use crate::state::ScreenPhase;

pub use buffer::Buffer;
pub use texture::Texture;
pub use upload::{REPL_CLIP, Uploader};
pub use window::Window;

/// Index of a window in the screen's arena.
pub(crate) type WindowKey = usize;

// ── Shared state ─────────────────────────────────────────────────

pub(crate) struct WindowSlot {
    image: ImageId,
    /// Transient images currently in use by compositing on this window.
    aux: Vec<ImageId>,
    events: mpsc::UnboundedSender<Event>,
}

#[derive(Default)]
struct ScreenState {
    phase: ScreenPhase,
    frame: Rect,
    windows: Vec<Option<WindowSlot>>,
    /// Live window keys, oldest first.
    order: Vec<WindowKey>,
    active: Option<WindowKey>,
}

impl ScreenState {
    fn slot(&self, key: WindowKey) -> Option<&WindowSlot> {
        self.windows.get(key).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, key: WindowKey) -> Option<&mut WindowSlot> {
        self.windows.get_mut(key).and_then(Option::as_mut)
    }

    /// Take a window out of the arena. Input moves to the newest
    /// remaining window if it was active.
    fn remove_window(&mut self, key: WindowKey) -> Option<WindowSlot> {
        let w = self.windows.get_mut(key).and_then(Option::take)?;
        self.order.retain(|&k| k != key);
        if self.active == Some(key) {
            self.active = self.order.last().copied();
        }
        Some(w)
    }
}

pub(crate) struct ScreenShared {
    pub(crate) client: DrawClient,
    host: Box<dyn HostWindow>,
    slot: u32,
    state: Mutex<ScreenState>,
}

impl ScreenShared {
    fn lock(&self) -> MutexGuard<'_, ScreenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn usable(state: &ScreenState) -> Result<(), DrawError> {
        if state.phase.is_usable() {
            Ok(())
        } else {
            Err(DrawError::Released)
        }
    }

    pub(crate) fn ensure_usable(&self) -> Result<(), DrawError> {
        Self::usable(&self.lock())
    }

    pub(crate) fn frame(&self) -> Rect {
        self.lock().frame
    }

    pub(crate) fn window_image(&self, key: WindowKey) -> Result<ImageId, DrawError> {
        self.lock()
            .slot(key)
            .map(|w| w.image)
            .ok_or(DrawError::Released)
    }

    pub(crate) fn is_active(&self, key: WindowKey) -> bool {
        self.lock().active == Some(key)
    }

    pub(crate) fn add_aux(&self, key: WindowKey, id: ImageId) {
        if let Some(w) = self.lock().slot_mut(key) {
            w.aux.push(id);
        }
    }

    /// Forget a transient image. Returns `false` if the window was
    /// released meanwhile, which already freed the image.
    pub(crate) fn remove_aux(&self, key: WindowKey, id: ImageId) -> bool {
        match self.lock().slot_mut(key) {
            Some(w) => match w.aux.iter().position(|&a| a == id) {
                Some(i) => {
                    w.aux.swap_remove(i);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    pub(crate) fn post(&self, key: WindowKey, event: Event) -> Result<(), DrawError> {
        let state = self.lock();
        let w = state.slot(key).ok_or(DrawError::Released)?;
        w.events.send(event)?;
        Ok(())
    }

    fn free_slot(&self, w: WindowSlot) {
        for id in w.aux {
            self.client.free_id(id);
        }
        self.client.free_id(w.image);
    }

    pub(crate) fn release_window(&self, key: WindowKey) {
        let Some(w) = self.lock().remove_window(key) else {
            return;
        };
        debug!(window = key, image = %w.image, "window released");
        self.free_slot(w);
    }

    /// Reallocate the screen slot, reattach and give every window a new
    /// image of `size`. A window whose old image was freed but whose
    /// new one could not be allocated is removed.
    fn relayout(&self, state: &mut ScreenState, size: Point) -> Result<(), DrawError> {
        self.client.realloc_screen(self.slot)?;
        self.client.attach(&self.host.window_name()?)?;

        let r = Rect::from_size(size);
        for key in state.order.clone() {
            let Some(old) = state.slot(key).map(|w| w.image) else {
                continue;
            };
            self.client.free_id(old);
            match self.client.alloc_image(0, false, r, r, Color::TRANSPARENT) {
                Ok(image) => {
                    if let Some(w) = state.slot_mut(key) {
                        w.image = image;
                    }
                }
                Err(e) => {
                    if let Some(w) = state.remove_window(key) {
                        for id in w.aux {
                            self.client.free_id(id);
                        }
                    }
                    warn!(window = key, "window lost during resize: {e}");
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Composite every window onto the host window, then flush.
    pub(crate) fn redraw(&self) -> Result<(), DrawError> {
        let state = self.lock();
        Self::usable(&state)?;
        let frame = state.frame;

        let mut batch = self.client.batch();
        for &key in &state.order {
            if let Some(w) = state.slot(key) {
                batch.composite(
                    ImageId::HOST,
                    w.image,
                    w.image,
                    frame,
                    Point::ZERO,
                    Point::ZERO,
                    Op::Src,
                )?;
            }
        }
        batch.flush()
    }
}

// ── Screen ───────────────────────────────────────────────────────

/// A screen slot on the draw device plus the windows drawn into the
/// host window.
#[derive(Clone)]
pub struct Screen {
    shared: Arc<ScreenShared>,
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Screen")
            .field("slot", &self.shared.slot)
            .field("phase", &state.phase)
            .field("frame", &state.frame)
            .field("windows", &state.order.len())
            .finish()
    }
}

impl Screen {
    /// Attach to the host window and allocate a screen slot.
    pub fn connect(client: DrawClient, host: Box<dyn HostWindow>) -> Result<Self, DrawError> {
        let mut phase = ScreenPhase::default();
        client.attach(&host.window_name()?)?;
        let slot = client.alloc_screen()?;
        let frame = match host.frame() {
            Ok(frame) => frame,
            Err(e) => {
                client.free_screen(slot);
                return Err(e);
            }
        };
        phase.connect()?;
        info!(slot, ?frame, "screen connected");

        Ok(Self {
            shared: Arc::new(ScreenShared {
                client,
                host,
                slot,
                state: Mutex::new(ScreenState {
                    phase,
                    frame,
                    ..Default::default()
                }),
            }),
        })
    }

    pub fn client(&self) -> &DrawClient {
        &self.shared.client
    }

    pub fn slot(&self) -> u32 {
        self.shared.slot
    }

    pub fn phase(&self) -> ScreenPhase {
        self.shared.lock().phase
    }

    /// The host window's drawable area in screen coordinates.
    pub fn frame(&self) -> Rect {
        self.shared.frame()
    }

    pub fn new_buffer(&self, size: Point) -> Buffer {
        Buffer::new(size)
    }

    /// Allocate a transparent device image of `size`.
    pub fn new_texture(&self, size: Point) -> Result<Texture, DrawError> {
        self.shared.ensure_usable()?;
        Texture::alloc(self.shared.clone(), size)
    }

    /// Allocate a white window the size of the frame and make it active.
    ///
    /// Its queue starts with a size event followed by a paint request.
    pub fn new_window(&self) -> Result<Window, DrawError> {
        let mut state = self.shared.lock();
        ScreenShared::usable(&state)?;

        let size = state.frame.size();
        let r = Rect::from_size(size);
        let image = self.shared.client.alloc_image(0, false, r, r, Color::WHITE)?;
        state.phase.open_window()?;

        let (events, rx) = mpsc::unbounded_channel();
        events.send(Event::Size(size))?;
        events.send(Event::Paint)?;

        let key = state.windows.len();
        state.windows.push(Some(WindowSlot {
            image,
            aux: Vec::new(),
            events,
        }));
        state.order.push(key);
        state.active = Some(key);
        info!(window = key, %image, ?size, "window created");

        Ok(Window::new(self.shared.clone(), key, rx))
    }

    /// Re-read the host frame and lay the windows out again.
    pub fn handle_resize(&self) -> Result<(), DrawError> {
        let frame = self.shared.host.frame()?;
        self.resize_to(frame)
    }

    /// Reallocate the screen slot, reattach the host window and replace
    /// every window image with one the size of `frame`. The active
    /// window then receives a size event and a paint request.
    ///
    /// On failure the phase is restored and the old frame kept, so a
    /// later resize can try again.
    pub fn resize_to(&self, frame: Rect) -> Result<(), DrawError> {
        let shared = &*self.shared;
        let mut guard = shared.lock();
        ScreenShared::usable(&guard)?;

        let windowed = guard.phase == ScreenPhase::WindowActive;
        if windowed {
            guard.phase.begin_resize()?;
        }

        let size = frame.size();
        let state = &mut *guard;
        let relaid = shared.relayout(state, size);
        if windowed {
            state.phase.finish_resize()?;
        }
        relaid?;
        state.frame = frame;
        info!(?frame, windows = state.order.len(), "screen resized");

        if let Some(w) = state.active.and_then(|key| state.slot(key)) {
            w.events.send(Event::Size(size))?;
            w.events.send(Event::Paint)?;
        }
        Ok(())
    }

    /// Composite every window onto the host window and flush.
    pub fn redraw(&self) -> Result<(), DrawError> {
        self.shared.redraw()
    }

    /// Forward an event to the active window, converting mouse
    /// coordinates from screen to window space. Returns `false` when no
    /// window took it.
    pub fn dispatch(&self, event: Event) -> bool {
        let state = self.shared.lock();
        let Some(w) = state.active.and_then(|key| state.slot(key)) else {
            return false;
        };
        let event = match event {
            Event::Mouse(m) => Event::Mouse(m.relative_to(state.frame.min)),
            other => other,
        };
        w.events.send(event).is_ok()
    }

    /// Free every window's images, auxiliary first, then the screen slot.
    pub fn release(&self) -> Result<(), DrawError> {
        let shared = &*self.shared;
        let mut state = shared.lock();
        state.phase.release()?;

        let order = std::mem::take(&mut state.order);
        state.active = None;
        for key in order {
            if let Some(w) = state.windows.get_mut(key).and_then(Option::take) {
                shared.free_slot(w);
            }
        }
        shared.client.free_screen(shared.slot);
        info!(slot = shared.slot, "screen released");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
