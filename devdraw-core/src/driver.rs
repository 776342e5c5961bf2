//! Session driver: device reader threads, the dispatch loop and the
//! consumer callback.
//!
//! ```text
//!  mouse thread ──► mpsc ──┐
//!                          ├──► dispatch loop ──► active window queue
//!  keyboard thread ► mpsc ─┘          ▲
//!  consumer thread ──── done ─────────┘
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::thread;

use bytes::{Bytes, BytesMut};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Decoder;
use tracing::{debug, error, info, warn};

use crate::codec::{KeyboardDecoder, MouseDecoder};
use crate::config::DevicePaths;
use crate::draw::DrawClient;
use crate::error::DrawError;
use crate::input::{
    DeviceHost, Event, KeyEvent, KeyboardTranslator, MouseEvent, MouseRecord, MouseTranslator,
};
use crate::screen::Screen;

/// Depth of each input queue between a reader thread and the dispatch loop.
pub const INPUT_QUEUE_DEPTH: usize = 64;

const READ_CHUNK: usize = 512;

// ── Record readers ───────────────────────────────────────────────

/// Frame records from a blocking byte source and pass each to `f`
/// until end of input, an I/O error, or `f` returns `false`.
///
/// Framing errors drop the buffered bytes and reading continues.
pub fn read_records<R, D>(
    mut src: R,
    mut decoder: D,
    mut f: impl FnMut(Bytes) -> bool,
) -> Result<(), DrawError>
where
    R: Read,
    D: Decoder<Item = Bytes, Error = DrawError>,
{
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = match src.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        buf.extend_from_slice(&chunk[..n]);

        loop {
            match decoder.decode(&mut buf) {
                Ok(Some(record)) => {
                    if !f(record) {
                        return Ok(());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("dropping input: {e}");
                    buf.clear();
                    break;
                }
            }
        }
    }
}

/// Translate mouse records into events; resize records re-lay the
/// screen out on this thread.
pub fn mouse_loop(
    src: impl Read,
    screen: &Screen,
    tx: &mpsc::Sender<MouseEvent>,
) -> Result<(), DrawError> {
    let mut translator = MouseTranslator::new();
    read_records(src, MouseDecoder, |record| match MouseRecord::parse(&record) {
        Ok(MouseRecord::Resize) => {
            if let Err(e) = screen.handle_resize() {
                warn!("resize failed: {e}");
            }
            true
        }
        Ok(MouseRecord::Move { x, y, buttons }) => translator
            .translate(x, y, buttons)
            .into_iter()
            .all(|ev| tx.blocking_send(ev).is_ok()),
        Err(e) => {
            warn!("skipping mouse record: {e}");
            true
        }
    })
}

pub fn keyboard_loop(src: impl Read, tx: &mpsc::Sender<KeyEvent>) -> Result<(), DrawError> {
    let mut translator = KeyboardTranslator::new();
    read_records(src, KeyboardDecoder, |record| {
        match translator.translate(&record) {
            Ok(events) => events.into_iter().all(|ev| tx.blocking_send(ev).is_ok()),
            Err(e) => {
                warn!("skipping keyboard record: {e}");
                true
            }
        }
    })
}

// ── Dispatch ─────────────────────────────────────────────────────

/// Forward input to the active window until `done` fires.
///
/// Events from one source are forwarded in arrival order.
pub async fn dispatch(
    screen: &Screen,
    mut mouse: mpsc::Receiver<MouseEvent>,
    mut keys: mpsc::Receiver<KeyEvent>,
    mut done: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            Some(ev) = mouse.recv() => {
                if !screen.dispatch(Event::Mouse(ev)) {
                    debug!("mouse event dropped: no active window");
                }
            }
            Some(ev) = keys.recv() => {
                if !screen.dispatch(Event::Key(ev)) {
                    debug!("key event dropped: no active window");
                }
            }
            _ = &mut done => break,
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────

fn spawn_reader<T: Send + 'static>(
    name: &str,
    path: &Path,
    tx: mpsc::Sender<T>,
    body: impl FnOnce(File, &mpsc::Sender<T>) -> Result<(), DrawError> + Send + 'static,
) -> Result<(), DrawError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            error!("could not open {name} device {}: {e}", path.display());
            return Ok(());
        }
    };
    let label = name.to_string();
    thread::Builder::new()
        .name(format!("devdraw-{name}"))
        .spawn(move || {
            if let Err(e) = body(file, &tx) {
                error!("{label} reader stopped: {e}");
            }
        })?;
    Ok(())
}

/// Connect to the draw device, run `f` with the screen on its own
/// thread and forward input to the active window until `f` returns.
/// The screen is released afterwards.
pub fn run<F>(paths: &DevicePaths, f: F) -> Result<(), DrawError>
where
    F: FnOnce(Screen) + Send + 'static,
{
    let client = DrawClient::open(paths)?;
    let screen = Screen::connect(client, Box::new(DeviceHost::new(paths)))?;

    let (mouse_tx, mouse_rx) = mpsc::channel(INPUT_QUEUE_DEPTH);
    let (key_tx, key_rx) = mpsc::channel(INPUT_QUEUE_DEPTH);

    let resizer = screen.clone();
    spawn_reader("mouse", &paths.mouse, mouse_tx, move |file, tx| {
        mouse_loop(file, &resizer, tx)
    })?;
    spawn_reader("keyboard", &paths.keyboard, key_tx, |file, tx| {
        keyboard_loop(file, tx)
    })?;

    let (done_tx, done_rx) = oneshot::channel();
    let consumer = screen.clone();
    let callback = thread::Builder::new()
        .name("devdraw-main".into())
        .spawn(move || {
            f(consumer);
            let _ = done_tx.send(());
        })?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(dispatch(&screen, mouse_rx, key_rx, done_rx));

    if callback.join().is_err() {
        warn!("consumer callback panicked");
    }
    info!("consumer finished, releasing screen");
    screen.release()
}

// ── Tests ────────────────────────────────────────────────────────
