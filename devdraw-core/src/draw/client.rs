//! Draw device protocol client.
//!
//! A [`DrawClient`] owns one connection: its data channel, the
//! negotiated transfer unit and the image id allocator. Every command
//! is one write on the data channel. Sequences that must not interleave
//! with other compositing (set op then draw, batch redraw, screen
//! reallocation) run under the client's draw lock.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;
use tokio_util::codec::Encoder;
use tracing::{debug, info, warn};

use crate::codec::DrawCodec;
use crate::command::{DrawCommand, ImageId, Op};
use crate::config::DevicePaths;
use crate::draw::ctl::{ControlMessage, parse_iounit, read_control_string};
use crate::draw::transfer::{self, LoadPath};
use crate::error::DrawError;
use crate::geometry::{Color, Point, Rect};

/// Highest screen slot tried by [`DrawClient::alloc_screen`].
pub const MAX_SCREEN_SLOT: u32 = 254;

/// First id handed out; 0 is the host window, 1 is reserved for the
/// host window's name binding.
const FIRST_IMAGE_ID: u32 = 2;

// ── DrawChannel ──────────────────────────────────────────────────

/// A bidirectional byte channel to the device.
pub trait DrawChannel: Read + Write + Send {}

impl<T: Read + Write + Send> DrawChannel for T {}

// ── DrawClient ───────────────────────────────────────────────────

/// One connection to the draw device.
pub struct DrawClient {
    ctl: ControlMessage,
    data: Mutex<Box<dyn DrawChannel>>,
    iounit: usize,
    next_id: AtomicU32,
    draw_lock: Mutex<()>,
}

impl std::fmt::Debug for DrawClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawClient")
            .field("conn", &self.ctl.index)
            .field("iounit", &self.iounit)
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

impl DrawClient {
    /// Open a new connection on the device named by `paths`.
    pub fn open(paths: &DevicePaths) -> Result<Self, DrawError> {
        let mut source = File::open(&paths.draw_new).map_err(|e| {
            DrawError::Protocol(format!("could not open {}: {e}", paths.draw_new.display()))
        })?;
        let text = read_control_string(&mut source)?;
        let ctl = ControlMessage::parse(&text)?;
        drop(source);

        let data_path = paths.data_path(ctl.index);
        let data = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&data_path)
            .map_err(|e| DrawError::Protocol(format!("could not open {data_path}: {e}")))?;

        let table_path = paths.fd_table_path();
        let table = fs::read_to_string(&table_path).map_err(|e| {
            DrawError::Protocol(format!("could not determine transfer unit from {table_path}: {e}"))
        })?;
        let iounit = parse_iounit(&table, &data_path).ok_or_else(|| {
            DrawError::Protocol(format!("no transfer unit listed for {data_path}"))
        })?;

        info!(
            conn = ctl.index,
            iounit,
            chan = %ctl.channel_format,
            "draw connection opened"
        );
        Ok(Self::from_parts(ctl, Box::new(data), iounit))
    }

    /// Build a client over an already-open data channel.
    pub fn from_parts(ctl: ControlMessage, data: Box<dyn DrawChannel>, iounit: usize) -> Self {
        Self {
            ctl,
            data: Mutex::new(data),
            iounit,
            next_id: AtomicU32::new(FIRST_IMAGE_ID),
            draw_lock: Mutex::new(()),
        }
    }

    pub fn control_message(&self) -> &ControlMessage {
        &self.ctl
    }

    /// Largest message the data channel accepts.
    pub fn iounit(&self) -> usize {
        self.iounit
    }

    // ── Raw channel access ───────────────────────────────────────

    fn channel(&self) -> MutexGuard<'_, Box<dyn DrawChannel>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn encode(cmd: DrawCommand<'_>) -> Result<BytesMut, DrawError> {
        let mut buf = BytesMut::with_capacity(cmd.encoded_len());
        DrawCodec.encode(cmd, &mut buf)?;
        Ok(buf)
    }

    fn send(&self, cmd: DrawCommand<'_>) -> Result<(), DrawError> {
        let buf = Self::encode(cmd)?;
        self.channel().write_all(&buf)?;
        Ok(())
    }

    // ── Screens ──────────────────────────────────────────────────

    /// Allocate the first screen slot the device accepts.
    pub fn alloc_screen(&self) -> Result<u32, DrawError> {
        for slot in 0..=MAX_SCREEN_SLOT {
            match self.send(DrawCommand::AllocScreen { slot }) {
                Ok(()) => {
                    debug!(slot, "screen allocated");
                    return Ok(slot);
                }
                Err(e) => debug!(slot, "screen slot rejected: {e}"),
            }
        }
        Err(DrawError::NoScreenAvailable)
    }

    /// Release a screen slot. Failures are logged, not returned.
    pub fn free_screen(&self, slot: u32) {
        if let Err(e) = self.send(DrawCommand::FreeScreen { slot }) {
            warn!(slot, "free screen failed: {e}");
        }
    }

    /// Free and re-allocate `slot`, discarding device-side clip state
    /// left over from the previous host geometry.
    pub fn realloc_screen(&self, slot: u32) -> Result<(), DrawError> {
        let _guard = self.lock_draw();
        self.free_screen(slot);
        self.send(DrawCommand::AllocScreen { slot })
    }

    /// Bind image 0 to the host window called `name`.
    pub fn attach(&self, name: &[u8]) -> Result<(), DrawError> {
        if name.len() > u8::MAX as usize {
            return Err(DrawError::Protocol(format!(
                "host window name is {} bytes, at most 255 fit",
                name.len()
            )));
        }
        self.send(DrawCommand::AttachName { name })
    }

    // ── Images ───────────────────────────────────────────────────

    fn next_image_id(&self) -> ImageId {
        ImageId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Allocate an RGBA image and return its new id.
    ///
    /// With `repl` set the image tiles `clip` by repeating `bounds`.
    pub fn alloc_image(
        &self,
        refresh: u8,
        repl: bool,
        bounds: Rect,
        clip: Rect,
        color: Color,
    ) -> Result<ImageId, DrawError> {
        let id = self.next_image_id();
        self.send(DrawCommand::AllocImage {
            id,
            refresh,
            repl,
            bounds,
            clip,
            color,
        })?;
        debug!(%id, ?bounds, repl, "image allocated");
        Ok(id)
    }

    /// Release an image id. Failures are logged, not returned.
    pub fn free_id(&self, id: ImageId) {
        if let Err(e) = self.send(DrawCommand::FreeImage { id }) {
            warn!(%id, "free image failed: {e}");
        }
    }

    /// Change the bounds and replication of an existing image.
    pub fn reclip(&self, id: ImageId, repl: bool, rect: Rect) -> Result<(), DrawError> {
        self.send(DrawCommand::Reclip { id, repl, rect })
    }

    // ── Compositing ──────────────────────────────────────────────

    fn lock_draw(&self) -> MutexGuard<'_, ()> {
        self.draw_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the draw lock for a sequence of composites.
    pub fn batch(&self) -> DrawBatch<'_> {
        DrawBatch {
            client: self,
            _guard: self.lock_draw(),
        }
    }

    /// Composite `src` through `mask` onto `rect` of `dst` with `op`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &self,
        dst: ImageId,
        src: ImageId,
        mask: ImageId,
        rect: Rect,
        src_point: Point,
        mask_point: Point,
        op: Op,
    ) -> Result<(), DrawError> {
        self.batch()
            .composite(dst, src, mask, rect, src_point, mask_point, op)
    }

    /// Flush pending drawing to the screen.
    pub fn flush(&self) -> Result<(), DrawError> {
        self.send(DrawCommand::Flush)
    }

    // ── Pixel transfer ───────────────────────────────────────────

    /// Replace `rect` of `dst` with RGBA `pixels`.
    pub fn replace_subimage(&self, dst: ImageId, rect: Rect, pixels: &[u8]) -> Result<(), DrawError> {
        if pixels.len() != rect.byte_len() {
            return Err(DrawError::Protocol(format!(
                "pixel buffer holds {} bytes, {rect:?} needs {}",
                pixels.len(),
                rect.byte_len()
            )));
        }
        if rect.is_empty() {
            return Ok(());
        }

        match transfer::load_path(self.iounit, pixels.len()) {
            LoadPath::Direct => self.send(DrawCommand::Load {
                dst,
                rect,
                pixels,
            }),
            LoadPath::Split => {
                let row_len = rect.dx() as usize * crate::BYTES_PER_PIXEL;
                for band in transfer::load_bands(rect, self.iounit) {
                    let start = (band.min.y - rect.min.y) as usize * row_len;
                    self.send(DrawCommand::Load {
                        dst,
                        rect: band,
                        pixels: &pixels[start..start + band.byte_len()],
                    })?;
                }
                Ok(())
            }
            LoadPath::Compressed => {
                let blocks = transfer::compressed_blocks(rect, pixels, self.iounit);
                debug!(%dst, blocks = blocks.len(), "compressed upload");
                for block in &blocks {
                    self.send(DrawCommand::LoadCompressed {
                        dst,
                        rect: block.rect,
                        data: &block.data,
                    })?;
                }
                Ok(())
            }
        }
    }

    /// Read back the RGBA pixels of `rect` from `src`.
    ///
    /// A reply shorter than requested means the channel is broken and
    /// is returned as [`DrawError::ShortRead`].
    pub fn read_subimage(&self, src: ImageId, rect: Rect) -> Result<Vec<u8>, DrawError> {
        let mut pixels = vec![0u8; rect.byte_len()];
        if rect.is_empty() {
            return Ok(pixels);
        }

        let bands = if pixels.len() <= self.iounit {
            vec![rect]
        } else {
            transfer::read_bands(rect, self.iounit)
        };

        let row_len = rect.dx() as usize * crate::BYTES_PER_PIXEL;
        for band in bands {
            let start = (band.min.y - rect.min.y) as usize * row_len;
            let chunk = &mut pixels[start..start + band.byte_len()];

            // Request and reply must be adjacent on the channel.
            let request = Self::encode(DrawCommand::Read { src, rect: band })?;
            let mut channel = self.channel();
            channel.write_all(&request)?;
            let n = channel.read(chunk)?;
            if n != chunk.len() {
                return Err(DrawError::ShortRead {
                    expected: chunk.len(),
                    actual: n,
                });
            }
        }
        Ok(pixels)
    }
}

// ── DrawBatch ────────────────────────────────────────────────────

/// Holds the draw lock; composites issued through it cannot interleave
/// with other compositing on the same client.
pub struct DrawBatch<'a> {
    client: &'a DrawClient,
    _guard: MutexGuard<'a, ()>,
}

impl DrawBatch<'_> {
    /// Set the compositing operator, then composite.
    #[allow(clippy::too_many_arguments)]
    pub fn composite(
        &mut self,
        dst: ImageId,
        src: ImageId,
        mask: ImageId,
        rect: Rect,
        src_point: Point,
        mask_point: Point,
        op: Op,
    ) -> Result<(), DrawError> {
        self.client.send(DrawCommand::SetOp(op))?;
        self.client.send(DrawCommand::Composite {
            dst,
            src,
            mask,
            rect,
            src_point,
            mask_point,
        })
    }

    pub fn flush(&mut self) -> Result<(), DrawError> {
        self.client.flush()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::LOAD_HEADER_LEN;
    use crate::compress::decompress;
    use crate::draw::mock::{MockChannel, coordinate_pixels, image_at, le_u32, rect_at};
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn ids_start_at_two_and_never_repeat() {
        let (client, mock) = MockChannel::client(65535);
        let mut seen = HashSet::new();
        for i in 0..20 {
            let id = client
                .alloc_image(0, false, Rect::new(0, 0, 1, 1), Rect::new(0, 0, 1, 1), Color::BLACK)
                .unwrap();
            if i == 0 {
                assert_eq!(id, ImageId(2));
            }
            if i % 3 == 0 {
                client.free_id(id);
            }
            assert!(seen.insert(id), "{id} issued twice");
        }
        let allocs = mock.messages().iter().filter(|m| m[0] == b'b').count();
        assert_eq!(allocs, 20);
    }

    #[test]
    fn concurrent_allocations_are_unique() {
        let (client, _mock) = MockChannel::client(65535);
        let client = Arc::new(client);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let client = client.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| {
                            client
                                .alloc_image(0, true, Rect::new(0, 0, 1, 1), Rect::ZERO, Color::WHITE)
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 200);
    }

    #[test]
    fn alloc_screen_skips_rejected_slots() {
        let (client, mock) = MockChannel::client(65535);
        mock.with(|s| s.rejected_slots = vec![0, 1, 2]);
        assert_eq!(client.alloc_screen().unwrap(), 3);
    }

    #[test]
    fn alloc_screen_exhaustion() {
        let (client, mock) = MockChannel::client(65535);
        mock.with(|s| s.reject_all_screens = true);
        assert!(matches!(client.alloc_screen(), Err(DrawError::NoScreenAvailable)));
    }

    #[test]
    fn realloc_frees_then_allocates_same_slot() {
        let (client, mock) = MockChannel::client(65535);
        client.realloc_screen(7).unwrap();
        let msgs = mock.messages();
        assert_eq!(mock.tags(), "FA");
        assert_eq!(le_u32(&msgs[0], 1), 7);
        assert_eq!(le_u32(&msgs[1], 1), 7);
    }

    #[test]
    fn draw_sets_op_first() {
        let (client, mock) = MockChannel::client(65535);
        client
            .draw(
                ImageId(0),
                ImageId(3),
                ImageId(3),
                Rect::new(0, 0, 10, 10),
                Point::new(1, 1),
                Point::ZERO,
                Op::Src,
            )
            .unwrap();
        let msgs = mock.messages();
        assert_eq!(mock.tags(), "Od");
        assert_eq!(msgs[0][1], 10);
        assert_eq!(image_at(&msgs[1], 5), ImageId(3));
    }

    #[test]
    fn concurrent_draws_never_interleave() {
        let (client, mock) = MockChannel::client(65535);
        let client = Arc::new(client);
        let handles: Vec<_> = [Op::Src, Op::Over]
            .into_iter()
            .map(|op| {
                let client = client.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        client
                            .draw(ImageId(0), ImageId(2), ImageId(2), Rect::ZERO, Point::ZERO, Point::ZERO, op)
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let tags = mock.tags();
        assert_eq!(tags.len(), 400);
        assert!(tags.as_bytes().chunks(2).all(|pair| pair == b"Od"));
    }

    #[test]
    fn small_upload_is_one_message() {
        let (client, mock) = MockChannel::client(65535);
        let rect = Rect::new(0, 0, 4, 4);
        let pixels = coordinate_pixels(rect);
        client.replace_subimage(ImageId(5), rect, &pixels).unwrap();
        let msgs = mock.messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0][0], b'y');
        assert_eq!(rect_at(&msgs[0], 5), rect);
        assert_eq!(&msgs[0][21..], &pixels[..]);
    }

    #[test]
    fn native_upload_splits_on_rows() {
        let (client, mock) = MockChannel::client(65535);
        let rect = Rect::new(0, 10, 200, 210);
        let pixels = coordinate_pixels(rect);
        client.replace_subimage(ImageId(5), rect, &pixels).unwrap();

        let mut y = rect.min.y;
        let mut reassembled = Vec::new();
        for msg in mock.messages() {
            assert_eq!(msg[0], b'y');
            assert!(msg.len() <= 65535);
            let band = rect_at(&msg, 5);
            assert_eq!(band.min.y, y);
            assert_eq!(msg.len() - 21, band.byte_len());
            reassembled.extend_from_slice(&msg[21..]);
            y = band.max.y;
        }
        assert_eq!(y, rect.max.y);
        assert_eq!(reassembled, pixels);
    }

    #[test]
    fn remote_upload_is_compressed_into_row_blocks() {
        let (client, mock) = MockChannel::client(1000);
        let rect = Rect::new(0, 0, 50, 50);
        let pixels: Vec<u8> = (0..rect.byte_len()).map(|i| (i * 31 % 251) as u8).collect();
        client.replace_subimage(ImageId(9), rect, &pixels).unwrap();

        let msgs = mock.messages();
        assert!(msgs.len() > 1);
        let mut y = 0;
        let mut decoded = Vec::new();
        for msg in &msgs {
            assert_eq!(msg[0], b'Y');
            assert_eq!(image_at(msg, 1), ImageId(9));
            let band = rect_at(msg, 5);
            assert_eq!(band.min.y, y, "rows must be contiguous");
            decoded.extend(decompress(&msg[21..]).unwrap());
            y = band.max.y;
        }
        assert_eq!(y, 50);
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn upload_rejects_mismatched_buffer() {
        let (client, mock) = MockChannel::client(65535);
        let err = client
            .replace_subimage(ImageId(2), Rect::new(0, 0, 2, 2), &[0; 8])
            .unwrap_err();
        assert!(matches!(err, DrawError::Protocol(_)));
        assert!(mock.messages().is_empty());
    }

    #[test]
    fn read_reassembles_row_chunks() {
        let (client, mock) = MockChannel::client(1000);
        let rect = Rect::new(3, 7, 53, 57);
        let pixels = client.read_subimage(ImageId(4), rect).unwrap();
        assert_eq!(pixels.len(), 50 * 50 * 4);
        assert_eq!(pixels, coordinate_pixels(rect));

        let reads = mock.messages();
        assert!(reads.len() > 1);
        assert!(reads.iter().all(|m| m[0] == b'r' && m.len() == 21));
    }

    #[test]
    fn short_read_is_fatal() {
        let (client, mock) = MockChannel::client(65535);
        mock.with(|s| s.short_reads = true);
        let err = client.read_subimage(ImageId(4), Rect::new(0, 0, 8, 8)).unwrap_err();
        assert!(matches!(err, DrawError::ShortRead { expected: 256, actual: 128 }));
        assert!(err.is_fatal());
    }

    #[test]
    fn write_failures_surface_but_frees_do_not() {
        let (client, mock) = MockChannel::client(65535);
        mock.with(|s| s.fail_writes = true);
        assert!(client.flush().is_err());
        assert!(client.reclip(ImageId(3), false, Rect::ZERO).is_err());
        client.free_id(ImageId(3));
        client.free_screen(0);
    }

    #[test]
    fn attach_sends_name() {
        let (client, mock) = MockChannel::client(65535);
        client.attach(b"window.7.12").unwrap();
        let msg = &mock.messages()[0];
        assert_eq!(msg[0], b'n');
        assert_eq!(msg[5], 11);
        assert_eq!(&msg[6..], b"window.7.12");
        assert!(client.attach(&[b'x'; 300]).is_err());
    }

    #[test]
    fn every_message_is_one_write() {
        let (client, mock) = MockChannel::client(65535);
        client.free_id(ImageId(6));
        client.flush().unwrap();
        client
            .read_subimage(ImageId(6), Rect::new(0, 0, 2, 2))
            .unwrap();

        let msgs = mock.messages();
        assert_eq!(mock.tags(), "fvr");
        assert_eq!(msgs[0].len(), 5);
        assert_eq!(msgs[1].len(), 1);
        assert_eq!(msgs[2].len(), LOAD_HEADER_LEN);
        assert_eq!(rect_at(&msgs[2], 5), Rect::new(0, 0, 2, 2));
        assert_eq!(client.control_message().index, 1);
    }
}
