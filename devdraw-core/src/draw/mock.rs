//! In-memory stand-in for the draw device's data channel.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use crate::command::ImageId;
use crate::draw::client::DrawClient;
use crate::draw::ctl::ControlMessage;
use crate::geometry::{Point, Rect};

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub writes: Vec<Vec<u8>>,
    pub replies: VecDeque<Vec<u8>>,
    pub rejected_slots: Vec<u32>,
    pub reject_all_screens: bool,
    pub short_reads: bool,
    pub fail_writes: bool,
    pub reject_image_allocs: bool,
}

/// Records every message and answers `r` requests with pixels whose
/// bytes encode their own coordinates: `[x, y, 0x80, 0xFF]`.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockChannel {
    pub state: Arc<Mutex<MockState>>,
}

impl MockChannel {
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn tags(&self) -> String {
        self.messages().iter().map(|m| m[0] as char).collect()
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().writes.clear();
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// A client over a fresh mock with the given transfer unit.
    pub fn client(iounit: usize) -> (DrawClient, MockChannel) {
        let mock = MockChannel::default();
        let ctl = ControlMessage {
            index: 1,
            display_image: 1,
            channel_format: "x8r8g8b8".into(),
            reserved: "0".into(),
            display: Rect::new(0, 0, 1024, 768),
            clip: Rect::new(0, 0, 1024, 768),
        };
        let client = DrawClient::from_parts(ctl, Box::new(mock.clone()), iounit);
        (client, mock)
    }
}

pub(crate) fn le_u32(msg: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(msg[at..at + 4].try_into().unwrap())
}

/// Rectangle stored at byte offset `at` of a message.
pub(crate) fn rect_at(msg: &[u8], at: usize) -> Rect {
    let v = |i: usize| le_u32(msg, at + i * 4) as i32;
    Rect::new(v(0), v(1), v(2), v(3))
}

pub(crate) fn image_at(msg: &[u8], at: usize) -> ImageId {
    ImageId(le_u32(msg, at))
}

pub(crate) fn coordinate_pixels(rect: Rect) -> Vec<u8> {
    let mut out = Vec::with_capacity(rect.byte_len());
    for y in rect.min.y..rect.max.y {
        for x in rect.min.x..rect.max.x {
            out.extend_from_slice(&[x as u8, y as u8, 0x80, 0xFF]);
        }
    }
    out
}

pub(crate) fn point_at(msg: &[u8], at: usize) -> Point {
    Point::new(le_u32(msg, at) as i32, le_u32(msg, at + 4) as i32)
}

impl Write for MockChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(io::Error::other("device gone"));
        }
        if buf.first() == Some(&b'b') && state.reject_image_allocs {
            return Err(io::Error::other("out of image memory"));
        }
        if buf.first() == Some(&b'A') {
            let slot = le_u32(buf, 1);
            if state.reject_all_screens || state.rejected_slots.contains(&slot) {
                return Err(io::Error::other("screen slot in use"));
            }
        }
        if buf.first() == Some(&b'r') {
            let mut reply = coordinate_pixels(rect_at(buf, 5));
            if state.short_reads {
                reply.truncate(reply.len() / 2);
            }
            state.replies.push_back(reply);
        }
        state.writes.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for MockChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        match state.replies.pop_front() {
            Some(reply) => {
                let n = reply.len().min(buf.len());
                buf[..n].copy_from_slice(&reply[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }
}
