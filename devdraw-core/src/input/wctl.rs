//! Host window geometry.
//!
//! The window-control file starts with four whitespace-separated
//! integers, the host window's `x0 y0 x1 y1`, followed by state words
//! this driver ignores. The file never reaches end of file: a second
//! read blocks until the window changes, so it is read exactly once.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::DevicePaths;
use crate::error::DrawError;
use crate::geometry::Rect;

/// Bytes requested from the window-control file in one read.
const WCTL_READ_LEN: usize = 1024;

// ── HostWindow ───────────────────────────────────────────────────

/// The host window the driver draws into.
///
/// Both values change when the host window is resized, so they are
/// queried again on every reattach.
pub trait HostWindow: Send + Sync {
    /// Name of the host window's image, bound to image id 0 on attach.
    fn window_name(&self) -> Result<Vec<u8>, DrawError>;

    /// Drawable area of the host window in screen coordinates.
    fn frame(&self) -> Result<Rect, DrawError>;
}

/// A [`HostWindow`] backed by the window-system files.
#[derive(Debug, Clone)]
pub struct DeviceHost {
    wctl: PathBuf,
    winname: PathBuf,
    inset: i32,
}

impl DeviceHost {
    pub fn new(paths: &DevicePaths) -> Self {
        Self {
            wctl: paths.wctl.clone(),
            winname: paths.winname.clone(),
            inset: paths.border_inset,
        }
    }
}

impl HostWindow for DeviceHost {
    fn window_name(&self) -> Result<Vec<u8>, DrawError> {
        read_window_name(&self.winname)
    }

    fn frame(&self) -> Result<Rect, DrawError> {
        read_frame(&self.wctl, self.inset)
    }
}

// ── Parsing ──────────────────────────────────────────────────────

/// Parse the frame rectangle, shrunk by `inset` on every side.
pub fn parse_frame(text: &str, inset: i32) -> Result<Rect, DrawError> {
    let fields: Vec<&str> = text.split_whitespace().take(4).collect();
    if fields.len() < 4 {
        return Err(DrawError::InvalidRecord(format!(
            "window geometry has {} fields, need 4: {text:?}",
            fields.len()
        )));
    }
    let mut v = [0i32; 4];
    for (slot, f) in v.iter_mut().zip(&fields) {
        *slot = f
            .parse()
            .map_err(|e| DrawError::InvalidRecord(format!("window geometry {f:?}: {e}")))?;
    }
    Ok(Rect::new(v[0], v[1], v[2], v[3]).inset(inset))
}

/// Read and parse the frame from the window-control file.
pub fn read_frame(path: &Path, inset: i32) -> Result<Rect, DrawError> {
    let mut file = File::open(path)?;
    frame_from(&mut file, inset)
}

/// Parse the frame from a single read of `src`.
pub fn frame_from(src: &mut impl Read, inset: i32) -> Result<Rect, DrawError> {
    let mut buf = [0u8; WCTL_READ_LEN];
    let n = src.read(&mut buf)?;
    parse_frame(&String::from_utf8_lossy(&buf[..n]), inset)
}

/// Read the host window's image name, trimmed of trailing whitespace.
pub fn read_window_name(path: &Path) -> Result<Vec<u8>, DrawError> {
    let mut name = fs::read(path)?;
    while name.last().is_some_and(|b| b.is_ascii_whitespace() || *b == 0) {
        name.pop();
    }
    if name.is_empty() {
        return Err(DrawError::Protocol(format!(
            "{} holds no window name",
            path.display()
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_with_border() {
        let text = "          10          20         810         620 current visible";
        assert_eq!(parse_frame(text, 4).unwrap(), Rect::new(14, 24, 806, 616));
        assert_eq!(parse_frame(text, 0).unwrap(), Rect::new(10, 20, 810, 620));
    }

    #[test]
    fn short_or_garbled_frame() {
        assert!(parse_frame("1 2 3", 4).is_err());
        assert!(parse_frame("1 2 three 4", 4).is_err());
        assert!(parse_frame("", 4).is_err());
    }

    /// Hands out one geometry line, then behaves like a control file
    /// with nothing new to report.
    struct LiveWctl(Option<&'static [u8]>);

    impl Read for LiveWctl {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.take() {
                Some(line) => {
                    buf[..line.len()].copy_from_slice(line);
                    Ok(line.len())
                }
                None => Err(std::io::Error::new(
                    std::io::ErrorKind::WouldBlock,
                    "no geometry change",
                )),
            }
        }
    }

    #[test]
    fn frame_needs_only_one_read() {
        let mut src = LiveWctl(Some(b"0 0 200 100 current visible"));
        assert_eq!(frame_from(&mut src, 4).unwrap(), Rect::new(4, 4, 196, 96));
        assert!(frame_from(&mut src, 4).is_err());
    }

    #[test]
    fn window_files_on_disk() {
        let dir = std::env::temp_dir().join(format!("devdraw-wctl-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let wctl = dir.join("wctl");
        fs::write(&wctl, "0 0 100 80 current visible").unwrap();
        assert_eq!(read_frame(&wctl, 4).unwrap(), Rect::new(4, 4, 96, 76));

        let winname = dir.join("winname");
        fs::write(&winname, "window.3.9\n").unwrap();
        assert_eq!(read_window_name(&winname).unwrap(), b"window.3.9");
        fs::write(&winname, "").unwrap();
        assert!(read_window_name(&winname).is_err());

        let host = DeviceHost {
            wctl,
            winname: winname.clone(),
            inset: 0,
        };
        assert_eq!(host.frame().unwrap(), Rect::new(0, 0, 100, 80));
        assert!(host.window_name().is_err());

        assert!(read_frame(&dir.join("missing"), 4).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }
}
