//! Device paths and host-window tuning.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the driver finds the draw device and its companion files.
///
/// `{n}` in the channel templates is replaced with the connection
/// index, `{pid}` with the current process id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicePaths {
    /// Opening this allocates a new connection and yields its control string.
    pub draw_new: PathBuf,
    /// Data channel of an open connection.
    pub draw_data: String,
    /// Open-file table listing the transfer unit of each descriptor.
    pub fd_table: String,
    /// Host window geometry.
    pub wctl: PathBuf,
    /// Name of the host window image.
    pub winname: PathBuf,
    /// Mouse record stream.
    pub mouse: PathBuf,
    /// Keyboard record stream.
    pub keyboard: PathBuf,
    /// Pixels removed from every side of the host geometry for the
    /// window manager's border.
    pub border_inset: i32,
}

impl Default for DevicePaths {
    fn default() -> Self {
        Self {
            draw_new: "/dev/draw/new".into(),
            draw_data: "/dev/draw/{n}/data".into(),
            fd_table: "/proc/{pid}/fd".into(),
            wctl: "/dev/wctl".into(),
            winname: "/dev/winname".into(),
            mouse: "/dev/mouse".into(),
            keyboard: "/dev/kbd".into(),
            border_inset: 4,
        }
    }
}

impl DevicePaths {
    pub fn data_path(&self, conn: i32) -> String {
        self.draw_data.replace("{n}", &conn.to_string())
    }

    pub fn fd_table_path(&self) -> String {
        self.fd_table
            .replace("{pid}", &std::process::id().to_string())
    }
}
