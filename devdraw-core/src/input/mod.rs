//! Input devices: mouse and keyboard records, host window geometry,
//! and the events they turn into.

pub mod event;
pub mod keyboard;
pub mod mouse;
pub mod wctl;

pub use event::{Button, Direction, Event, KeyEvent, MouseEvent};
pub use keyboard::KeyboardTranslator;
pub use mouse::{ButtonMask, MouseRecord, MouseTranslator};
pub use wctl::{DeviceHost, HostWindow, frame_from, parse_frame, read_frame, read_window_name};
