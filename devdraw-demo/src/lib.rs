//! # devdraw-demo: draw-device demo client
//!
//! Opens the current host window through `devdraw-core`, uploads a
//! gradient texture and repaints a small scene on every paint request.
//! Typing `q` or pressing the right button exits.

pub mod config;
pub mod scene;
