//! Demo client configuration.

use std::path::Path;

use devdraw_core::{Color, DevicePaths};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the demo client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DemoConfig {
    /// Device file locations.
    pub devices: DevicePaths,
    /// Scene settings.
    pub scene: SceneConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// What the demo draws.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Edge length of the square gradient texture, in pixels.
    pub texture_size: i32,
    /// Rotation of the second texture copy, in degrees.
    pub rotation_degrees: f64,
    /// Window background.
    pub background: Color,
    /// Colour of the translucent overlay band.
    pub overlay: Color,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is unset.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            texture_size: 96,
            rotation_degrees: 30.0,
            background: Color::rgba(0xEE, 0xEE, 0xDD, 0xFF),
            overlay: Color::rgba(0x00, 0x30, 0x60, 0x60),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl DemoConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

// ── Tests ────────────────────────────────────────────────────────
