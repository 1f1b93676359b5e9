//! Configuration for the panelkit binary
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/panelkit/config.toml, or $PANELKIT_CONFIG)
//! 3. Built-in defaults (lowest priority)

use crate::layout::{LayoutSpec, Size};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod logging;
mod serialization;


pub use logging::{FileLogging, LogRotation, LoggingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_MOUNT: &str = "#app";
const DEFAULT_WIDTH: f64 = 1280.0;
const DEFAULT_HEIGHT: f64 = 800.0;

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Selector of the host element the root panel mounts under
    pub mount: String,

    /// Panel path to navigate to right after boot
    pub boot: Option<String>,

    /// Initial window size
    pub window: Size,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Declared layout nodes, parents first. Empty means the demo defaults.
    pub layouts: Vec<LayoutSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mount: DEFAULT_MOUNT.to_string(),
            boot: None,
            window: Size::new(DEFAULT_WIDTH, DEFAULT_HEIGHT),
            logging: LoggingConfig::default(),
            layouts: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Optional [window] section
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileWindow {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub mount: Option<String>,
    pub boot: Option<String>,

    /// Optional [window] section
    pub window: Option<FileWindow>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,

    /// Optional [[layouts]] entries
    #[serde(default)]
    pub layouts: Vec<LayoutSpec>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Get the config file path: $PANELKIT_CONFIG, else
    /// ~/.config/panelkit/config.toml. Uses Unix-style ~/.config on all
    /// platforms for consistency.
    pub fn config_path() -> Option<PathBuf> {
        env_var("PANELKIT_CONFIG").map(PathBuf::from).or_else(|| {
            dirs::home_dir().map(|p| p.join(".config").join("panelkit").join("config.toml"))
        })
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        // Config is optional; failing to write the template is not an error
        let _ = Self::write_template(&path);
    }

    /// Write the default config template to `path`, creating parent
    /// directories
    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        // Config::default().to_toml() is the single source of truth
        std::fs::write(path, Self::default().to_toml())
            .with_context(|| format!("writing {}", path.display()))
    }

    /// Load the file config if it exists.
    ///
    /// A file that exists but cannot be read or parsed is an error: a broken
    /// config should fail fast, not silently fall back to defaults.
    fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
        let Some(path) = path else {
            return Ok(FileConfig::default());
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => {
                Err(e).with_context(|| format!("cannot read config file {}", path.display()))
            }
        }
    }

    /// Load configuration: env vars > file > defaults
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let file = Self::load_file_config(path.as_deref())?;
        Ok(Self::resolve(file, env_var))
    }

    /// Merge a parsed file with an environment lookup
    pub(crate) fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let window = file.window.unwrap_or_default();

        // Window size: env > file > default. Unparseable env values are ignored.
        let width = env("PANELKIT_WIDTH")
            .and_then(|v| v.parse().ok())
            .or(window.width)
            .unwrap_or(defaults.window.width);
        let height = env("PANELKIT_HEIGHT")
            .and_then(|v| v.parse().ok())
            .or(window.height)
            .unwrap_or(defaults.window.height);

        // Log level: env > file > default
        let mut logging = LoggingConfig::from_file(file.logging);
        if let Some(level) = env("PANELKIT_LOG") {
            logging.level = level;
        }

        Self {
            mount: file.mount.unwrap_or(defaults.mount),
            boot: file.boot.filter(|path| !path.is_empty()),
            window: Size::new(width, height),
            logging,
            layouts: file.layouts,
        }
    }
}
