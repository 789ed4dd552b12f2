//! Configuration for ttyline sessions.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.ttyline/config.toml`
//! - Validation of the options a [`Session`](crate::Session) is built from
//!
//! # Configuration File
//!
//! ```toml
//! # Maximum length of a command line, terminator slot included
//! max_line_length = 128
//!
//! # Return "awaiting input" instead of blocking when no byte is available
//! non_blocking = false
//!
//! # Echo edited text back to the terminal
//! echo = true
//!
//! [history]
//! capacity = 50     # 0 disables history
//! shortcut = "!"    # "!!" recalls the newest line, "!N" line N
//!
//! [tab]
//! spaces = 4        # spaces inserted by TAB when no completer is installed
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{LineError, Result};

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Line capacity; one slot is reserved so at most `max_line_length - 1` bytes are editable
    pub max_line_length: usize,
    /// Non-blocking input
    pub non_blocking: bool,
    /// Echo enabled at startup
    pub echo: bool,
    /// History settings
    pub history: HistoryConfig,
    /// Tab key settings
    pub tab: TabConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_line_length: 128,
            non_blocking: false,
            echo: true,
            history: HistoryConfig::default(),
            tab: TabConfig::default(),
        }
    }
}

/// History configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub shortcut: Option<char>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            shortcut: Some('!'),
        }
    }
}

/// Tab configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabConfig {
    pub spaces: usize,
}

impl Default for TabConfig {
    fn default() -> Self {
        Self { spaces: 4 }
    }
}

impl Config {
    /// Load configuration from `~/.ttyline/config.toml`, falling back to defaults
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(LineError::ConfigRead)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get config file path
    pub fn get_config_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".ttyline").join("config.toml"))
    }

    /// Check the options a session cannot be built without
    pub fn validate(&self) -> Result<()> {
        if self.max_line_length == 0 {
            return Err(LineError::invalid(
                "the length of the command line must be greater than 0",
            ));
        }

        if let Some(shortcut) = self.history.shortcut {
            if shortcut == ' ' || shortcut == '\t' {
                return Err(LineError::invalid(format!(
                    "invalid history shortcut: blank characters (0x{:x}) are not allowed",
                    shortcut as u32
                )));
            }
            if !shortcut.is_ascii() || shortcut.is_ascii_control() {
                return Err(LineError::invalid(format!(
                    "invalid history shortcut {:?}: must be a printable ASCII character",
                    shortcut
                )));
            }
        }

        Ok(())
    }

    /// History shortcut as the byte compared against the line buffer
    pub(crate) fn shortcut_byte(&self) -> Option<u8> {
        // validate() guarantees ASCII
        self.history.shortcut.map(|c| c as u8)
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
