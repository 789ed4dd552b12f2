//! Error types for the line editor

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("I/O error on byte channel: {0}")]
    Io(#[from] io::Error),

    #[error("Control message too long: {len} (max is {max})")]
    ControlMessageTooLong { len: usize, max: usize },

    #[error("Failed to read config file: {0}")]
    ConfigRead(#[source] io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl LineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LineError::InvalidConfiguration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, LineError>;
