//! Error types for the canvas pipeline

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// Which of the two buffer streams an error refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    Values,
    Objects,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Values => f.write_str("value"),
            Stream::Objects => f.write_str("object"),
        }
    }
}

/// Recording errors.
///
/// Invalid drawing arguments are ignored rather than reported, so the
/// only failure a recorder can hit is running out of memory.
#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("command buffer {stream} stream could not grow by {additional}")]
    BufferExhausted {
        stream: Stream,
        additional: usize,
        #[source]
        source: TryReserveError,
    },
}

/// Errors raised while decoding a handed-off frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    #[error("unknown opcode {opcode} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("frame truncated at offset {offset}: {needed} more bytes needed")]
    Truncated { offset: usize, needed: usize },

    #[error("object {index} referenced but not present")]
    MissingObject { index: usize },

    #[error("expected {expected} object at offset {offset}")]
    ObjectMismatch {
        offset: usize,
        expected: &'static str,
    },

    #[error("invalid value {value} for opcode {opcode}")]
    InvalidValue { opcode: u8, value: i64 },
}

/// Errors parsing an SVG path string
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SvgPathError {
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("path data ended in the middle of a command")]
    UnexpectedEnd,

    #[error("path data must start with a moveto")]
    MissingMoveTo,

    #[error("malformed number at offset {offset}")]
    InvalidNumber { offset: usize },
}

/// Errors loading a surface configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, CanvasError>;
