//! Error types for voice-arcade

use thiserror::Error;

/// Result type alias for voice-arcade operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in voice-arcade
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Device index that the host does not enumerate
    #[error("unknown audio device: {0}")]
    UnknownDevice(usize),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
