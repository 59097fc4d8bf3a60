//! Error types for habit-chime

use thiserror::Error;

/// Result type alias for habit-chime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching, decoding or playing sound cues
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid sound theme name
    #[error("invalid sound theme: {0}")]
    Theme(String),

    /// Unknown sound event name
    #[error("unknown sound event: {0}")]
    UnknownEvent(String),

    /// Sound asset could not be fetched
    #[error("asset fetch failed: {0}")]
    Fetch(String),

    /// Sound asset could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Audio device or playback error
    #[error("audio error: {0}")]
    Audio(String),

    /// No async runtime available to run fetches on
    #[error("runtime error: {0}")]
    Runtime(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
