// Application error types
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A required credential or setting is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The speech service call failed or returned no usable audio.
    #[error("speech service error: {0}")]
    Upstream(String),

    /// Malformed base64 or audio payload.
    #[error("audio decode error: {0}")]
    Decode(String),

    /// Audio device or playback failures.
    #[error("audio playback error: {0}")]
    Playback(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
