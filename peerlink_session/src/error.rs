//! Session-specific error types

use peerlink_config::ConfigError;
use peerlink_core::{ChannelError, ChannelErrorKind};
use thiserror::Error;

/// Session-specific errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// Framed channel error
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Connection could not be established
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Loading or saving a payload failed
    #[error("Payload store error: {0}")]
    Store(#[from] std::io::Error),

    /// A text payload was not valid UTF-8
    #[error("Payload is not valid UTF-8: {0}")]
    InvalidText(#[from] std::str::Utf8Error),

    /// Message handler error
    #[error("Handler error: {0}")]
    Handler(String),

    /// Receive loop task panicked or was aborted
    #[error("Receive task failed: {0}")]
    TaskFailed(String),

    /// Receive loop was already joined
    #[error("Receive loop already joined")]
    AlreadyJoined,
}

impl SessionError {
    /// Channel error kind, if this error came from the channel
    pub fn channel_kind(&self) -> Option<ChannelErrorKind> {
        match self {
            SessionError::Channel(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Session result type
pub type Result<T> = std::result::Result<T, SessionError>;
