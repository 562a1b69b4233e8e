//! Error types for deduplog
//!
//! Errors raised by the wrapped sink never appear here: they travel through
//! the decorator untouched via [`Sink::Error`](crate::sink::Sink::Error).

use thiserror::Error;

/// Result type alias for deduplog
pub type Result<T> = std::result::Result<T, Error>;

/// deduplog errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No async runtime available to host the background sweeper
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
