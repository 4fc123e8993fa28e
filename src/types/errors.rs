//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the relay.
#[derive(Error, Debug)]
pub enum Error {
    /// Settings bag could not be turned into a valid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A nested options bag or reserved property had an unexpected shape.
    ///
    /// Never escapes the translator: callers log it and omit the data.
    #[error("decode error: {0}")]
    Decode(String),

    /// The vendor client rejected a call. Propagated unchanged, never retried.
    #[error("vendor error: {0}")]
    Vendor(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn vendor(msg: impl Into<String>) -> Self {
        Self::Vendor(msg.into())
    }
}
