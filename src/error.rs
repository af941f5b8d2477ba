//! Error types for the Floodgate service.

use thiserror::Error;

use crate::store::StoreError;

/// Main error type for Floodgate operations.
///
/// These surface at startup (bad configuration, unreachable backend, failed
/// bind). Once the server is up, storage failures are absorbed by the
/// limiter's fail-open policy and never reach this type.
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Counter storage errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;
