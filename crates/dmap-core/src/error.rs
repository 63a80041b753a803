//! Error types for dmap-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("Invalid viewport: {0}")]
    InvalidViewport(String),
}

/// Result type alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
