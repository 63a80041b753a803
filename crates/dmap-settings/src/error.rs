//! Settings error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;
