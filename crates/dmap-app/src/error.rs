//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] dmap_settings::SettingsError),

    #[error("Feed error: {0}")]
    Feed(#[from] dmap_feed::FeedError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] dmap_notify::DeliveryError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] dmap_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
