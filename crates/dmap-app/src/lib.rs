//! Market density map service.
//!
//! Wires the components together:
//! - Settings and filter models over the on-disk store
//! - Ticker source and refresh scheduler
//! - Store watcher for changes made by other instances
//! - HTTP surface (notify, snapshot, refresh, metrics)

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, Running};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
