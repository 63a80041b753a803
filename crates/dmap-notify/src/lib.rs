//! Notification dispatch and the HTTP surface.
//!
//! Routes:
//! - `POST /api/notify`: forward `{destinationId, text}` to the messaging provider
//! - `GET /api/snapshot`: current presented set
//! - `POST /api/refresh`: explicit refresh
//! - `GET /metrics`: Prometheus text format

pub mod config;
pub mod error;
pub mod notifier;
pub mod server;
pub mod telegram;

pub use config::ServerConfig;
pub use error::{DeliveryError, DeliveryResult};
pub use notifier::Notifier;
pub use server::{create_router, run_server, AppState};
pub use telegram::{TelegramConfig, TelegramNotifier};
