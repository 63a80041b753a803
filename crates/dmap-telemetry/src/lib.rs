//! Prometheus metrics and structured logging for the density map.
//!
//! - Refresh cycle counters and latency
//! - Scheduler state gauge
//! - Notification delivery outcomes
//! - Structured logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{encode_text, Metrics};
