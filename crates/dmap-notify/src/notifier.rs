//! Outbound message seam.

use async_trait::async_trait;

use crate::error::DeliveryResult;

/// Delivers a text message to a destination (chat id, channel, ...).
///
/// Implementations do not retry; failures go back to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, destination_id: &str, text: &str) -> DeliveryResult<()>;
}
