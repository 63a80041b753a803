//! Delivery error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Bot token not configured")]
    MissingToken,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Provider rejected message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;
