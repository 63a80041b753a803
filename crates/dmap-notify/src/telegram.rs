//! Telegram Bot API notifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{DeliveryError, DeliveryResult};
use crate::notifier::Notifier;

/// Environment variable consulted when no token is configured.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bot token. Falls back to `TELEGRAM_BOT_TOKEN`.
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            bot_token: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl TelegramConfig {
    /// Configured token, else the environment variable. Empty values count as unset.
    pub fn resolved_token(&self) -> Option<String> {
        self.bot_token
            .clone()
            .or_else(|| std::env::var(BOT_TOKEN_ENV).ok())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Sends messages through `POST {api_base}/bot{token}/sendMessage`.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> DeliveryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DeliveryError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.resolved_token(),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, destination_id: &str, text: &str) -> DeliveryResult<()> {
        let token = self.token.as_deref().ok_or(DeliveryError::MissingToken)?;
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);

        let body = SendMessage {
            chat_id: destination_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "Telegram API error");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(destination_id, "Message delivered");
        Ok(())
    }
}
