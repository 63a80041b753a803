//! Bybit v5 REST ticker client.
//!
//! `GET {base_url}/v5/market/tickers?category=linear`
//!
//! ```json
//! {"retCode":0,"retMsg":"OK","result":{"category":"linear","list":[{"symbol":"BTCUSDT",...}]}}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use dmap_core::RawTicker;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FeedError, FeedResult};
use crate::source::MarketDataSource;

/// Ticker client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BybitConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "https://api.bybit.com".to_string()
}

fn default_category() -> String {
    "linear".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            category: default_category(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    result: Option<TickerPage>,
}

#[derive(Debug, Deserialize)]
struct TickerPage {
    #[serde(default)]
    category: String,
    #[serde(default)]
    list: Vec<RawTicker>,
}

/// Decode a tickers response body.
pub fn parse_tickers(body: &str) -> FeedResult<Vec<RawTicker>> {
    let envelope: Envelope = serde_json::from_str(body)?;
    if envelope.ret_code != 0 {
        return Err(FeedError::Rejected {
            code: envelope.ret_code,
            message: envelope.ret_msg,
        });
    }
    let page = envelope
        .result
        .ok_or_else(|| FeedError::Malformed("missing result".to_string()))?;
    debug!(category = %page.category, count = page.list.len(), "Tickers decoded");
    Ok(page.list)
}

/// Client for the public tickers endpoint.
pub struct BybitClient {
    client: Client,
    url: String,
    category: String,
}

impl BybitClient {
    pub fn new(config: &BybitConfig) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| FeedError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/v5/market/tickers", config.base_url.trim_end_matches('/')),
            category: config.category.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MarketDataSource for BybitClient {
    async fn fetch_tickers(&self) -> FeedResult<Vec<RawTicker>> {
        debug!(url = %self.url, category = %self.category, "Fetching tickers");

        let response = self
            .client
            .get(&self.url)
            .query(&[("category", self.category.as_str())])
            .send()
            .await
            .map_err(|e| FeedError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FeedError::HttpClient(format!("Failed to read body: {e}")))?;

        if !status.is_success() {
            warn!(%status, "Ticker request failed");
            return Err(FeedError::HttpClient(format!("HTTP {status}: {body}")));
        }

        parse_tickers(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_envelope() {
        let body = r#"{
            "retCode": 0,
            "retMsg": "OK",
            "result": {
                "category": "linear",
                "list": [
                    {"symbol":"BTCUSDT","lastPrice":"64000","prevPrice24h":"63000",
                     "highPrice24h":"65000","lowPrice24h":"62000","turnover24h":"5000000000",
                     "price24hPcnt":"0.0158","bid1Price":"63999"},
                    {"symbol":"NEWUSDT"}
                ]
            },
            "time": 1700000000000
        }"#;
        let tickers = parse_tickers(body).unwrap();
        assert_eq!(tickers.len(), 2);
        assert_eq!(tickers[0].turnover_24h, "5000000000");
        assert_eq!(tickers[1].symbol, "NEWUSDT");
        assert!(tickers[1].last_price.is_empty());
    }

    #[test]
    fn test_parse_rejected() {
        let body = r#"{"retCode":10001,"retMsg":"params error","result":{}}"#;
        match parse_tickers(body) {
            Err(FeedError::Rejected { code, message }) => {
                assert_eq!(code, 10001);
                assert_eq!(message, "params error");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(parse_tickers("<html>"), Err(FeedError::Json(_))));
        assert!(matches!(
            parse_tickers(r#"{"retCode":0,"retMsg":"OK"}"#),
            Err(FeedError::Malformed(_))
        ));
    }

    #[test]
    fn test_url_normalized() {
        let client = BybitClient::new(&BybitConfig {
            base_url: "https://api.bybit.com/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.url(), "https://api.bybit.com/v5/market/tickers");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        let client = BybitClient::new(&BybitConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_ms: 2_000,
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            client.fetch_tickers().await,
            Err(FeedError::HttpClient(_))
        ));
    }
}
