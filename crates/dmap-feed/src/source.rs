//! Ticker source abstraction.

use async_trait::async_trait;
use dmap_core::RawTicker;

use crate::error::FeedResult;

/// Anything that can produce the current ticker list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_tickers(&self) -> FeedResult<Vec<RawTicker>>;
}

/// Source that always returns the same tickers.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    tickers: Vec<RawTicker>,
}

impl StaticSource {
    pub fn new(tickers: Vec<RawTicker>) -> Self {
        Self { tickers }
    }
}

#[async_trait]
impl MarketDataSource for StaticSource {
    async fn fetch_tickers(&self) -> FeedResult<Vec<RawTicker>> {
        Ok(self.tickers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;

    #[test]
    fn test_static_source_returns_tickers() {
        let source = StaticSource::new(vec![RawTicker {
            symbol: "BTCUSDT".to_string(),
            ..Default::default()
        }]);
        let tickers = tokio_test::block_on(source.fetch_tickers()).unwrap();
        assert_eq!(tickers.len(), 1);
        assert_eq!(tickers[0].symbol, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_mock_source_through_trait_object() {
        let mut mock = MockMarketDataSource::new();
        mock.expect_fetch_tickers()
            .times(1)
            .returning(|| Err(FeedError::HttpClient("connection refused".to_string())));

        let source: Box<dyn MarketDataSource> = Box::new(mock);
        let err = source.fetch_tickers().await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
