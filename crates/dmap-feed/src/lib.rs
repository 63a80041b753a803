//! Market data ingestion.
//!
//! [`MarketDataSource`] is the seam the refresh scheduler fetches through;
//! [`BybitClient`] implements it over the public linear tickers endpoint.

pub mod bybit;
pub mod error;
pub mod source;

pub use bybit::{BybitClient, BybitConfig};
pub use error::{FeedError, FeedResult};
pub use source::{MarketDataSource, StaticSource};
