//! Ticker parsing.
//!
//! The exchange reports every numeric field as a decimal string. Parsing is
//! lenient by contract: anything unparsable becomes `0.0` instead of an error.

use serde::{Deserialize, Serialize};

/// Raw linear-perpetual ticker as reported by the exchange.
///
/// Missing fields deserialize to empty strings, which parse to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTicker {
    pub symbol: String,
    #[serde(rename = "lastPrice")]
    pub last_price: String,
    #[serde(rename = "prevPrice24h")]
    pub prev_price_24h: String,
    #[serde(rename = "highPrice24h")]
    pub high_price_24h: String,
    #[serde(rename = "lowPrice24h")]
    pub low_price_24h: String,
    #[serde(rename = "turnover24h")]
    pub turnover_24h: String,
    /// Fractional change (`0.0123` = +1.23%).
    #[serde(rename = "price24hPcnt")]
    pub price_24h_pcnt: String,
}

/// One exchange-reported observation for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    /// Upper-case exchange symbol (e.g. `BTCUSDT`).
    pub symbol: String,
    /// Traded value over the trailing 24h. Never negative.
    pub volume_24h: f64,
    /// Signed percentage change over 24h. Not clamped.
    pub price_change_24h_pct: f64,
    /// `(high - low) / reference * 100`, zero when the reference is unusable.
    pub volatility_24h_pct: f64,
}

impl AssetSnapshot {
    pub fn new(
        symbol: impl AsRef<str>,
        volume_24h: f64,
        price_change_24h_pct: f64,
        volatility_24h_pct: f64,
    ) -> Self {
        Self {
            symbol: symbol.as_ref().trim().to_uppercase(),
            volume_24h,
            price_change_24h_pct,
            volatility_24h_pct,
        }
    }

    /// Parse a raw ticker.
    ///
    /// The volatility reference is the previous-24h price, falling back to
    /// the last price when the previous price is missing or zero.
    pub fn from_raw(raw: &RawTicker) -> Self {
        let last = parse_decimal(&raw.last_price);
        let prev = parse_decimal(&raw.prev_price_24h);
        let reference = if prev != 0.0 { prev } else { last };

        let high = parse_decimal(&raw.high_price_24h);
        let low = parse_decimal(&raw.low_price_24h);

        Self::new(
            &raw.symbol,
            parse_decimal(&raw.turnover_24h).max(0.0),
            parse_decimal(&raw.price_24h_pcnt) * 100.0,
            volatility_pct(high, low, reference),
        )
    }

    /// Symbol with the quote suffix stripped (`BTCUSDT` -> `BTC`).
    ///
    /// A symbol that consists only of the suffix is returned unchanged.
    pub fn display_symbol<'a>(&'a self, quote_suffix: &str) -> &'a str {
        match self.symbol.strip_suffix(quote_suffix) {
            Some(base) if !base.is_empty() => base,
            _ => &self.symbol,
        }
    }
}

/// Parse an exchange decimal string, treating failures and non-finite values as zero.
pub fn parse_decimal(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Intraday range as a percentage of `reference`.
///
/// Returns zero for a zero or non-finite reference, and never goes negative.
pub fn volatility_pct(high: f64, low: f64, reference: f64) -> f64 {
    if reference == 0.0 || !reference.is_finite() {
        return 0.0;
    }
    let pct = (high - low) / reference * 100.0;
    if pct.is_finite() {
        pct.max(0.0)
    } else {
        0.0
    }
}
