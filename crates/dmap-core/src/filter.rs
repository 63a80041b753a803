//! Filter engine.
//!
//! Evaluation order per record: blacklist, numeric ranges, search term.
//! A record must pass every criterion; there is no partial scoring.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::snapshot::AssetSnapshot;

/// User-selected numeric ranges.
///
/// All intervals are closed. `volume_max == 0` means no upper bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterRanges {
    pub volume_min: f64,
    pub volume_max: f64,
    pub price_change_min: f64,
    pub price_change_max: f64,
    pub volatility_min: f64,
    pub volatility_max: f64,
}

impl Default for FilterRanges {
    fn default() -> Self {
        Self {
            volume_min: 0.0,
            volume_max: 0.0,
            price_change_min: -100.0,
            price_change_max: 100.0,
            volatility_min: 0.0,
            volatility_max: 100.0,
        }
    }
}

impl FilterRanges {
    /// Check a snapshot against all six bounds.
    pub fn contains(&self, snapshot: &AssetSnapshot) -> bool {
        let volume = snapshot.volume_24h;
        let volume_ok =
            volume >= self.volume_min && (self.volume_max == 0.0 || volume <= self.volume_max);

        volume_ok
            && (self.price_change_min..=self.price_change_max)
                .contains(&snapshot.price_change_24h_pct)
            && (self.volatility_min..=self.volatility_max).contains(&snapshot.volatility_24h_pct)
    }

    /// Correct out-of-domain bounds in place, returning the names of the corrected fields.
    ///
    /// - non-finite values revert to their defaults
    /// - volume and volatility bounds are floored at zero
    /// - inverted intervals are swapped (the volume sentinel is left alone)
    ///
    /// Price-change bounds are deliberately not clamped to +/-100.
    pub fn sanitize(&mut self) -> Vec<&'static str> {
        let defaults = Self::default();
        let mut corrected = Vec::new();

        for (name, value, default) in [
            ("volumeMin", &mut self.volume_min, defaults.volume_min),
            ("volumeMax", &mut self.volume_max, defaults.volume_max),
            ("priceChangeMin", &mut self.price_change_min, defaults.price_change_min),
            ("priceChangeMax", &mut self.price_change_max, defaults.price_change_max),
            ("volatilityMin", &mut self.volatility_min, defaults.volatility_min),
            ("volatilityMax", &mut self.volatility_max, defaults.volatility_max),
        ] {
            if !value.is_finite() {
                *value = default;
                corrected.push(name);
            }
        }

        for (name, value) in [
            ("volumeMin", &mut self.volume_min),
            ("volumeMax", &mut self.volume_max),
            ("volatilityMin", &mut self.volatility_min),
            ("volatilityMax", &mut self.volatility_max),
        ] {
            if *value < 0.0 {
                *value = 0.0;
                corrected.push(name);
            }
        }

        if self.volume_max != 0.0 && self.volume_min > self.volume_max {
            std::mem::swap(&mut self.volume_min, &mut self.volume_max);
            corrected.push("volume");
        }
        if self.price_change_min > self.price_change_max {
            std::mem::swap(&mut self.price_change_min, &mut self.price_change_max);
            corrected.push("priceChange");
        }
        if self.volatility_min > self.volatility_max {
            std::mem::swap(&mut self.volatility_min, &mut self.volatility_max);
            corrected.push("volatility");
        }

        corrected
    }
}

/// Complete filter input for one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    ranges: FilterRanges,
    /// Trimmed, upper-cased search token.
    search_term: String,
    blacklist: BTreeSet<String>,
    /// Quote suffix used to match display symbols against the blacklist.
    quote_suffix: String,
}

impl FilterCriteria {
    pub fn new<I, S>(ranges: FilterRanges, search_term: &str, blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ranges,
            search_term: search_term.trim().to_uppercase(),
            blacklist: blacklist
                .into_iter()
                .map(|s| s.as_ref().trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            quote_suffix: String::new(),
        }
    }

    /// Also match blacklist entries against the symbol with `suffix` stripped.
    #[must_use]
    pub fn with_quote_suffix(mut self, suffix: &str) -> Self {
        self.quote_suffix = suffix.trim().to_uppercase();
        self
    }

    pub fn ranges(&self) -> &FilterRanges {
        &self.ranges
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn blacklist(&self) -> &BTreeSet<String> {
        &self.blacklist
    }

    pub fn is_blacklisted(&self, snapshot: &AssetSnapshot) -> bool {
        self.blacklist.contains(&snapshot.symbol)
            || (!self.quote_suffix.is_empty()
                && self
                    .blacklist
                    .contains(snapshot.display_symbol(&self.quote_suffix)))
    }

    pub fn matches_search(&self, snapshot: &AssetSnapshot) -> bool {
        self.search_term.is_empty() || snapshot.symbol.to_uppercase().contains(&self.search_term)
    }

    /// Full predicate in engine order.
    pub fn matches(&self, snapshot: &AssetSnapshot) -> bool {
        !self.is_blacklisted(snapshot)
            && self.ranges.contains(snapshot)
            && self.matches_search(snapshot)
    }
}

/// Apply `criteria` to `snapshots`, preserving input order.
pub fn apply(snapshots: &[AssetSnapshot], criteria: &FilterCriteria) -> Vec<AssetSnapshot> {
    snapshots
        .iter()
        .filter(|s| criteria.matches(s))
        .cloned()
        .collect()
}
