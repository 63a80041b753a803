//! Persisted filter preferences.

use std::collections::BTreeSet;

use dmap_core::{FilterCriteria, FilterRanges};
use serde::{Deserialize, Serialize};

use crate::record::ConfigRecord;

/// Numeric ranges and search term chosen in the filter panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterPreferences {
    #[serde(flatten)]
    pub ranges: FilterRanges,
    pub search_term: String,
}

impl FilterPreferences {
    /// Build the cycle's criteria, combining these preferences with the settings blacklist.
    pub fn criteria(&self, blacklist: &BTreeSet<String>, quote_suffix: &str) -> FilterCriteria {
        FilterCriteria::new(self.ranges.clone(), &self.search_term, blacklist)
            .with_quote_suffix(quote_suffix)
    }
}

/// Partial filter update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterPatch {
    pub volume_min: Option<f64>,
    pub volume_max: Option<f64>,
    pub price_change_min: Option<f64>,
    pub price_change_max: Option<f64>,
    pub volatility_min: Option<f64>,
    pub volatility_max: Option<f64>,
    pub search_term: Option<String>,
}

impl ConfigRecord for FilterPreferences {
    const KEY: &'static str = "coin-filters";
    type Patch = FilterPatch;

    fn apply_patch(&mut self, patch: FilterPatch) {
        let r = &mut self.ranges;
        for (slot, value) in [
            (&mut r.volume_min, patch.volume_min),
            (&mut r.volume_max, patch.volume_max),
            (&mut r.price_change_min, patch.price_change_min),
            (&mut r.price_change_max, patch.price_change_max),
            (&mut r.volatility_min, patch.volatility_min),
            (&mut r.volatility_max, patch.volatility_max),
        ] {
            if let Some(v) = value {
                *slot = v;
            }
        }
        if let Some(term) = patch.search_term {
            self.search_term = term;
        }
    }

    fn sanitize(&mut self) -> Vec<&'static str> {
        let mut corrected = self.ranges.sanitize();
        let trimmed = self.search_term.trim().to_uppercase();
        if trimmed != self.search_term {
            self.search_term = trimmed;
            corrected.push("searchTerm");
        }
        corrected
    }
}
