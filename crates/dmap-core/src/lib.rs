//! Core pipeline types for the density map.
//!
//! This crate holds the pure stages of one refresh cycle:
//! - `RawTicker` / `AssetSnapshot`: exchange payload and its parsed form
//! - `FilterCriteria`: blacklist, numeric ranges and search term
//! - `density`: composite score and classification bands
//! - `layout`: circular placement with injectable jitter
//!
//! Nothing here performs IO or touches shared state.

pub mod density;
pub mod error;
pub mod filter;
pub mod layout;
pub mod snapshot;

pub use density::{score, DensityBand, DensityScore};
pub use error::{CoreError, CoreResult};
pub use filter::{apply, FilterCriteria, FilterRanges};
pub use layout::{
    place, place_jittered, place_seeded, reference_rings, FixedJitter, JitterSource,
    LayoutPosition, NoJitter, Ring, RingKind, Viewport,
};
pub use snapshot::{parse_decimal, volatility_pct, AssetSnapshot, RawTicker};
