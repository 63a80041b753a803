//! User settings for the density map.
//!
//! Two records are persisted: [`Settings`] (update cadence, display options,
//! blacklist) and [`FilterPreferences`] (numeric ranges and search term).
//! Both go through the same [`ConfigModel`] lifecycle:
//!
//! ```text
//! load ──▶ live ──stage(patch)──▶ candidate ──commit──▶ live + store + subscribers
//!                  reset() ─────▶ candidate (defaults)
//! store changed externally ──reload──▶ live + subscribers
//! ```

pub mod error;
pub mod filters;
pub mod model;
pub mod record;
pub mod settings;
pub mod store;
pub mod watcher;

pub use error::{SettingsError, SettingsResult};
pub use filters::{FilterPatch, FilterPreferences};
pub use model::ConfigModel;
pub use record::ConfigRecord;
pub use settings::{ChartTimeframe, DataUpdateMode, OrderType, Settings, SettingsPatch};
pub use store::{FileStore, MemoryStore, SettingsStore};
pub use watcher::watch_store;

/// Model for the main settings record.
pub type SettingsModel = ConfigModel<Settings>;
/// Model for the persisted filter preferences.
pub type FilterModel = ConfigModel<FilterPreferences>;
