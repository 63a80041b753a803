//! Persisted record contract.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A configuration record that lives under one key in a [`SettingsStore`](crate::SettingsStore).
pub trait ConfigRecord:
    Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Store key.
    const KEY: &'static str;

    /// Partial update accepted by [`ConfigModel::stage`](crate::ConfigModel::stage).
    type Patch;

    fn apply_patch(&mut self, patch: Self::Patch);

    /// Correct invalid values to the nearest valid ones.
    ///
    /// Returns the names of corrected fields.
    fn sanitize(&mut self) -> Vec<&'static str>;
}
