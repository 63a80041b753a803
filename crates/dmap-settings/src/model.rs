//! Live configuration model.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::SettingsResult;
use crate::record::ConfigRecord;
use crate::store::SettingsStore;

/// Holds the live value of one record and fans changes out to subscribers.
///
/// The live value changes only through [`commit`](Self::commit) or
/// [`reload`](Self::reload). Staged candidates are plain values owned by the
/// caller until committed.
pub struct ConfigModel<T: ConfigRecord> {
    store: Arc<dyn SettingsStore>,
    tx: watch::Sender<T>,
}

impl<T: ConfigRecord> ConfigModel<T> {
    /// Load the stored record merged over defaults.
    ///
    /// Never fails: a missing, unreadable or corrupt record yields defaults.
    pub fn load(store: Arc<dyn SettingsStore>) -> Self {
        let initial = read_or_default::<T>(store.as_ref());
        let (tx, _rx) = watch::channel(initial);
        Self { store, tx }
    }

    /// Parse a raw stored value and correct out-of-range fields.
    pub fn decode(raw: &str) -> SettingsResult<T> {
        let mut value: T = serde_json::from_str(raw)?;
        let corrected = value.sanitize();
        if !corrected.is_empty() {
            warn!(key = T::KEY, ?corrected, "Stored record corrected");
        }
        Ok(value)
    }

    /// Snapshot of the live value.
    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every commit and reload.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Candidate built from the live value plus `patch`. Live value is untouched.
    pub fn stage(&self, patch: T::Patch) -> T {
        let mut candidate = self.current();
        candidate.apply_patch(patch);
        let corrected = candidate.sanitize();
        if !corrected.is_empty() {
            warn!(key = T::KEY, ?corrected, "Staged values corrected");
        }
        candidate
    }

    /// Defaults as a candidate. Nothing is persisted until committed.
    pub fn reset(&self) -> T {
        T::default()
    }

    /// Replace the live value, notify subscribers, then persist.
    ///
    /// The live value is applied even if persisting fails; the store error is
    /// returned so the caller can surface it.
    pub fn commit(&self, mut candidate: T) -> SettingsResult<()> {
        let corrected = candidate.sanitize();
        if !corrected.is_empty() {
            warn!(key = T::KEY, ?corrected, "Committed values corrected");
        }

        let raw = serde_json::to_string(&candidate)?;
        self.tx.send_replace(candidate);

        match self.store.write(T::KEY, &raw) {
            Ok(()) => {
                info!(key = T::KEY, "Settings committed");
                Ok(())
            }
            Err(e) => {
                warn!(key = T::KEY, error = %e, "Settings applied but not persisted");
                Err(e)
            }
        }
    }

    /// Re-read the store and publish the stored value if it differs from the live one.
    ///
    /// Only a record that decodes is applied; a missing, corrupt or unreadable
    /// record keeps the live value. Returns whether subscribers were notified.
    /// Does not write.
    pub fn reload(&self) -> bool {
        let stored = match self.store.read(T::KEY) {
            Ok(Some(raw)) => match Self::decode(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        key = T::KEY,
                        error = %e,
                        "Stored record is corrupt, keeping live value"
                    );
                    return false;
                }
            },
            Ok(None) => {
                debug!(key = T::KEY, "Stored record removed, keeping live value");
                return false;
            }
            Err(e) => {
                warn!(
                    key = T::KEY,
                    error = %e,
                    "Store unreadable, keeping live value"
                );
                return false;
            }
        };
        let changed = self.tx.send_if_modified(|live| {
            if *live == stored {
                false
            } else {
                *live = stored;
                true
            }
        });
        if changed {
            info!(key = T::KEY, "Settings reloaded from store");
        }
        changed
    }

    pub fn store(&self) -> &Arc<dyn SettingsStore> {
        &self.store
    }
}

fn read_or_default<T: ConfigRecord>(store: &dyn SettingsStore) -> T {
    match store.read(T::KEY) {
        Ok(Some(raw)) => match ConfigModel::<T>::decode(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = T::KEY, error = %e, "Stored record is corrupt, using defaults");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key = T::KEY, error = %e, "Store unreadable, using defaults");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettingsError;
    use crate::settings::{DataUpdateMode, Settings, SettingsPatch};
    use crate::store::MemoryStore;
    use std::time::SystemTime;

    fn memory() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    struct BrokenStore;

    impl SettingsStore for BrokenStore {
        fn read(&self, _key: &str) -> SettingsResult<Option<String>> {
            Err(SettingsError::Io(std::io::Error::other("disk gone")))
        }
        fn write(&self, _key: &str, _value: &str) -> SettingsResult<()> {
            Err(SettingsError::Io(std::io::Error::other("read-only")))
        }
        fn remove(&self, _key: &str) -> SettingsResult<()> {
            Ok(())
        }
        fn modified(&self, _key: &str) -> Option<SystemTime> {
            None
        }
    }

    #[test]
    fn test_load_missing_is_default() {
        let model = ConfigModel::<Settings>::load(memory());
        assert_eq!(model.current(), Settings::default());
    }

    #[test]
    fn test_load_corrupt_is_default() {
        let store = memory();
        store.write(Settings::KEY, "{not json").unwrap();
        let model = ConfigModel::<Settings>::load(store);
        assert_eq!(model.current(), Settings::default());
    }

    #[test]
    fn test_load_unreadable_is_default() {
        let model = ConfigModel::<Settings>::load(Arc::new(BrokenStore));
        assert_eq!(model.current(), Settings::default());
    }

    #[test]
    fn test_load_merges_partial_record() {
        let store = memory();
        store
            .write(Settings::KEY, r#"{"dataUpdateInterval":30,"maxOrders":500}"#)
            .unwrap();
        let model = ConfigModel::<Settings>::load(store);
        let live = model.current();
        assert_eq!(live.data_update_interval, 30);
        assert_eq!(live.max_orders, 100);
        assert_eq!(live.chart_candles, Settings::default().chart_candles);
    }

    #[test]
    fn test_stage_does_not_touch_live() {
        let model = ConfigModel::<Settings>::load(memory());
        let candidate = model.stage(SettingsPatch {
            data_update_interval: Some(1),
            ..Default::default()
        });
        assert_eq!(candidate.data_update_interval, 5);
        assert_eq!(model.current(), Settings::default());
    }

    #[test]
    fn test_commit_persists_and_notifies() {
        let store = memory();
        let model = ConfigModel::<Settings>::load(store.clone());
        let mut rx = model.subscribe();

        let candidate = model.stage(SettingsPatch {
            data_update: Some(DataUpdateMode::Manual),
            ..Default::default()
        });
        model.commit(candidate).unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().data_update, DataUpdateMode::Manual);

        let raw = store.read(Settings::KEY).unwrap().unwrap();
        assert!(raw.contains("\"dataUpdate\":\"manual\""));

        let again = ConfigModel::<Settings>::load(store);
        assert_eq!(again.current().data_update, DataUpdateMode::Manual);
    }

    #[test]
    fn test_commit_applies_even_when_persist_fails() {
        let model = ConfigModel::<Settings>::load(Arc::new(BrokenStore));
        let candidate = model.current().with_blacklisted("DOGEUSDT");
        let result = model.commit(candidate);
        assert!(matches!(result, Err(SettingsError::Io(_))));
        assert!(model.current().blacklist.contains("DOGEUSDT"));
    }

    #[test]
    fn test_reset_returns_defaults_without_persisting() {
        let store = memory();
        let model = ConfigModel::<Settings>::load(store.clone());
        model
            .commit(model.current().with_blacklisted("BTC"))
            .unwrap();

        let defaults = model.reset();
        assert_eq!(defaults, Settings::default());
        assert!(model.current().blacklist.contains("BTC"));
        assert!(store.read(Settings::KEY).unwrap().unwrap().contains("BTC"));
    }

    #[test]
    fn test_reload_picks_up_external_write() {
        let store = memory();
        let model = ConfigModel::<Settings>::load(store.clone());
        let mut rx = model.subscribe();

        assert!(!model.reload());
        assert!(!rx.has_changed().unwrap());

        store
            .write(Settings::KEY, r#"{"dataUpdateInterval":60}"#)
            .unwrap();
        assert!(model.reload());
        assert_eq!(rx.borrow_and_update().data_update_interval, 60);

        assert!(!model.reload());
    }

    #[test]
    fn test_reload_keeps_live_on_corrupt_record() {
        let store = memory();
        let model = ConfigModel::<Settings>::load(store.clone());
        model
            .commit(model.current().with_blacklisted("ETHUSDT"))
            .unwrap();
        let mut rx = model.subscribe();

        store.write(Settings::KEY, "{corrupt").unwrap();
        assert!(!model.reload());
        assert!(!rx.has_changed().unwrap());
        assert!(model.current().blacklist.contains("ETHUSDT"));

        store.remove(Settings::KEY).unwrap();
        assert!(!model.reload());
        assert!(model.current().blacklist.contains("ETHUSDT"));
    }

    #[test]
    fn test_reload_keeps_live_when_store_unreadable() {
        let model = ConfigModel::<Settings>::load(Arc::new(BrokenStore));
        let _ = model.commit(model.current().with_blacklisted("ETHUSDT"));

        assert!(!model.reload());
        assert!(model.current().blacklist.contains("ETHUSDT"));
    }
}
