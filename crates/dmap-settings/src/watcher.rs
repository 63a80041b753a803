//! External change detection.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::model::ConfigModel;
use crate::record::ConfigRecord;
use crate::store::SettingsStore;

/// Modification time plus raw content of one record.
type Fingerprint = (Option<SystemTime>, Option<String>);

fn fingerprint(store: &dyn SettingsStore, key: &str) -> Fingerprint {
    (store.modified(key), store.read(key).ok().flatten())
}

/// Poll the store for `T::KEY` and reload `model` when the record changes.
///
/// A change is a new modification time or new content, so two writes
/// inside the filesystem's timestamp granularity are still told apart.
/// Lets a commit made by another instance sharing the same store reach this
/// instance's subscribers. Runs until `cancel` fires.
pub async fn watch_store<T: ConfigRecord>(
    model: Arc<ConfigModel<T>>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut last_seen = fingerprint(model.store().as_ref(), T::KEY);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately.
    ticker.tick().await;

    info!(key = T::KEY, period_ms = period.as_millis() as u64, "Store watcher started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let seen = fingerprint(model.store().as_ref(), T::KEY);
                if seen == last_seen {
                    continue;
                }
                last_seen = seen;
                let changed = model.reload();
                debug!(key = T::KEY, changed, "Store modification observed");
            }
        }
    }

    info!(key = T::KEY, "Store watcher stopped");
}
