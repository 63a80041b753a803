//! Main application orchestration.

use std::sync::Arc;

use dmap_feed::{BybitClient, MarketDataSource};
use dmap_notify::{run_server, AppState, TelegramNotifier};
use dmap_scheduler::{RefreshScheduler, SchedulerHandle};
use dmap_settings::{watch_store, FileStore, FilterModel, SettingsModel, SettingsStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
    source: Arc<dyn MarketDataSource>,
    settings: Arc<SettingsModel>,
    filters: Arc<FilterModel>,
    cancel: CancellationToken,
}

impl Application {
    /// Open the store and build the ticker client.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let source = Arc::new(BybitClient::new(&config.feed.client)?);
        Self::with_source(config, source)
    }

    /// Build with a caller-supplied ticker source.
    pub fn with_source(config: AppConfig, source: Arc<dyn MarketDataSource>) -> AppResult<Self> {
        let store: Arc<dyn SettingsStore> = Arc::new(FileStore::open(&config.store.dir)?);
        let settings = Arc::new(SettingsModel::load(Arc::clone(&store)));
        let filters = Arc::new(FilterModel::load(store));

        let live = settings.current();
        info!(
            store_dir = %config.store.dir,
            automatic = live.is_automatic(),
            interval_secs = live.update_interval().as_secs(),
            blacklisted = live.blacklist.len(),
            "Settings loaded"
        );

        Ok(Self {
            config,
            source,
            settings,
            filters,
            cancel: CancellationToken::new(),
        })
    }

    pub fn settings(&self) -> &Arc<SettingsModel> {
        &self.settings
    }

    pub fn filters(&self) -> &Arc<FilterModel> {
        &self.filters
    }

    /// Token that stops every task started by [`start`](Self::start).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn the scheduler, store watchers and HTTP server.
    pub fn start(&self) -> Running {
        let scheduler = RefreshScheduler::new(
            Arc::clone(&self.source),
            Arc::clone(&self.settings),
            Arc::clone(&self.filters),
            self.config.pipeline_options(),
        );
        let (handle, scheduler_task) = scheduler.spawn(self.cancel.clone());

        let period = self.config.store.watch_interval();
        let mut tasks = vec![
            tokio::spawn(watch_store(
                Arc::clone(&self.settings),
                period,
                self.cancel.clone(),
            )),
            tokio::spawn(watch_store(
                Arc::clone(&self.filters),
                period,
                self.cancel.clone(),
            )),
        ];

        if self.config.server.enabled {
            match self.spawn_server(handle.clone()) {
                Ok(task) => tasks.push(task),
                Err(e) => error!(error = %e, "HTTP server not started"),
            }
        } else {
            info!("HTTP server disabled");
        }

        Running {
            handle,
            scheduler_task,
            tasks,
        }
    }

    fn spawn_server(&self, scheduler: SchedulerHandle) -> AppResult<JoinHandle<()>> {
        let notifier = TelegramNotifier::new(&self.config.notify)?;
        if !notifier.has_token() {
            warn!("No bot token configured, notify requests will fail");
        }

        let state = AppState::new(Arc::new(notifier), scheduler);
        let server_config = self.config.server.clone();
        let cancel = self.cancel.clone();
        Ok(tokio::spawn(async move {
            if let Err(e) = run_server(state, server_config, cancel).await {
                error!(error = %e, "HTTP server failed");
            }
        }))
    }

    /// Run until ctrl-c, then tear everything down.
    pub async fn run(self) -> AppResult<()> {
        info!("Starting application");
        let running = self.start();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
            _ = self.cancel.cancelled() => info!("Cancelled"),
        }

        self.cancel.cancel();
        running.join().await;
        info!("Shutdown complete");
        Ok(())
    }
}

/// Tasks started by [`Application::start`].
pub struct Running {
    pub handle: SchedulerHandle,
    scheduler_task: JoinHandle<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl Running {
    /// Wait for every task to finish. Call after cancelling.
    pub async fn join(self) {
        if let Err(e) = self.scheduler_task.await {
            warn!(error = %e, "Scheduler task ended abnormally");
        }
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Task ended abnormally");
            }
        }
    }
}
