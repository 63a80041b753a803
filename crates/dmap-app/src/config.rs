//! Application configuration.

use std::path::Path;
use std::time::Duration;

use dmap_core::Viewport;
use dmap_feed::BybitConfig;
use dmap_notify::{ServerConfig, TelegramConfig};
use dmap_scheduler::PipelineOptions;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Ticker feed section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(flatten)]
    pub client: BybitConfig,
    /// Cap on presented assets per cycle.
    #[serde(default = "default_max_assets")]
    pub max_assets: usize,
    /// Quote currency stripped from display symbols.
    #[serde(default = "default_quote_suffix")]
    pub quote_suffix: String,
}

fn default_max_assets() -> usize {
    100
}

fn default_quote_suffix() -> String {
    "USDT".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            client: BybitConfig::default(),
            max_assets: default_max_assets(),
            quote_suffix: default_quote_suffix(),
        }
    }
}

/// Settings store section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the persisted records.
    #[serde(default = "default_store_dir")]
    pub dir: String,
    /// How often the store is polled for changes by other instances (ms).
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
}

fn default_store_dir() -> String {
    "./data/settings".to_string()
}

fn default_watch_interval_ms() -> u64 {
    1_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            watch_interval_ms: default_watch_interval_ms(),
        }
    }
}

impl StoreConfig {
    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}

/// Layout surface section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_extent")]
    pub width: f64,
    #[serde(default = "default_extent")]
    pub height: f64,
    /// Fixed jitter seed for reproducible layouts.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_extent() -> f64 {
    800.0
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_extent(),
            height: default_extent(),
            seed: None,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub notify: TelegramConfig,
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::parse(&content)
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load_or_default(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate().map_err(AppError::Config)?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.feed.client.base_url.trim().is_empty() {
            return Err("feed.base_url must not be empty".to_string());
        }
        if self.feed.client.timeout_ms == 0 {
            return Err("feed.timeout_ms must be > 0".to_string());
        }
        if self.feed.max_assets == 0 {
            return Err("feed.max_assets must be > 0".to_string());
        }
        if self.store.dir.trim().is_empty() {
            return Err("store.dir must not be empty".to_string());
        }
        if self.store.watch_interval_ms == 0 {
            return Err("store.watch_interval_ms must be > 0".to_string());
        }
        Viewport::new(self.viewport.width, self.viewport.height)
            .map_err(|e| format!("viewport: {e}"))?;
        if self.server.enabled && self.server.port == 0 {
            return Err("server.port must be > 0".to_string());
        }
        Ok(())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            viewport: Viewport {
                width: self.viewport.width,
                height: self.viewport.height,
            },
            max_assets: self.feed.max_assets,
            quote_suffix: self.feed.quote_suffix.clone(),
            seed: self.viewport.seed,
        }
    }
}
