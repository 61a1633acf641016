use std::path::PathBuf;

use tokio::time::Duration;

use crate::fetch::{CALL_TIMEOUT, REFRESH_CONCURRENCY_LIMIT, TWSE_ENDPOINT};

pub mod loader;
pub mod validator;

pub use loader::{load_settings, DEFAULT_SETTINGS_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Demo,
    Twse,
}

impl SourceKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "demo" => Some(SourceKind::Demo),
            "twse" => Some(SourceKind::Twse),
            _ => None,
        }
    }
}

/// Runtime settings for the monitor.
#[derive(Debug, Clone)]
pub struct Settings {
    pub refresh_interval: Duration,
    pub concurrency_limit: usize,
    pub call_timeout: Duration,
    pub watchlist_file: PathBuf,
    /// CSV catalog replacing the embedded one.
    pub catalog_file: Option<PathBuf>,
    pub source: SourceKind,
    pub twse_endpoint: String,
    /// Tiles shown in the heatmap.
    pub heatmap_size: usize,
    /// Rows listed for a single industry.
    pub industry_top: usize,
    pub auto_refresh: bool,
    /// Refresh every catalog symbol alongside the watchlist so rankings have prices.
    pub track_catalog: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60),
            concurrency_limit: REFRESH_CONCURRENCY_LIMIT,
            call_timeout: CALL_TIMEOUT,
            watchlist_file: PathBuf::from("watchlist.json"),
            catalog_file: None,
            source: SourceKind::Demo,
            twse_endpoint: TWSE_ENDPOINT.to_string(),
            heatmap_size: 30,
            industry_top: 10,
            auto_refresh: false,
            track_catalog: true,
        }
    }
}

impl Settings {
    /// Log file used while the dashboard owns the terminal.
    pub fn log_file(&self) -> PathBuf {
        self.watchlist_file.with_file_name("stock-watch.log")
    }
}
