use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;
use tokio::time::Duration;

use crate::error::{AppError, Result};

use super::{validator, Settings, SourceKind};

pub const DEFAULT_SETTINGS_PATH: &str = "assets/configs/monitor.json";

/// Load settings from `path`, falling back to defaults when the file does not exist.
///
/// Relative file paths inside the JSON resolve against the directory holding it.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!("No settings at {}; using defaults", path.display());
            return Ok(Settings::default());
        }
        Err(err) => {
            return Err(AppError::message(format!(
                "failed to read settings at {}: {}",
                path.display(),
                err
            )))
        }
    };

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    parse_settings(&json, base).map_err(|err| {
        AppError::message(format!("invalid settings file {}: {}", path.display(), err))
    })
}

pub fn parse_settings(json: &str, base: &Path) -> Result<Settings> {
    let raw: RawSettings = serde_json::from_str(json)?;
    let settings = raw.into_settings(base)?;
    validator::validate_settings(&settings)?;
    Ok(settings)
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    #[serde(default)]
    refresh_interval_secs: Option<u64>,
    #[serde(default)]
    concurrency_limit: Option<usize>,
    #[serde(default)]
    call_timeout_secs: Option<u64>,
    #[serde(default)]
    watchlist_file: Option<String>,
    #[serde(default)]
    catalog_file: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    twse_endpoint: Option<String>,
    #[serde(default)]
    heatmap_size: Option<usize>,
    #[serde(default)]
    industry_top: Option<usize>,
    #[serde(default)]
    auto_refresh: Option<bool>,
    #[serde(default)]
    track_catalog: Option<bool>,
}

impl RawSettings {
    fn into_settings(self, base: &Path) -> Result<Settings> {
        let defaults = Settings::default();

        let source = match self.source {
            Some(value) => SourceKind::parse(&value).ok_or_else(|| {
                AppError::message(format!(
                    "unknown quote source `{value}` (expected `demo` or `twse`)"
                ))
            })?,
            None => defaults.source,
        };

        Ok(Settings {
            refresh_interval: self
                .refresh_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
            concurrency_limit: self.concurrency_limit.unwrap_or(defaults.concurrency_limit),
            call_timeout: self
                .call_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.call_timeout),
            watchlist_file: self
                .watchlist_file
                .map(|file| resolve(base, &file))
                .unwrap_or(defaults.watchlist_file),
            catalog_file: self.catalog_file.map(|file| resolve(base, &file)),
            source,
            twse_endpoint: self.twse_endpoint.unwrap_or(defaults.twse_endpoint),
            heatmap_size: self.heatmap_size.unwrap_or(defaults.heatmap_size),
            industry_top: self.industry_top.unwrap_or(defaults.industry_top),
            auto_refresh: self.auto_refresh.unwrap_or(defaults.auto_refresh),
            track_catalog: self.track_catalog.unwrap_or(defaults.track_catalog),
        })
    }
}

fn resolve(base: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
