use crate::error::{AppError, Result};

use super::Settings;

/// Check settings and report every problem at once.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    let mut issues = Vec::new();

    validate_timing(settings, &mut issues);
    validate_limits(settings, &mut issues);
    validate_paths(settings, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "settings invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_timing(settings: &Settings, issues: &mut Vec<String>) {
    if settings.refresh_interval.is_zero() {
        issues.push("refresh_interval_secs must be at least 1".to_string());
    }
    if settings.call_timeout.is_zero() {
        issues.push("call_timeout_secs must be at least 1".to_string());
    }
}

fn validate_limits(settings: &Settings, issues: &mut Vec<String>) {
    if settings.concurrency_limit == 0 {
        issues.push("concurrency_limit must be at least 1".to_string());
    }
    if settings.heatmap_size == 0 {
        issues.push("heatmap_size must be at least 1".to_string());
    }
    if settings.industry_top == 0 {
        issues.push("industry_top must be at least 1".to_string());
    }
}

fn validate_paths(settings: &Settings, issues: &mut Vec<String>) {
    if settings.watchlist_file.as_os_str().is_empty() {
        issues.push("watchlist_file must not be empty".to_string());
    }
    if settings.twse_endpoint.trim().is_empty() {
        issues.push("twse_endpoint must not be empty".to_string());
    }
    if let Some(catalog) = &settings.catalog_file {
        if !catalog.exists() {
            issues.push(format!("catalog file not found: {}", catalog.display()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    #[test]
    fn defaults_are_valid() {
        validate_settings(&Settings::default()).expect("defaults should validate");
    }

    #[test]
    fn aggregates_every_issue() {
        let settings = Settings {
            concurrency_limit: 0,
            heatmap_size: 0,
            refresh_interval: Duration::ZERO,
            ..Settings::default()
        };

        let message = validate_settings(&settings).unwrap_err().to_string();
        assert!(message.contains("concurrency_limit"), "{message}");
        assert!(message.contains("heatmap_size"), "{message}");
        assert!(message.contains("refresh_interval_secs"), "{message}");
    }

    #[test]
    fn call_timeout_may_outlast_the_interval() {
        let settings = Settings {
            refresh_interval: Duration::from_secs(5),
            call_timeout: Duration::from_secs(30),
            ..Settings::default()
        };
        validate_settings(&settings).expect("long timeouts are allowed");
    }

    #[test]
    fn rejects_missing_catalog_file() {
        let settings = Settings {
            catalog_file: Some("no/such/catalog.csv".into()),
            ..Settings::default()
        };
        let message = validate_settings(&settings).unwrap_err().to_string();
        assert!(message.contains("catalog file not found"), "{message}");
    }
}
