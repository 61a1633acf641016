use tokio::time::Duration;

use crate::app::{controller::AppController, state::MonitorState};
use crate::cli::{Cli, Commands};
use crate::config::{load_settings, validator, Settings, SourceKind};
use crate::error::{AppError, Result};

/// Load settings and fold the command-line overrides into them.
pub fn prepare(cli: &Cli) -> Result<(Settings, Commands)> {
    let command = cli.command();
    let mut settings = load_settings(&cli.config)?;

    if let Some(path) = &cli.watchlist {
        settings.watchlist_file = path.clone();
    }
    if let Some(source) = cli.source.as_deref() {
        settings.source = SourceKind::parse(source).ok_or_else(|| {
            AppError::message(format!(
                "unknown quote source `{source}` (expected `demo` or `twse`)"
            ))
        })?;
    }
    if let Commands::Monitor { auto, interval } = &command {
        settings.auto_refresh |= *auto;
        if let Some(secs) = interval {
            settings.refresh_interval = Duration::from_secs(*secs);
        }
    }

    validator::validate_settings(&settings)?;
    Ok((settings, command))
}

/// Entry point used by `main` once logging is up.
pub async fn run(settings: Settings, command: Commands) -> Result<()> {
    let state = MonitorState::new(settings)?;
    AppController::new(state).run(command).await
}
