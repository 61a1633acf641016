use std::fs::{self, OpenOptions};

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use stock_watch::app::bootstrap;
use stock_watch::cli::{Cli, Commands};
use stock_watch::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (settings, command) = bootstrap::prepare(&cli)?;
    init_logging(&settings, &command)?;

    bootstrap::run(settings, command).await?;
    Ok(())
}

/// `RUST_LOG` wins over the `info` default. The dashboard owns the terminal, so its logs go
/// to a file next to the watchlist.
fn init_logging(settings: &Settings, command: &Commands) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info).parse_default_env();

    if matches!(command, Commands::Monitor { .. }) {
        let path = settings.log_file();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}
