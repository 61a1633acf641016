use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stock-watch")]
#[command(about = "Watch a list of Taiwan-listed stocks and rank their industries")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Settings file (JSON)
    #[arg(short, long, default_value = crate::config::DEFAULT_SETTINGS_PATH)]
    pub config: PathBuf,

    /// Watchlist file, overriding the settings
    #[arg(short, long)]
    pub watchlist: Option<PathBuf>,

    /// Quote source: demo or twse
    #[arg(short, long)]
    pub source: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Open the live dashboard (default)
    Monitor {
        /// Start with automatic refresh switched on
        #[arg(long)]
        auto: bool,

        /// Seconds between automatic refreshes
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Refresh the watchlist once and print the quotes
    Refresh {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Add symbols to the watchlist
    Add {
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Remove symbols from the watchlist
    Remove {
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Show the watched symbols
    List,

    /// Rank symbols by simulated market cap after one refresh
    Top {
        /// Industry to rank; omit (or pass "all") for the whole catalog
        #[arg(long)]
        industry: Option<String>,

        #[arg(short, default_value_t = 10)]
        n: usize,
    },

    /// Search the catalog by code or name
    Search {
        keyword: String,

        #[arg(long)]
        industry: Option<String>,
    },

    /// List catalog industries
    Industries,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Monitor {
            auto: false,
            interval: None,
        })
    }
}
