use log::info;

use crate::app::state::MonitorState;
use crate::catalog::is_all_sentinel;
use crate::cli::Commands;
use crate::error::{Context, Result};
use crate::ui::{report, run_dashboard};

/// Runs one command against a prepared [`MonitorState`].
pub struct AppController {
    state: MonitorState,
}

impl AppController {
    pub fn new(state: MonitorState) -> Self {
        Self { state }
    }

    pub async fn run(self, command: Commands) -> Result<()> {
        match command {
            Commands::Monitor { .. } => self.monitor().await,
            Commands::Refresh { json } => self.refresh(json).await,
            Commands::Add { symbols } => {
                self.add(&symbols);
                Ok(())
            }
            Commands::Remove { symbols } => {
                self.remove(&symbols);
                Ok(())
            }
            Commands::List => {
                self.list();
                Ok(())
            }
            Commands::Top { industry, n } => self.top(industry.as_deref(), n).await,
            Commands::Search { keyword, industry } => {
                self.search(&keyword, industry.as_deref());
                Ok(())
            }
            Commands::Industries => {
                self.industries();
                Ok(())
            }
        }
    }

    async fn monitor(&self) -> Result<()> {
        let timer = self.state.timer();
        if self.state.settings().auto_refresh {
            timer.enable(self.state.settings().refresh_interval);
        } else {
            // Fill the board once so it does not open empty.
            let _ = timer.trigger_manual()?;
        }

        info!(
            "Dashboard started with {} watched symbols",
            self.state.watchlist().len()
        );
        let outcome = tokio::task::block_in_place(|| run_dashboard(&self.state));
        timer.disable();
        outcome
    }

    async fn refresh(&self, json: bool) -> Result<()> {
        let symbols = self.state.watchlist().all();
        if symbols.is_empty() {
            println!("Watchlist is empty. Add symbols with `stock-watch add <SYMBOL>`.");
            return Ok(());
        }

        let quotes = self.state.timer().refresh_symbols(&symbols).await?;
        if json {
            let body =
                serde_json::to_string_pretty(&quotes).context("Failed to serialize quotes")?;
            println!("{body}");
        } else {
            println!("{}", report::quotes_table(&quotes));
        }
        Ok(())
    }

    fn add(&self, symbols: &[String]) {
        for raw in symbols {
            match self.state.add_symbol(raw) {
                Ok(update) => {
                    let name = self.state.catalog().name_of(&update.symbol).unwrap_or("?");
                    if update.changed {
                        println!("Added {} ({})", update.symbol, name);
                    } else {
                        println!("{} is already watched", update.symbol);
                    }
                    if let Some(err) = update.save_error {
                        eprintln!("Warning: watchlist not saved: {err}");
                    }
                }
                Err(err) => eprintln!("Skipping `{raw}`: {err}"),
            }
        }
    }

    fn remove(&self, symbols: &[String]) {
        for raw in symbols {
            match self.state.remove_symbol(raw) {
                Ok(update) => {
                    if update.changed {
                        println!("Removed {}", update.symbol);
                    } else {
                        println!("{} was not watched", update.symbol);
                    }
                    if let Some(err) = update.save_error {
                        eprintln!("Warning: watchlist not saved: {err}");
                    }
                }
                Err(err) => eprintln!("Skipping `{raw}`: {err}"),
            }
        }
    }

    fn list(&self) {
        let symbols = self.state.watchlist().all();
        if symbols.is_empty() {
            println!("Watchlist is empty.");
            return;
        }

        let catalog = self.state.catalog();
        let rows: Vec<Vec<String>> = symbols
            .iter()
            .map(|symbol| {
                vec![
                    symbol.clone(),
                    catalog.name_of(symbol).unwrap_or("-").to_string(),
                    catalog.industry_of(symbol).unwrap_or("-").to_string(),
                ]
            })
            .collect();
        println!("{}", report::render_table(&["Symbol", "Name", "Industry"], &rows));
        println!("{} symbols in {}", symbols.len(), self.state.watchlist().path().display());
    }

    async fn top(&self, industry: Option<&str>, n: usize) -> Result<()> {
        let catalog = self.state.catalog();
        let pool: Vec<String> = catalog
            .pool(industry)
            .into_iter()
            .map(|entry| entry.symbol.clone())
            .collect();
        if pool.is_empty() {
            match industry {
                Some(name) if !is_all_sentinel(name) => {
                    println!("Unknown industry `{name}`. Run `stock-watch industries`.")
                }
                _ => println!("The catalog is empty."),
            }
            return Ok(());
        }

        self.state.timer().refresh_symbols(&pool).await?;
        let ranked = self.state.top_n(industry, n);
        println!("{}", report::ranked_table(&ranked));
        Ok(())
    }

    fn search(&self, keyword: &str, industry: Option<&str>) {
        let catalog = self.state.catalog();
        let hits = self.state.search(keyword, industry);
        if hits.is_empty() {
            println!("No symbols match `{keyword}`.");
            return;
        }

        let rows: Vec<(&str, _)> = hits
            .into_iter()
            .map(|entry| {
                let group = industry
                    .filter(|name| !is_all_sentinel(name))
                    .or_else(|| catalog.industry_of(&entry.symbol))
                    .unwrap_or("-");
                (group, entry)
            })
            .collect();
        println!("{}", report::entries_table(&rows));
    }

    fn industries(&self) {
        let catalog = self.state.catalog();
        let rows: Vec<Vec<String>> = catalog
            .industries()
            .into_iter()
            .map(|industry| {
                vec![
                    industry.to_string(),
                    catalog.symbols_in(industry).len().to_string(),
                ]
            })
            .collect();
        println!("{}", report::render_table(&["Industry", "Symbols"], &rows));
    }
}
