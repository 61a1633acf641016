use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;
use tokio::time::Duration;

use crate::app::timer::{RefreshTimer, SymbolSupplier};
use crate::catalog::{CatalogEntry, SymbolCatalog};
use crate::config::{Settings, SourceKind};
use crate::error::Result;
use crate::fetch::{
    DemoQuoteSource, FetchScheduler, QuoteCache, QuoteSource, RefreshSnapshot, TwseQuoteSource,
};
use crate::records::{WatchlistStore, WatchlistUpdate};
use crate::view::{self, IndustryHeat, RankedEntry, RankingMetric, SimulatedMarketCap};

/// Simulated round trip for the offline source, so refresh progress is visible.
const DEMO_LATENCY: Duration = Duration::from_millis(40);

/// Runtime wiring shared by the one-shot commands and the dashboard.
pub struct MonitorState {
    settings: Settings,
    catalog: Arc<SymbolCatalog>,
    watchlist: Arc<WatchlistStore>,
    scheduler: Arc<FetchScheduler>,
    timer: RefreshTimer,
    metric: Arc<dyn RankingMetric>,
}

impl MonitorState {
    /// Build the catalog, quote source, and watchlist described by `settings`.
    pub fn new(settings: Settings) -> Result<Self> {
        let catalog = Arc::new(match &settings.catalog_file {
            Some(path) => SymbolCatalog::from_csv(path)?,
            None => SymbolCatalog::builtin()?,
        });
        info!(
            "Catalog ready: {} symbols in {} industries",
            catalog.len(),
            catalog.industries().len()
        );

        let source: Arc<dyn QuoteSource> = match settings.source {
            SourceKind::Demo => Arc::new(
                DemoQuoteSource::new(Arc::clone(&catalog)).with_latency(DEMO_LATENCY),
            ),
            SourceKind::Twse => Arc::new(TwseQuoteSource::new(
                settings.twse_endpoint.clone(),
                settings.call_timeout,
            )?),
        };

        let watchlist = Arc::new(WatchlistStore::open(settings.watchlist_file.clone()));
        Ok(Self::with_parts(settings, catalog, source, watchlist))
    }

    /// Assemble from already-built parts.
    pub fn with_parts(
        settings: Settings,
        catalog: Arc<SymbolCatalog>,
        source: Arc<dyn QuoteSource>,
        watchlist: Arc<WatchlistStore>,
    ) -> Self {
        let scheduler = Arc::new(
            FetchScheduler::new(source, QuoteCache::new(), Arc::clone(&catalog))
                .with_concurrency_limit(settings.concurrency_limit)
                .with_call_timeout(settings.call_timeout),
        );
        let timer = RefreshTimer::new(
            Arc::clone(&scheduler),
            cycle_symbols(&watchlist, &catalog, settings.track_catalog),
        );

        Self {
            settings,
            catalog,
            watchlist,
            scheduler,
            timer,
            metric: Arc::new(SimulatedMarketCap),
        }
    }

    pub fn with_metric(mut self, metric: Arc<dyn RankingMetric>) -> Self {
        self.metric = metric;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn catalog(&self) -> &SymbolCatalog {
        &self.catalog
    }

    pub fn watchlist(&self) -> &WatchlistStore {
        &self.watchlist
    }

    pub fn scheduler(&self) -> &FetchScheduler {
        &self.scheduler
    }

    pub fn cache(&self) -> &QuoteCache {
        self.scheduler.cache()
    }

    pub fn timer(&self) -> &RefreshTimer {
        &self.timer
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RefreshSnapshot>> {
        self.scheduler.subscribe()
    }

    /// Ranked view over the cache as it stands now.
    pub fn top_n(&self, industry: Option<&str>, n: usize) -> Vec<RankedEntry> {
        view::top_n(
            industry,
            n,
            self.cache(),
            &self.catalog,
            self.metric.as_ref(),
        )
    }

    pub fn industry_heat(&self) -> Vec<IndustryHeat> {
        view::industry_heat(self.cache(), &self.catalog)
    }

    pub fn search(&self, keyword: &str, industry: Option<&str>) -> Vec<&CatalogEntry> {
        self.catalog.search(keyword, industry)
    }

    pub fn add_symbol(&self, symbol: &str) -> Result<WatchlistUpdate> {
        let update = self.watchlist.add(symbol)?;
        if update.changed && !self.catalog.contains(&update.symbol) {
            warn!("{} is not in the catalog; watching it anyway", update.symbol);
        }
        Ok(update)
    }

    /// Drop `symbol` from the watchlist. Its cached quote goes too unless the catalog
    /// sweep still refreshes it.
    pub fn remove_symbol(&self, symbol: &str) -> Result<WatchlistUpdate> {
        let update = self.watchlist.remove(symbol)?;
        let swept = self.settings.track_catalog && self.catalog.contains(&update.symbol);
        if update.changed && !swept {
            let removed = update.symbol.as_str();
            self.cache().retain(|cached| cached != removed);
        }
        Ok(update)
    }
}

/// Watchlist first, then (optionally) the rest of the catalog. Read fresh every cycle.
fn cycle_symbols(
    watchlist: &Arc<WatchlistStore>,
    catalog: &Arc<SymbolCatalog>,
    track_catalog: bool,
) -> SymbolSupplier {
    let watchlist = Arc::clone(watchlist);
    let catalog = Arc::clone(catalog);
    Arc::new(move || {
        let mut symbols = watchlist.all();
        if track_catalog {
            symbols.extend(
                catalog
                    .all_symbols()
                    .into_iter()
                    .filter(|entry| !watchlist.contains(&entry.symbol))
                    .map(|entry| entry.symbol.clone()),
            );
        }
        symbols
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{Behavior, ScriptedSource};
    use crate::fetch::QuoteStatus;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static SCRATCH: AtomicUsize = AtomicUsize::new(0);

    fn scratch_file() -> PathBuf {
        let n = SCRATCH.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "stock-watch-state-{}-{}.json",
            std::process::id(),
            n
        ))
    }

    fn catalog() -> Arc<SymbolCatalog> {
        let csv = "industry,code,name\n半導體,2330,台積電\n半導體,2303,聯電\n金融,2881,富邦金\n";
        Arc::new(SymbolCatalog::from_reader(csv.as_bytes()).expect("catalog"))
    }

    fn state(source: Arc<ScriptedSource>, track_catalog: bool) -> MonitorState {
        let settings = Settings {
            track_catalog,
            ..Settings::default()
        };
        let watchlist = Arc::new(WatchlistStore::new(scratch_file()));
        MonitorState::with_parts(settings, catalog(), source, watchlist)
    }

    #[tokio::test]
    async fn cycle_covers_watchlist_only_without_catalog_tracking() {
        let source = Arc::new(ScriptedSource::new().default_behavior(Behavior::Price(10.0, 5)));
        let state = state(Arc::clone(&source), false);
        state.add_symbol("2330").expect("add");
        state.add_symbol("aapl").expect("add");

        let quotes = state.timer().refresh_now().await.expect("refresh");

        let symbols: Vec<&str> = quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["2330", "AAPL"]);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn catalog_tracking_feeds_the_ranking() {
        let source = Arc::new(
            ScriptedSource::new()
                .default_behavior(Behavior::Price(10.0, 5))
                .with("2330", Behavior::Price(940.0, 1000))
                .with("2881", Behavior::NotFound),
        );
        let state = state(Arc::clone(&source), true)
            .with_metric(Arc::new(|_: &str, quote: &crate::fetch::Quote| {
                quote.price.unwrap_or(0.0)
            }));
        state.add_symbol("2330").expect("add");

        let quotes = state.timer().refresh_now().await.expect("refresh");
        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[0].symbol, "2330");

        let ranked = state.top_n(None, 5);
        let order: Vec<&str> = ranked.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(order, vec!["2330", "2303", "2881"]);
        assert_eq!(ranked[2].derived_metric, 0.0);

        let semis = state.top_n(Some("半導體"), 1);
        assert_eq!(semis.len(), 1);
        assert_eq!(semis[0].price, Some(940.0));
    }

    #[tokio::test]
    async fn removing_untracked_symbol_drops_its_quote() {
        let source = Arc::new(ScriptedSource::new().default_behavior(Behavior::Price(3.0, 1)));
        let state = state(source, true);
        state.add_symbol("TSLA").expect("add");
        state.add_symbol("2330").expect("add");
        state.timer().refresh_now().await.expect("refresh");
        assert!(state.cache().get("TSLA").is_some());

        let update = state.remove_symbol("tsla").expect("remove");
        assert!(update.changed);
        assert!(state.cache().get("TSLA").is_none());

        state.remove_symbol("2330").expect("remove");
        let kept = state.cache().get("2330").expect("catalog symbol stays cached");
        assert_eq!(kept.status, QuoteStatus::Success);
    }

    #[tokio::test]
    async fn edits_during_a_cycle_wait_for_the_next_one() {
        let source = Arc::new(
            ScriptedSource::new()
                .default_behavior(Behavior::Price(10.0, 5))
                .with_delay(Duration::from_millis(60)),
        );
        let state = state(Arc::clone(&source), false);
        state.add_symbol("2330").expect("add");
        state.add_symbol("2303").expect("add");

        let handle = state.timer().trigger_manual().expect("trigger");
        for _ in 0..100 {
            if source.calls() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(source.calls() > 0, "cycle never started");
        state.add_symbol("2881").expect("add mid-cycle");
        state.remove_symbol("2303").expect("remove mid-cycle");

        let quotes = handle.await.expect("cycle completes");
        let fetched: Vec<&str> = quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(fetched, vec!["2303", "2330"]);
        assert_eq!(source.calls(), 2);

        let next = state.timer().refresh_now().await.expect("next cycle");
        let fetched: Vec<&str> = next.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(fetched, vec!["2330", "2881"]);
    }

    #[test]
    fn blank_symbol_is_rejected() {
        let source = Arc::new(ScriptedSource::new());
        let state = state(source, false);
        assert!(state.add_symbol("   ").is_err());
        assert!(state.watchlist().is_empty());
    }
}
