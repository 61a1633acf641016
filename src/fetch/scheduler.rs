use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use log::{debug, info, warn};
use tokio::sync::{watch, Semaphore};
use tokio::time::{timeout, Duration};

use crate::catalog::SymbolCatalog;
use crate::error::AppError;

use super::{
    ensure_concurrency_limit, Quote, QuoteCache, QuoteSource, QuoteStatus, CALL_TIMEOUT,
    REFRESH_CONCURRENCY_LIMIT,
};

/// Result of one completed refresh cycle, as handed to subscribers.
#[derive(Debug, Clone)]
pub struct RefreshSnapshot {
    pub cycle: u64,
    pub completed_at: DateTime<Local>,
    pub quotes: Vec<Quote>,
}

impl RefreshSnapshot {
    fn initial() -> Self {
        Self {
            cycle: 0,
            completed_at: Local::now(),
            quotes: Vec::new(),
        }
    }

    pub fn count(&self, status: QuoteStatus) -> usize {
        self.quotes.iter().filter(|q| q.status == status).count()
    }
}

/// Fetches quotes for a set of symbols with bounded concurrency and merges them into the cache.
pub struct FetchScheduler {
    source: Arc<dyn QuoteSource>,
    cache: QuoteCache,
    catalog: Arc<SymbolCatalog>,
    concurrency_limit: usize,
    call_timeout: Duration,
    progress_counter: Arc<AtomicUsize>,
    progress_total: AtomicUsize,
    cycles: AtomicU64,
    updates_tx: watch::Sender<Arc<RefreshSnapshot>>,
}

impl FetchScheduler {
    pub fn new(source: Arc<dyn QuoteSource>, cache: QuoteCache, catalog: Arc<SymbolCatalog>) -> Self {
        let (updates_tx, _) = watch::channel(Arc::new(RefreshSnapshot::initial()));
        Self {
            source,
            cache,
            catalog,
            concurrency_limit: REFRESH_CONCURRENCY_LIMIT,
            call_timeout: CALL_TIMEOUT,
            progress_counter: Arc::new(AtomicUsize::new(0)),
            progress_total: AtomicUsize::new(0),
            cycles: AtomicU64::new(0),
            updates_tx,
        }
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = ensure_concurrency_limit(limit);
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Receiver that yields the snapshot of every completed cycle.
    pub fn subscribe(&self) -> watch::Receiver<Arc<RefreshSnapshot>> {
        self.updates_tx.subscribe()
    }

    /// (completed, total) for the cycle in progress, or the last one.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.progress_counter.load(Ordering::SeqCst),
            self.progress_total.load(Ordering::SeqCst),
        )
    }

    /// Fetch every distinct symbol once, at most `concurrency_limit` at a time.
    ///
    /// Always returns one quote per distinct input symbol in input order; failures are
    /// recorded in the quote status and never abort the rest of the batch.
    pub async fn refresh(&self, symbols: &[String], concurrency_limit: usize) -> Vec<Quote> {
        let limit = ensure_concurrency_limit(concurrency_limit);
        let mut seen = HashSet::new();
        let batch: Vec<String> = symbols
            .iter()
            .filter(|symbol| seen.insert(symbol.as_str()))
            .cloned()
            .collect();

        let semaphore = Arc::new(Semaphore::new(limit));
        self.progress_counter.store(0, Ordering::SeqCst);
        self.progress_total.store(batch.len(), Ordering::SeqCst);

        let mut results: Vec<(usize, Quote)> = stream::iter(batch.into_iter().enumerate())
            .map(|(index, symbol)| {
                let semaphore = Arc::clone(&semaphore);
                async move {
                    let quote = match semaphore.acquire().await {
                        Ok(_permit) => self.fetch_one(&symbol).await,
                        Err(_) => self.record(&symbol, QuoteStatus::Failed),
                    };
                    self.progress_counter.fetch_add(1, Ordering::SeqCst);
                    (index, quote)
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        let quotes: Vec<Quote> = results.into_iter().map(|(_, quote)| quote).collect();
        self.publish(&quotes);
        quotes
    }

    /// `refresh` using the configured concurrency limit.
    pub async fn refresh_all(&self, symbols: &[String]) -> Vec<Quote> {
        self.refresh(symbols, self.concurrency_limit).await
    }

    async fn fetch_one(&self, symbol: &str) -> Quote {
        let call = AssertUnwindSafe(self.source.fetch(symbol)).catch_unwind();
        match timeout(self.call_timeout, call).await {
            Ok(Ok(Ok(data))) => self.cache.record_success(symbol, data, Local::now()),
            Ok(Ok(Err(err))) if err.is_not_found() => {
                debug!("{} does not know {symbol}", self.source.name());
                self.record(symbol, QuoteStatus::NotFound)
            }
            Ok(Ok(Err(err))) => {
                warn!("fetch for {symbol} failed: {err}");
                self.record(symbol, QuoteStatus::Failed)
            }
            Ok(Err(_)) => {
                warn!("quote source panicked while fetching {symbol}");
                self.record(symbol, QuoteStatus::Failed)
            }
            Err(_) => {
                let err = AppError::Timeout {
                    symbol: symbol.to_string(),
                    millis: self.call_timeout.as_millis(),
                };
                warn!("{err}");
                self.record(symbol, QuoteStatus::Failed)
            }
        }
    }

    fn record(&self, symbol: &str, status: QuoteStatus) -> Quote {
        let name = self.catalog.name_of(symbol).unwrap_or(symbol);
        self.cache.record_failure(symbol, status, name, Local::now())
    }

    fn publish(&self, quotes: &[Quote]) {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = RefreshSnapshot {
            cycle,
            completed_at: Local::now(),
            quotes: quotes.to_vec(),
        };
        info!(
            "refresh cycle {} via {}: {} ok, {} not found, {} failed",
            cycle,
            self.source.name(),
            snapshot.count(QuoteStatus::Success),
            snapshot.count(QuoteStatus::NotFound),
            snapshot.count(QuoteStatus::Failed),
        );
        self.updates_tx.send_replace(Arc::new(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{Behavior, ScriptedSource};

    fn scheduler(source: Arc<ScriptedSource>) -> FetchScheduler {
        let catalog = Arc::new(SymbolCatalog::builtin().expect("catalog"));
        FetchScheduler::new(source, QuoteCache::new(), catalog)
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn mixed_outcomes_keep_one_quote_per_symbol() {
        let source = Arc::new(
            ScriptedSource::new()
                .with("2330", Behavior::Price(940.0, 1000))
                .with("9999", Behavior::NotFound),
        );
        let scheduler = scheduler(Arc::clone(&source));

        let quotes = scheduler.refresh(&symbols(&["2330", "9999"]), 10).await;

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].symbol, "2330");
        assert_eq!(quotes[0].status, QuoteStatus::Success);
        assert_eq!(quotes[0].price, Some(940.0));
        assert_eq!(quotes[1].symbol, "9999");
        assert_eq!(quotes[1].status, QuoteStatus::NotFound);
        assert_eq!(quotes[1].price, None);
        assert_eq!(scheduler.cache().get("2330").unwrap().price, Some(940.0));
    }

    #[tokio::test]
    async fn errors_and_panics_do_not_abort_siblings() {
        let source = Arc::new(
            ScriptedSource::new()
                .with("ABC", Behavior::Error)
                .with("BOOM", Behavior::Panic)
                .with("2330", Behavior::Price(940.0, 1))
                .with("2454", Behavior::Price(1100.0, 2)),
        );
        let scheduler = scheduler(source);

        let quotes = scheduler
            .refresh(&symbols(&["ABC", "2330", "BOOM", "2454"]), 2)
            .await;

        let status: Vec<QuoteStatus> = quotes.iter().map(|q| q.status).collect();
        assert_eq!(
            status,
            vec![
                QuoteStatus::Failed,
                QuoteStatus::Success,
                QuoteStatus::Failed,
                QuoteStatus::Success
            ]
        );
    }

    #[tokio::test]
    async fn returns_exactly_one_quote_per_distinct_symbol() {
        let source = Arc::new(ScriptedSource::new().default_behavior(Behavior::Error));
        let scheduler = scheduler(Arc::clone(&source));
        let input: Vec<String> = (0..25).map(|i| format!("S{i}")).collect();

        for limit in [1, 3, 10, 50] {
            let quotes = scheduler.refresh(&input, limit).await;
            assert_eq!(quotes.len(), input.len());
            for (quote, symbol) in quotes.iter().zip(&input) {
                assert_eq!(&quote.symbol, symbol);
            }
        }

        let mut dupes = symbols(&["A", "B", "A"]);
        dupes.push("B".to_string());
        assert_eq!(scheduler.refresh(&dupes, 4).await.len(), 2);
    }

    #[tokio::test]
    async fn never_exceeds_concurrency_limit() {
        for limit in [1, 2, 5] {
            let source = Arc::new(
                ScriptedSource::new()
                    .default_behavior(Behavior::Price(10.0, 1))
                    .with_delay(Duration::from_millis(15)),
            );
            let scheduler = scheduler(Arc::clone(&source));
            let input: Vec<String> = (0..12).map(|i| format!("S{i}")).collect();

            scheduler.refresh(&input, limit).await;

            assert!(source.max_in_flight() <= limit, "limit {limit} exceeded");
            assert!(source.max_in_flight() >= 1);
            assert_eq!(source.calls(), 12);
        }
    }

    #[tokio::test]
    async fn zero_limit_is_clamped_to_one() {
        let source = Arc::new(
            ScriptedSource::new()
                .default_behavior(Behavior::Price(1.0, 1))
                .with_delay(Duration::from_millis(5)),
        );
        let scheduler = scheduler(Arc::clone(&source));
        let quotes = scheduler.refresh(&symbols(&["A", "B", "C"]), 0).await;
        assert_eq!(quotes.len(), 3);
        assert_eq!(source.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn hung_call_times_out_as_failed() {
        let source = Arc::new(
            ScriptedSource::new()
                .with("SLOW", Behavior::Hang)
                .with("2330", Behavior::Price(940.0, 1)),
        );
        let scheduler = scheduler(source).with_call_timeout(Duration::from_millis(50));

        let quotes = scheduler.refresh(&symbols(&["SLOW", "2330"]), 2).await;

        assert_eq!(quotes[0].status, QuoteStatus::Failed);
        assert_eq!(quotes[1].status, QuoteStatus::Success);
    }

    #[tokio::test]
    async fn failure_after_success_keeps_last_price() {
        let source = Arc::new(ScriptedSource::new().with("2330", Behavior::Price(940.0, 5)));
        let scheduler = scheduler(Arc::clone(&source));
        scheduler.refresh(&symbols(&["2330"]), 1).await;

        source.set("2330", Behavior::Error);
        let quotes = scheduler.refresh(&symbols(&["2330"]), 1).await;

        assert_eq!(quotes[0].status, QuoteStatus::Failed);
        assert_eq!(quotes[0].price, Some(940.0));
        assert_eq!(quotes[0].name, "2330 Co");
        assert!(quotes[0].priced_at.unwrap() <= quotes[0].fetched_at);
    }

    #[tokio::test]
    async fn publishes_snapshot_to_subscribers() {
        let source = Arc::new(ScriptedSource::new().with("2330", Behavior::Price(940.0, 5)));
        let scheduler = scheduler(source);
        let mut rx = scheduler.subscribe();
        assert_eq!(rx.borrow().cycle, 0);

        scheduler.refresh(&symbols(&["2330"]), 1).await;

        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.cycle, 1);
        assert_eq!(snapshot.quotes.len(), 1);
        assert_eq!(snapshot.count(QuoteStatus::Success), 1);
        assert_eq!(scheduler.progress(), (1, 1));
    }

    #[tokio::test]
    async fn empty_batch_still_publishes() {
        let source = Arc::new(ScriptedSource::new());
        let scheduler = scheduler(Arc::clone(&source));
        let rx = scheduler.subscribe();
        let quotes = scheduler.refresh(&[], 10).await;
        assert!(quotes.is_empty());
        assert_eq!(rx.borrow().cycle, 1);
        assert_eq!(source.calls(), 0);
    }
}
