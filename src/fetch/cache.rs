use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::RwLock;

use super::{Quote, QuoteStatus, SourceQuote};

/// Symbol → latest quote, shared between the fetch workers and every view.
///
/// Entries are swapped as whole `Arc<Quote>` values under the write lock, so a reader
/// either sees the previous quote or the new one.
#[derive(Clone, Default)]
pub struct QuoteCache {
    entries: Arc<RwLock<HashMap<String, Arc<Quote>>>>,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<Arc<Quote>> {
        self.entries.read().get(symbol).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Record a successful fetch, replacing whatever was cached.
    pub fn record_success(&self, symbol: &str, data: SourceQuote, at: DateTime<Local>) -> Quote {
        let quote = Quote::success(symbol, data, at);
        self.entries
            .write()
            .insert(symbol.to_string(), Arc::new(quote.clone()));
        quote
    }

    /// Record a failed fetch. A cached quote keeps its last price and only takes the new
    /// status and attempt time; otherwise an empty quote named `fallback_name` is stored.
    pub fn record_failure(
        &self,
        symbol: &str,
        status: QuoteStatus,
        fallback_name: &str,
        at: DateTime<Local>,
    ) -> Quote {
        let mut entries = self.entries.write();
        let quote = match entries.get(symbol) {
            Some(previous) => previous.degraded(status, at),
            None => Quote::missing(symbol, fallback_name, status, at),
        };
        entries.insert(symbol.to_string(), Arc::new(quote.clone()));
        quote
    }

    /// Drop entries for symbols no longer watched.
    pub fn retain(&self, keep: impl Fn(&str) -> bool) {
        self.entries.write().retain(|symbol, _| keep(symbol));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(price: f64) -> SourceQuote {
        SourceQuote {
            name: "TSMC".to_string(),
            price,
            volume: 10,
            prev_close: None,
        }
    }

    #[test]
    fn failure_after_success_keeps_stale_price() {
        let cache = QuoteCache::new();
        let first = Local::now();
        cache.record_success("2330", data(940.0), first);

        let later = first + chrono::Duration::seconds(60);
        let recorded = cache.record_failure("2330", QuoteStatus::Failed, "2330", later);

        assert_eq!(recorded.price, Some(940.0));
        assert_eq!(recorded.name, "TSMC");
        let cached = cache.get("2330").expect("cached");
        assert_eq!(cached.status, QuoteStatus::Failed);
        assert_eq!(cached.fetched_at, later);
        assert_eq!(cached.priced_at, Some(first));
    }

    #[test]
    fn failure_without_history_stores_empty_quote() {
        let cache = QuoteCache::new();
        let quote = cache.record_failure("9999", QuoteStatus::NotFound, "9999", Local::now());
        assert_eq!(quote.price, None);
        assert_eq!(cache.get("9999").unwrap().status, QuoteStatus::NotFound);
    }

    #[test]
    fn clones_share_entries() {
        let cache = QuoteCache::new();
        let view = cache.clone();
        cache.record_success("2454", data(1100.0), Local::now());
        assert_eq!(view.get("2454").unwrap().price, Some(1100.0));

        view.retain(|symbol| symbol != "2454");
        assert!(cache.is_empty());
    }
}
