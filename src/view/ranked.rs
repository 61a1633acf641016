use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog::SymbolCatalog;
use crate::fetch::{Quote, QuoteCache};

/// Ranking key supplied by the caller. Larger values rank first.
pub trait RankingMetric: Send + Sync {
    fn score(&self, symbol: &str, quote: &Quote) -> f64;
}

impl<F> RankingMetric for F
where
    F: Fn(&str, &Quote) -> f64 + Send + Sync,
{
    fn score(&self, symbol: &str, quote: &Quote) -> f64 {
        self(symbol, quote)
    }
}

/// Placeholder valuation: price times a made-up share count derived from the symbol.
///
/// The share count is seeded from the symbol so rankings are reproducible between runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedMarketCap;

impl SimulatedMarketCap {
    pub fn outstanding_shares(symbol: &str) -> u64 {
        let mut rng = StdRng::seed_from_u64(crate::fetch::demo::symbol_seed(symbol));
        rng.gen_range(50_000_000..=5_000_000_000)
    }
}

impl RankingMetric for SimulatedMarketCap {
    fn score(&self, symbol: &str, quote: &Quote) -> f64 {
        quote.price.unwrap_or(0.0) * Self::outstanding_shares(symbol) as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub symbol: String,
    pub name: String,
    pub price: Option<f64>,
    pub volume: Option<u64>,
    pub derived_metric: f64,
    pub change_pct: Option<f64>,
}

/// Rank the industry's symbols (or every catalog symbol) by `metric` and keep the first `n`.
///
/// Symbols without a cached price score 0 but stay in the ranking, always below every priced
/// symbol whatever sign the metric takes. Ties are broken by ascending symbol so the order is
/// deterministic.
pub fn top_n(
    industry: Option<&str>,
    n: usize,
    cache: &QuoteCache,
    catalog: &SymbolCatalog,
    metric: &dyn RankingMetric,
) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = catalog
        .pool(industry)
        .into_iter()
        .map(|candidate| {
            let quote = cache.get(&candidate.symbol);
            let priced = quote.as_deref().filter(|q| q.price.is_some());
            let score = priced
                .map(|q| metric.score(&candidate.symbol, q))
                .filter(|s| s.is_finite())
                .unwrap_or(0.0);
            RankedEntry {
                symbol: candidate.symbol.clone(),
                name: candidate.name.clone(),
                price: priced.and_then(|q| q.price),
                volume: priced.and_then(|q| q.volume),
                derived_metric: score,
                change_pct: priced.and_then(|q| q.change_pct()),
            }
        })
        .collect();

    entries.sort_by(compare_entries);
    entries.truncate(n);
    entries
}

fn compare_entries(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.price
        .is_some()
        .cmp(&a.price.is_some())
        .then_with(|| b.derived_metric.total_cmp(&a.derived_metric))
        .then_with(|| a.symbol.cmp(&b.symbol))
}
