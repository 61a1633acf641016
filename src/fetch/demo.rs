use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{sleep, Duration};

use crate::catalog::SymbolCatalog;
use crate::error::AppError;

use super::{FetchResult, QuoteSource, SourceQuote};

/// Reference prices for the heavyweights; other catalog symbols get a seeded base.
const BASE_PRICES: &[(&str, f64)] = &[
    ("2330", 940.0),
    ("2454", 1100.0),
    ("1101", 48.0),
    ("3008", 28.0),
    ("1605", 68.0),
    ("2308", 89.0),
    ("2303", 45.0),
    ("3711", 560.0),
    ("2412", 35.0),
    ("9910", 65.0),
    ("2891", 30.0),
    ("2002", 28.0),
    ("2317", 185.0),
    ("2382", 95.0),
    ("2498", 8.0),
];

/// Offline source that jitters catalog symbols by up to ±2% around a base price.
///
/// Symbols outside the catalog are reported as not found.
pub struct DemoQuoteSource {
    catalog: Arc<SymbolCatalog>,
    base_prices: HashMap<String, f64>,
    rng: Mutex<StdRng>,
    latency: Duration,
}

impl DemoQuoteSource {
    pub fn new(catalog: Arc<SymbolCatalog>) -> Self {
        Self::with_seed(catalog, rand::random())
    }

    pub fn with_seed(catalog: Arc<SymbolCatalog>, seed: u64) -> Self {
        let base_prices = BASE_PRICES
            .iter()
            .map(|(code, price)| (code.to_string(), *price))
            .collect();
        Self {
            catalog,
            base_prices,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            latency: Duration::from_millis(0),
        }
    }

    /// Simulated network delay applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Stable reference price; used as the previous close.
    pub fn base_price(&self, symbol: &str) -> f64 {
        if let Some(price) = self.base_prices.get(symbol) {
            return *price;
        }
        let mut seeded = StdRng::seed_from_u64(symbol_seed(symbol));
        seeded.gen_range(20..=200) as f64
    }
}

#[async_trait]
impl QuoteSource for DemoQuoteSource {
    fn name(&self) -> &str {
        "demo"
    }

    async fn fetch(&self, symbol: &str) -> FetchResult<SourceQuote> {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        let Some(name) = self.catalog.name_of(symbol) else {
            return Err(AppError::NotFound(symbol.to_string()));
        };

        let base = self.base_price(symbol);
        let (fluctuation, volume) = {
            let mut rng = self.rng.lock();
            (rng.gen_range(-2.0..=2.0), rng.gen_range(1_000..=50_000u64))
        };
        let price = ((base + base * fluctuation / 100.0) * 100.0).round() / 100.0;

        Ok(SourceQuote {
            name: name.to_string(),
            price,
            volume,
            prev_close: Some(base),
        })
    }
}

/// FNV-1a over the symbol bytes; stable across runs and platforms.
pub(crate) fn symbol_seed(symbol: &str) -> u64 {
    symbol.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
    })
}
