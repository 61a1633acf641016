use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{sleep, Duration};

use crate::error::AppError;

use super::{FetchResult, QuoteSource, SourceQuote};

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Price(f64, u64),
    NotFound,
    Error,
    Panic,
    Hang,
}

/// Quote source driven by a per-symbol script that records call concurrency.
pub struct ScriptedSource {
    script: Mutex<HashMap<String, Behavior>>,
    fallback: Behavior,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            fallback: Behavior::NotFound,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with(self, symbol: &str, behavior: Behavior) -> Self {
        self.set(symbol, behavior);
        self
    }

    pub fn default_behavior(mut self, behavior: Behavior) -> Self {
        self.fallback = behavior;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set(&self, symbol: &str, behavior: Behavior) {
        self.script.lock().insert(symbol.to_string(), behavior);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, symbol: &str) -> FetchResult<SourceQuote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let behavior = self
            .script
            .lock()
            .get(symbol)
            .copied()
            .unwrap_or(self.fallback);

        match behavior {
            Behavior::Price(price, volume) => Ok(SourceQuote {
                name: format!("{symbol} Co"),
                price,
                volume,
                prev_close: None,
            }),
            Behavior::NotFound => Err(AppError::NotFound(symbol.to_string())),
            Behavior::Error => Err(AppError::message(format!("upstream error for {symbol}"))),
            Behavior::Panic => panic!("scripted panic for {symbol}"),
            Behavior::Hang => futures::future::pending().await,
        }
    }
}
