use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteStatus {
    Success,
    NotFound,
    Failed,
}

impl QuoteStatus {
    pub fn label(self) -> &'static str {
        match self {
            QuoteStatus::Success => "ok",
            QuoteStatus::NotFound => "not found",
            QuoteStatus::Failed => "failed",
        }
    }
}

/// Fields a quote source reports for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuote {
    pub name: String,
    pub price: f64,
    pub volume: u64,
    pub prev_close: Option<f64>,
}

/// Latest known snapshot of one symbol. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Option<f64>,
    pub volume: Option<u64>,
    pub prev_close: Option<f64>,
    /// Time of the latest fetch attempt, successful or not.
    pub fetched_at: DateTime<Local>,
    /// Time the carried price was observed.
    pub priced_at: Option<DateTime<Local>>,
    pub status: QuoteStatus,
}

impl Quote {
    pub fn success(symbol: &str, data: SourceQuote, at: DateTime<Local>) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: data.name,
            price: Some(data.price.max(0.0)),
            volume: Some(data.volume),
            prev_close: data.prev_close,
            fetched_at: at,
            priced_at: Some(at),
            status: QuoteStatus::Success,
        }
    }

    /// A failed attempt for a symbol with nothing cached yet.
    pub fn missing(symbol: &str, name: &str, status: QuoteStatus, at: DateTime<Local>) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price: None,
            volume: None,
            prev_close: None,
            fetched_at: at,
            priced_at: None,
            status,
        }
    }

    /// Copy of `self` recording a failed attempt; the last known price stays as a stale value.
    pub fn degraded(&self, status: QuoteStatus, at: DateTime<Local>) -> Self {
        Self {
            status,
            fetched_at: at,
            ..self.clone()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == QuoteStatus::Success
    }

    pub fn change_pct(&self) -> Option<f64> {
        match (self.price, self.prev_close) {
            (Some(price), Some(prev)) if prev.abs() > f64::EPSILON => {
                Some((price - prev) / prev * 100.0)
            }
            _ => None,
        }
    }

    /// The price is older than `max_age`, or the last attempt did not refresh it.
    pub fn is_stale(&self, now: DateTime<Local>, max_age: Duration) -> bool {
        match self.priced_at {
            Some(priced_at) => priced_at < self.fetched_at || now - priced_at > max_age,
            None => true,
        }
    }
}
