use tokio::time::Duration;

use crate::error::Result;

pub mod cache;
pub mod demo;
pub mod quote;
pub mod scheduler;
pub mod source;
pub mod twse;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::QuoteCache;
pub use demo::DemoQuoteSource;
pub use quote::{Quote, QuoteStatus, SourceQuote};
pub use scheduler::{FetchScheduler, RefreshSnapshot};
pub use source::QuoteSource;
pub use twse::{TwseQuoteSource, TWSE_ENDPOINT};

/// Default concurrency guard applied when refreshing the watchlist.
pub const REFRESH_CONCURRENCY_LIMIT: usize = 10;

/// Upper bound on a single quote source call.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub type FetchResult<T> = Result<T>;

#[inline]
pub fn ensure_concurrency_limit(limit: usize) -> usize {
    limit.max(1)
}
