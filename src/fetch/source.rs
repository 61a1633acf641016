use async_trait::async_trait;

use super::{FetchResult, SourceQuote};

/// Boundary to whatever provides live prices.
///
/// Implementations return `AppError::NotFound` for symbols they do not know; every other error
/// is treated by the scheduler as a transient failure.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, symbol: &str) -> FetchResult<SourceQuote>;
}
