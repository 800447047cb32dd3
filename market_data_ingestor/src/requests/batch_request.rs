use std::{collections::HashSet, num::NonZeroUsize, time::Duration};

use futures::{StreamExt, stream};
use indexmap::IndexMap;
use nonzero_ext::nonzero;
use tracing::{info, warn};

use crate::{
    models::{bar_series::BarSeries, request_params::BarsRequestParams},
    providers::{DataProvider, ProviderError},
};

/// Per-symbol outcome of a batch, keyed by symbol in request order.
pub type BatchResult = IndexMap<String, Result<BarSeries, ProviderError>>;

/// Concurrency and retry knobs for [`fetch_bars_batch`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum number of requests in flight at once.
    pub max_concurrency: NonZeroUsize,
    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,
    /// Backoff before retry `n` is `base_delay_ms * 2^n`.
    pub base_delay_ms: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: nonzero!(8usize),
            max_retries: 2,
            base_delay_ms: 250,
        }
    }
}

impl BatchOptions {
    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << attempt.min(16)))
    }
}

/// Fetches one request, retrying transient failures with exponential backoff.
pub async fn fetch_with_retry<P>(
    provider: &P,
    params: BarsRequestParams,
    options: &BatchOptions,
) -> Result<BarSeries, ProviderError>
where
    P: DataProvider + ?Sized,
{
    let mut attempt = 0;
    loop {
        match provider.fetch_bars(params.clone()).await {
            Ok(series) => return Ok(series),
            Err(err) if err.is_transient() && attempt < options.max_retries => {
                let delay = options.backoff(attempt);
                warn!(
                    symbol = %params.symbol,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient fetch failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Fetches every request with at most `max_concurrency` in flight and waits
/// for all of them.
///
/// Each symbol's outcome is reported independently: one failure never aborts
/// the rest. Duplicate symbols are fetched once, at their first position.
pub async fn fetch_bars_batch<P>(
    provider: &P,
    requests: Vec<BarsRequestParams>,
    options: &BatchOptions,
) -> BatchResult
where
    P: DataProvider + ?Sized,
{
    let mut seen = HashSet::new();
    let requests: Vec<_> = requests
        .into_iter()
        .filter(|r| seen.insert(r.symbol.clone()))
        .collect();
    let total = requests.len();

    let results: BatchResult = stream::iter(requests)
        .map(|params| async move {
            let symbol = params.symbol.clone();
            let result = fetch_with_retry(provider, params, options).await;
            (symbol, result)
        })
        .buffered(options.max_concurrency.get())
        .collect()
        .await;

    let failed = results.values().filter(|r| r.is_err()).count();
    info!(total, failed, "batch fetch complete");
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let options = BatchOptions {
            base_delay_ms: 100,
            ..Default::default()
        };
        assert_eq!(options.backoff(0), Duration::from_millis(100));
        assert_eq!(options.backoff(1), Duration::from_millis(200));
        assert_eq!(options.backoff(3), Duration::from_millis(800));
    }
}
