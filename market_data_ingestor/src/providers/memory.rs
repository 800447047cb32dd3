//! In-memory provider serving pre-loaded series.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};

use crate::{
    models::{bar_series::BarSeries, request_params::BarsRequestParams},
    providers::{ApiSnafu, DataProvider, NoDataSnafu, ProviderError},
};

/// Serves series from memory, honouring `limit` and `end` the way an exchange would.
///
/// Symbols can be marked as permanently failing or as failing transiently a
/// fixed number of times before succeeding.
#[derive(Debug, Default)]
pub struct StaticProvider {
    series: IndexMap<String, BarSeries>,
    failing: IndexSet<String>,
    flaky: Mutex<HashMap<String, u32>>,
    latency: Option<Duration>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, series: BarSeries) -> Self {
        self.series.insert(series.symbol.clone(), series);
        self
    }

    /// Every fetch for `symbol` fails with a non-transient error.
    pub fn with_failure(mut self, symbol: impl Into<String>) -> Self {
        self.failing.insert(symbol.into());
        self
    }

    /// The next `failures` fetches for `symbol` fail with HTTP 503.
    pub fn with_transient_failures(mut self, symbol: impl Into<String>, failures: u32) -> Self {
        self.flaky
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol.into(), failures);
        self
    }

    /// Delay applied to every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn take_transient_failure(&self, symbol: &str) -> bool {
        let mut flaky = self.flaky.lock().unwrap_or_else(PoisonError::into_inner);
        match flaky.get_mut(symbol) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl DataProvider for StaticProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarSeries, ProviderError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.take_transient_failure(&params.symbol) {
            return ApiSnafu {
                status: 503u16,
                message: "service unavailable",
            }
            .fail();
        }
        let series = match self.series.get(&params.symbol) {
            Some(series) if !self.failing.contains(&params.symbol) => series,
            _ => {
                return NoDataSnafu {
                    symbol: params.symbol,
                }
                .fail();
            }
        };

        let mut bars: Vec<_> = series
            .bars
            .iter()
            .filter(|b| params.end.is_none_or(|end| b.timestamp <= end))
            .cloned()
            .collect();
        let keep = params.limit as usize;
        if bars.len() > keep {
            bars.drain(..bars.len() - keep);
        }
        Ok(BarSeries::new(params.symbol, series.timeframe, bars))
    }

    async fn fetch_symbols(&self, quote: &str) -> Result<Vec<String>, ProviderError> {
        let suffix = format!("/{}", quote.to_uppercase());
        Ok(self
            .series
            .keys()
            .chain(self.failing.iter().filter(|s| !self.series.contains_key(*s)))
            .filter(|s| s.to_uppercase().ends_with(&suffix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::models::{bar::Bar, timeframe::Timeframe};

    use super::*;

    fn series(symbol: &str, n: i64) -> BarSeries {
        let bars = (0..n)
            .map(|i| Bar::flat(Utc.timestamp_opt(i * 3600, 0).unwrap(), 100.0 + i as f64))
            .collect();
        BarSeries::new(symbol, Timeframe::ONE_HOUR, bars)
    }

    #[tokio::test]
    async fn limit_keeps_latest_bars() {
        let provider = StaticProvider::new().with_series(series("ETH/USDT", 5));
        let out = provider
            .fetch_bars(BarsRequestParams::new("ETH/USDT", Timeframe::ONE_HOUR, 2))
            .await
            .unwrap();
        let closes: Vec<f64> = out.bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![103.0, 104.0]);
    }

    #[tokio::test]
    async fn end_bound_is_inclusive() {
        let provider = StaticProvider::new().with_series(series("ETH/USDT", 5));
        let mut params = BarsRequestParams::new("ETH/USDT", Timeframe::ONE_HOUR, 10);
        params.end = Some(Utc.timestamp_opt(3600, 0).unwrap());
        let out = provider.fetch_bars(params).await.unwrap();
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn unknown_and_failing_symbols_error() {
        let provider = StaticProvider::new()
            .with_series(series("ETH/USDT", 3))
            .with_failure("ETH/USDT");
        let err = provider
            .fetch_bars(BarsRequestParams::new("ETH/USDT", Timeframe::ONE_HOUR, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NoData { .. }));
    }

    #[tokio::test]
    async fn transient_failures_run_out() {
        let provider = StaticProvider::new()
            .with_series(series("ETH/USDT", 3))
            .with_transient_failures("ETH/USDT", 1);
        let params = BarsRequestParams::new("ETH/USDT", Timeframe::ONE_HOUR, 10);
        let first = provider.fetch_bars(params.clone()).await.unwrap_err();
        assert!(first.is_transient());
        assert!(provider.fetch_bars(params).await.is_ok());
    }

    #[tokio::test]
    async fn transient_failures_survive_a_poisoned_lock() {
        let provider = StaticProvider::new().with_series(series("ETH/USDT", 3));
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = provider.flaky.lock().unwrap();
            panic!("poison the failure table");
        }));
        assert!(provider.flaky.is_poisoned());

        let provider = provider.with_transient_failures("ETH/USDT", 1);
        let params = BarsRequestParams::new("ETH/USDT", Timeframe::ONE_HOUR, 10);
        assert!(provider.fetch_bars(params.clone()).await.unwrap_err().is_transient());
        assert!(provider.fetch_bars(params).await.is_ok());
    }

    #[tokio::test]
    async fn symbols_filtered_by_quote() {
        let provider = StaticProvider::new()
            .with_series(series("BTC/USDT", 1))
            .with_series(series("ETH/BTC", 1))
            .with_series(series("SOL/USDT", 1))
            .with_failure("XRP/USDT");
        let symbols = provider.fetch_symbols("usdt").await.unwrap();
        assert_eq!(symbols, vec!["BTC/USDT", "SOL/USDT", "XRP/USDT"]);
    }
}
