//! Sources of bar series and symbol listings.
//!
//! [`DataProvider`] is the seam the analysis side is written against. The
//! Binance REST client ([`binance_rest::BinanceProvider`]) is the live
//! implementation; [`memory::StaticProvider`] serves pre-loaded series for
//! offline runs and tests. Callers take `&P where P: DataProvider + ?Sized`,
//! so `dyn DataProvider` works as well as a concrete type.
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data_ingestor::models::{bar_series::BarSeries, request_params::BarsRequestParams};
//! use market_data_ingestor::providers::{DataProvider, ProviderError};
//!
//! struct Empty;
//!
//! #[async_trait]
//! impl DataProvider for Empty {
//!     async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarSeries, ProviderError> {
//!         Ok(BarSeries::new(params.symbol, params.timeframe, vec![]))
//!     }
//!
//!     async fn fetch_symbols(&self, _quote: &str) -> Result<Vec<String>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod binance_rest;
pub mod memory;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::{bar_series::BarSeries, request_params::BarsRequestParams};

/// A venue that can serve bar series and list its tradable pairs.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetches the most recent `params.limit` bars of one symbol, ending at
    /// `params.end` when set. Bars come back ascending and may be empty.
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarSeries, ProviderError>;

    /// Lists tradable symbols quoted in `quote` (e.g. `"USDT"`), in unified
    /// `BASE/QUOTE` form and in the venue's listing order.
    async fn fetch_symbols(&self, quote: &str) -> Result<Vec<String>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// base URL is not an http(s) URL.
    #[snafu(display("Invalid base URL: {url}"))]
    InvalidBaseUrl { url: String, backtrace: Backtrace },
}

/// Errors that can occur within a `DataProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API answered with a non-success status.
    #[snafu(display("API error ({status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// The response body could not be decoded.
    #[snafu(display("Failed to decode response: {message}"))]
    Decode {
        message: String,
        backtrace: Backtrace,
    },

    /// The provider has nothing for this symbol.
    #[snafu(display("No data for symbol {symbol}"))]
    NoData { symbol: String, backtrace: Backtrace },
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, rate limiting (HTTP 429, and Binance's 418 ban
    /// notice) and server-side errors are transient; everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Reqwest { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            ProviderError::Api { status, .. } => matches!(*status, 418 | 429 | 500..=599),
            ProviderError::Validation { .. }
            | ProviderError::Decode { .. }
            | ProviderError::NoData { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::models::timeframe::Timeframe;

    use super::*;

    struct BinanceLike;
    struct Offline;

    #[async_trait]
    impl DataProvider for BinanceLike {
        async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarSeries, ProviderError> {
            Ok(BarSeries::new(params.symbol, params.timeframe, vec![]))
        }

        async fn fetch_symbols(&self, quote: &str) -> Result<Vec<String>, ProviderError> {
            Ok(vec![format!("ETH/{quote}")])
        }
    }

    #[async_trait]
    impl DataProvider for Offline {
        async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarSeries, ProviderError> {
            NoDataSnafu {
                symbol: params.symbol,
            }
            .fail()
        }

        async fn fetch_symbols(&self, _quote: &str) -> Result<Vec<String>, ProviderError> {
            Ok(vec![])
        }
    }

    // Decided at runtime; only works through `Box<dyn DataProvider>`.
    fn get_provider(name: &str) -> Box<dyn DataProvider> {
        if name == "binance" {
            Box::new(BinanceLike)
        } else {
            Box::new(Offline)
        }
    }

    #[tokio::test]
    async fn test_dynamic_provider() {
        let provider = get_provider("binance");
        let params = BarsRequestParams::new("ETH/USDT", Timeframe::ONE_HOUR, 10);

        let result = provider.fetch_bars(params).await;
        assert!(result.is_ok());
        assert_eq!(provider.fetch_symbols("USDT").await.unwrap(), vec!["ETH/USDT"]);

        let offline = get_provider("offline");
        let err = offline
            .fetch_bars(BarsRequestParams::new("ETH/USDT", Timeframe::ONE_HOUR, 10))
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn api_status_classification() {
        let rate_limited = ApiSnafu {
            status: 429u16,
            message: "too many requests",
        }
        .build();
        let server = ApiSnafu {
            status: 503u16,
            message: "unavailable",
        }
        .build();
        let bad_symbol = ApiSnafu {
            status: 400u16,
            message: "Invalid symbol.",
        }
        .build();
        assert!(rate_limited.is_transient());
        assert!(server.is_transient());
        assert!(!bad_symbol.is_transient());
    }
}
