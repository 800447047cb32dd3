use std::{num::NonZeroU32, time::Duration};

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use snafu::{ResultExt, ensure};
use tracing::debug;

use crate::{
    models::{bar_series::BarSeries, request_params::BarsRequestParams},
    providers::{
        ApiSnafu, ClientBuildSnafu, DataProvider, InvalidBaseUrlSnafu, ProviderError,
        ProviderInitError, ReqwestSnafu,
        binance_rest::{
            params::construct_params,
            response::{error_message, parse_klines, parse_symbols},
        },
    },
};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const KLINES_PATH: &str = "/api/v3/klines";
const EXCHANGE_INFO_PATH: &str = "/api/v3/exchangeInfo";

/// Connection settings for [`BinanceProvider`].
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Upper bound on requests issued per second across all concurrent fetches.
    pub requests_per_second: NonZeroU32,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            requests_per_second: nonzero!(10u32),
        }
    }
}

/// Public market-data client for Binance spot.
///
/// One instance owns one HTTP connection pool and one rate limiter; build it
/// per analysis run and drop it when the run ends.
pub struct BinanceProvider {
    client: Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl BinanceProvider {
    pub fn new(config: BinanceConfig) -> Result<Self, ProviderInitError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            InvalidBaseUrlSnafu {
                url: config.base_url.clone(),
            }
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url,
            limiter: RateLimiter::direct(Quota::per_second(config.requests_per_second)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, ProviderError> {
        self.limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        let body = response.text().await.context(ReqwestSnafu)?;
        if !status.is_success() {
            return ApiSnafu {
                status: status.as_u16(),
                message: error_message(&body),
            }
            .fail();
        }
        Ok(body)
    }
}

#[async_trait]
impl DataProvider for BinanceProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarSeries, ProviderError> {
        let query = construct_params(&params)?;
        let body = self.get_text(KLINES_PATH, &query).await?;

        let mut series = BarSeries::new(params.symbol, params.timeframe, parse_klines(&body)?);
        series.normalize();
        debug!(symbol = %series.symbol, bars = series.len(), "fetched klines");
        Ok(series)
    }

    async fn fetch_symbols(&self, quote: &str) -> Result<Vec<String>, ProviderError> {
        let body = self.get_text(EXCHANGE_INFO_PATH, &[]).await?;
        let symbols = parse_symbols(&body, quote)?;
        debug!(quote, count = symbols.len(), "fetched exchange symbols");
        Ok(symbols)
    }
}
