//! Run configuration: TOML parsing, environment overrides, validation.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration that analyzes the top `USDT` pairs against `BTC/USDT` on
//! hourly bars, 100 bars deep. Unknown keys are rejected.
//!
//! ```toml
//! [reference]
//! symbol = "BTC/USDT"
//! timeframe = "1h"
//! limit = 100
//!
//! [candidates]
//! quote = "USDT"
//! symbols = ["ETH/USDT", "SOL/USDT"]   # empty = enumerate from the exchange
//! exclude = ["USDC/USDT"]
//!
//! [fetch]
//! max_concurrency = 8
//!
//! [analysis]
//! correlation_threshold = 0.8
//! first_bar = "undefined"              # or "down"
//! ```
//!
//! Environment overrides, applied by [`LeadLagConfig::apply_env_overrides`]:
//! [`ENV_BASE_URL`], [`ENV_MAX_CONCURRENCY`], [`ENV_THRESHOLD`].

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::Path,
    time::Duration,
};

use anyhow::{Context, bail, ensure};
use market_data_ingestor::{
    models::timeframe::Timeframe,
    providers::binance_rest::{BinanceConfig, params::MAX_KLINE_LIMIT, provider::DEFAULT_BASE_URL},
    requests::BatchOptions,
};
use serde::{Deserialize, Serialize};
use shared_utils::env::{EnvVarError, parse_env_var};

use crate::{
    analyzer::LeadLagAnalyzer,
    correlation::{CorrelationFilter, DEFAULT_CORRELATION_THRESHOLD},
    direction::FirstBarPolicy,
    errors::AnalysisError,
};

pub const ENV_BASE_URL: &str = "LEAD_LAG_BASE_URL";
pub const ENV_MAX_CONCURRENCY: &str = "LEAD_LAG_MAX_CONCURRENCY";
pub const ENV_THRESHOLD: &str = "LEAD_LAG_THRESHOLD";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LeadLagConfig {
    pub reference: ReferenceCfg,
    pub candidates: CandidatesCfg,
    pub fetch: FetchCfg,
    pub analysis: AnalysisCfg,
    pub provider: ProviderCfg,
}

/// The series every candidate is compared against.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceCfg {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub limit: u32,
}

impl Default for ReferenceCfg {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".into(),
            timeframe: Timeframe::ONE_HOUR,
            limit: 100,
        }
    }
}

/// Which symbols to analyze and how much history to load for each.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CandidatesCfg {
    /// Quote asset used when enumerating symbols from the exchange.
    pub quote: String,
    pub timeframe: Timeframe,
    pub limit: u32,
    /// Explicit candidate list; empty means "every trading pair in `quote`".
    pub symbols: Vec<String>,
    pub exclude: Vec<String>,
    /// Cap on the number of candidates after exclusions.
    pub max_symbols: Option<usize>,
}

impl Default for CandidatesCfg {
    fn default() -> Self {
        Self {
            quote: "USDT".into(),
            timeframe: Timeframe::ONE_HOUR,
            limit: 100,
            symbols: Vec::new(),
            exclude: Vec::new(),
            max_symbols: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchCfg {
    pub max_concurrency: usize,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub requests_per_second: u32,
    pub timeout_secs: u64,
}

impl Default for FetchCfg {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            max_retries: 2,
            base_delay_ms: 250,
            requests_per_second: 10,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisCfg {
    pub correlation_threshold: f64,
    pub first_bar: FirstBarPolicy,
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        Self {
            correlation_threshold: DEFAULT_CORRELATION_THRESHOLD,
            first_bar: FirstBarPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderCfg {
    pub base_url: String,
}

impl Default for ProviderCfg {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

impl LeadLagConfig {
    /// Overrides fields from [`ENV_BASE_URL`], [`ENV_MAX_CONCURRENCY`] and [`ENV_THRESHOLD`] when set.
    pub fn apply_env_overrides(&mut self) -> Result<(), EnvVarError> {
        if let Some(url) = parse_env_var::<String>(ENV_BASE_URL)? {
            self.provider.base_url = url;
        }
        if let Some(n) = parse_env_var::<usize>(ENV_MAX_CONCURRENCY)? {
            self.fetch.max_concurrency = n;
        }
        if let Some(t) = parse_env_var::<f64>(ENV_THRESHOLD)? {
            self.analysis.correlation_threshold = t;
        }
        Ok(())
    }

    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            !self.reference.symbol.trim().is_empty(),
            "reference.symbol cannot be empty"
        );
        ensure!(
            !self.candidates.quote.trim().is_empty(),
            "candidates.quote cannot be empty"
        );
        for (name, limit) in [
            ("reference.limit", self.reference.limit),
            ("candidates.limit", self.candidates.limit),
        ] {
            if !(1..=MAX_KLINE_LIMIT).contains(&limit) {
                bail!("{name} must be within 1..={MAX_KLINE_LIMIT}, got {limit}");
            }
        }
        ensure!(self.fetch.max_concurrency > 0, "fetch.max_concurrency must be > 0");
        ensure!(
            self.fetch.requests_per_second > 0,
            "fetch.requests_per_second must be > 0"
        );
        ensure!(self.fetch.timeout_secs > 0, "fetch.timeout_secs must be > 0");
        CorrelationFilter::new(self.analysis.correlation_threshold)
            .context("analysis.correlation_threshold")?;
        Ok(())
    }

    pub fn analyzer(&self) -> Result<LeadLagAnalyzer, AnalysisError> {
        let filter = CorrelationFilter::new(self.analysis.correlation_threshold)?;
        Ok(LeadLagAnalyzer::new(self.analysis.first_bar, filter))
    }

    pub fn batch_options(&self) -> anyhow::Result<BatchOptions> {
        Ok(BatchOptions {
            max_concurrency: NonZeroUsize::new(self.fetch.max_concurrency)
                .context("fetch.max_concurrency must be > 0")?,
            max_retries: self.fetch.max_retries,
            base_delay_ms: self.fetch.base_delay_ms,
        })
    }

    pub fn binance_config(&self) -> anyhow::Result<BinanceConfig> {
        Ok(BinanceConfig {
            base_url: self.provider.base_url.clone(),
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            requests_per_second: NonZeroU32::new(self.fetch.requests_per_second)
                .context("fetch.requests_per_second must be > 0")?,
        })
    }
}

/// Parse and validate a configuration from a TOML string.
///
/// Environment overrides are not applied here.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<LeadLagConfig> {
    let cfg: LeadLagConfig = toml::from_str(toml_str).context("failed to parse config TOML")?;
    cfg.validate().context("invalid config")?;
    Ok(cfg)
}

/// Read a configuration file from disk, parse, and validate it.
pub fn load_config_path(path: impl AsRef<Path>) -> anyhow::Result<LeadLagConfig> {
    let cfg = parse_config_path(path)?;
    cfg.validate().context("invalid config")?;
    Ok(cfg)
}

/// Read and parse a configuration file without validating it.
///
/// For callers that apply further overrides and validate afterwards.
pub fn parse_config_path(path: impl AsRef<Path>) -> anyhow::Result<LeadLagConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    toml::from_str(&text).context("failed to parse config TOML")
}
