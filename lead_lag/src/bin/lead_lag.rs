use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lead_lag::{AnalysisReport, LeadLagConfig, parse_config_path};
use market_data_ingestor::{models::timeframe::Timeframe, providers::binance_rest::BinanceProvider};
use tracing::info;

#[derive(Parser)]
#[command(version, about = "Lead-lag direction analysis against a reference pair")]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Comma-separated candidate symbols, e.g. ETH/USDT,SOL/USDT.
    #[arg(long, value_delimiter = ',', global = true)]
    symbols: Vec<String>,

    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Bars fetched per series.
    #[arg(long, global = true)]
    limit: Option<u32>,

    /// Bar interval for every series, e.g. 15m, 1h, 1d.
    #[arg(long, global = true)]
    timeframe: Option<Timeframe>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Clone, Copy)]
enum Cmd {
    /// Per-candidate delay statistics for matching-direction bars.
    Delays,
    /// Candidates whose closes correlate with the reference.
    Correlated,
    /// Both analyses plus skipped symbols.
    Report,
}

impl Cli {
    fn resolve_config(&self) -> Result<LeadLagConfig> {
        let mut cfg = match &self.config {
            Some(path) => parse_config_path(path)?,
            None => LeadLagConfig::default(),
        };
        cfg.apply_env_overrides()
            .context("invalid environment override")?;

        if !self.symbols.is_empty() {
            cfg.candidates.symbols = self.symbols.clone();
        }
        if let Some(threshold) = self.threshold {
            cfg.analysis.correlation_threshold = threshold;
        }
        if let Some(limit) = self.limit {
            cfg.reference.limit = limit;
            cfg.candidates.limit = limit;
        }
        if let Some(timeframe) = self.timeframe {
            cfg.reference.timeframe = timeframe;
            cfg.candidates.timeframe = timeframe;
        }
        cfg.validate().context("invalid config")?;
        Ok(cfg)
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .init()
}

fn render(cmd: Cmd, report: &AnalysisReport) -> serde_json::Result<String> {
    match cmd {
        Cmd::Delays => serde_json::to_string_pretty(&report.matching),
        Cmd::Correlated => serde_json::to_string_pretty(&report.correlated),
        Cmd::Report => serde_json::to_string_pretty(report),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let cfg = cli.resolve_config()?;

    let provider = BinanceProvider::new(cfg.binance_config()?)
        .context("failed to build exchange client")?;
    info!(base_url = provider.base_url(), reference = %cfg.reference.symbol, "starting run");

    let report = lead_lag::run(&provider, &cfg).await?;
    drop(provider);

    println!("{}", render(cli.cmd, &report)?);
    Ok(())
}
