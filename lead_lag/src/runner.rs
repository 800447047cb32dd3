//! End-to-end run: fetch the reference, resolve and fetch the candidate
//! universe, analyze, assemble.
//!
//! The provider is borrowed for the duration of one run; the caller owns its
//! lifetime.

use indexmap::{IndexMap, IndexSet};
use market_data_ingestor::{
    models::{bar_series::BarSeries, request_params::BarsRequestParams},
    providers::DataProvider,
    requests::{BatchOptions, BatchResult, fetch_bars_batch, fetch_with_retry},
};
use tracing::{info, warn};

use crate::{
    config::{CandidatesCfg, LeadLagConfig},
    errors::RunError,
    report::{AnalysisReport, ResultAssembler},
};

/// Fetches everything `config` describes from `provider` and runs both analyses.
///
/// Only reference problems and symbol enumeration failures are errors. A
/// candidate whose fetch fails, or whose series is malformed or empty, is
/// listed under [`AnalysisReport::skipped`].
pub async fn run<P>(provider: &P, config: &LeadLagConfig) -> Result<AnalysisReport, RunError>
where
    P: DataProvider + ?Sized,
{
    config
        .validate()
        .map_err(|e| RunError::Config(format!("{e:#}")))?;
    let analyzer = config.analyzer()?;
    let options = config
        .batch_options()
        .map_err(|e| RunError::Config(format!("{e:#}")))?;

    let reference = fetch_reference(provider, config, &options).await?;
    info!(
        symbol = %reference.symbol,
        bars = reference.len(),
        first = ?reference.first_timestamp(),
        last = ?reference.last_timestamp(),
        "reference series loaded"
    );

    let universe = resolve_universe(provider, &config.candidates, &config.reference.symbol).await?;
    info!(candidates = universe.len(), "candidate universe resolved");

    let requests = universe
        .iter()
        .map(|symbol| {
            BarsRequestParams::new(
                symbol.clone(),
                config.candidates.timeframe,
                config.candidates.limit,
            )
        })
        .collect();
    let fetched = fetch_bars_batch(provider, requests, &options).await;

    let mut assembler = ResultAssembler::new();
    let candidates = usable_candidates(fetched, &mut assembler);

    let matching = analyzer.analyze_delays(&reference, &candidates)?;
    let correlated = analyzer.select_correlated(&reference, &candidates)?;
    info!(
        analyzed = candidates.len(),
        matching = matching.len(),
        correlated = correlated.len(),
        "analysis complete"
    );

    assembler.extend_matching(matching);
    assembler.extend_correlated(correlated);
    Ok(assembler.finish(
        reference.symbol,
        reference.timeframe,
        reference.bars.len(),
        candidates.len(),
        analyzer.correlation.threshold(),
    ))
}

async fn fetch_reference<P>(
    provider: &P,
    config: &LeadLagConfig,
    options: &BatchOptions,
) -> Result<BarSeries, RunError>
where
    P: DataProvider + ?Sized,
{
    let symbol = config.reference.symbol.clone();
    let params = BarsRequestParams::new(
        symbol.clone(),
        config.reference.timeframe,
        config.reference.limit,
    );
    let series = fetch_with_retry(provider, params, options)
        .await
        .map_err(|source| RunError::ReferenceUnavailable {
            symbol: symbol.clone(),
            source,
        })?;
    series
        .validate()
        .map_err(|source| RunError::InvalidReference { symbol, source })?;
    Ok(series)
}

/// Candidate symbols in analysis order.
///
/// The explicit list wins over enumeration. The reference and configured
/// exclusions are removed (case-insensitively), duplicates collapse to their
/// first position, and `max_symbols` caps what is left.
pub async fn resolve_universe<P>(
    provider: &P,
    candidates: &CandidatesCfg,
    reference: &str,
) -> Result<Vec<String>, RunError>
where
    P: DataProvider + ?Sized,
{
    let listed = if candidates.symbols.is_empty() {
        provider
            .fetch_symbols(&candidates.quote)
            .await
            .map_err(|source| RunError::Universe {
                quote: candidates.quote.clone(),
                source,
            })?
    } else {
        candidates.symbols.clone()
    };

    let excluded: IndexSet<String> = candidates
        .exclude
        .iter()
        .map(|s| s.to_uppercase())
        .chain(std::iter::once(reference.to_uppercase()))
        .collect();

    let mut seen = IndexSet::new();
    let universe = listed
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !excluded.contains(&s.to_uppercase()))
        .filter(|s| seen.insert(s.to_uppercase()))
        .take(candidates.max_symbols.unwrap_or(usize::MAX))
        .collect();
    Ok(universe)
}

/// Splits a batch into analyzable series and skipped symbols.
fn usable_candidates(
    fetched: BatchResult,
    assembler: &mut ResultAssembler,
) -> IndexMap<String, BarSeries> {
    let mut usable = IndexMap::with_capacity(fetched.len());
    for (symbol, result) in fetched {
        let series = match result {
            Ok(series) => series,
            Err(err) => {
                warn!(symbol = %symbol, error = %err, "candidate fetch failed, skipping");
                assembler.skip(symbol, err);
                continue;
            }
        };
        if let Err(err) = series.validate() {
            warn!(symbol = %symbol, error = %err, "candidate series malformed, skipping");
            assembler.skip(symbol, err);
            continue;
        }
        if series.is_empty() {
            warn!(symbol = %symbol, "candidate returned no bars, skipping");
            assembler.skip(symbol, "no bars returned");
            continue;
        }
        usable.insert(symbol, series);
    }
    usable
}
