//! The two analysis entry points: matching-direction delays and correlated selection.

use indexmap::IndexMap;
use market_data_ingestor::models::bar_series::BarSeries;
use tracing::debug;

use crate::{
    align::align,
    correlation::{CorrelationFilter, correlation},
    delay::{agreeing_rows, summarize_delays},
    direction::{DirectedBar, FirstBarPolicy, classify},
    errors::AnalysisError,
    report::{CorrelatedCandidate, MatchingDirection, ResultAssembler},
};

/// Analysis policies shared by every candidate of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeadLagAnalyzer {
    pub first_bar: FirstBarPolicy,
    pub correlation: CorrelationFilter,
}

impl LeadLagAnalyzer {
    pub fn new(first_bar: FirstBarPolicy, correlation: CorrelationFilter) -> Self {
        Self {
            first_bar,
            correlation,
        }
    }

    pub fn classify(&self, series: &BarSeries) -> Vec<DirectedBar> {
        classify(&series.bars, self.first_bar)
    }

    /// Delay report for one candidate against an already classified reference.
    ///
    /// `None` when no aligned bar agrees in direction.
    pub fn analyze_candidate(
        &self,
        symbol: &str,
        reference: &[DirectedBar],
        candidate: &BarSeries,
    ) -> Option<MatchingDirection> {
        let rows = align(reference, &self.classify(candidate));
        let agreeing = agreeing_rows(&rows);
        debug!(
            symbol,
            aligned = rows.len(),
            agreeing = agreeing.len(),
            "aligned candidate"
        );
        if agreeing.is_empty() {
            return None;
        }
        Some(MatchingDirection {
            symbol: symbol.to_string(),
            delay_records: summarize_delays(&agreeing),
            detail_rows: agreeing,
        })
    }

    /// Matching-direction report over all candidates, in their given order.
    ///
    /// Candidates without agreeing bars are left out.
    pub fn analyze_delays(
        &self,
        reference: &BarSeries,
        candidates: &IndexMap<String, BarSeries>,
    ) -> Result<Vec<MatchingDirection>, AnalysisError> {
        ensure_reference(reference)?;
        let reference_bars = self.classify(reference);

        let mut assembler = ResultAssembler::new();
        assembler.extend_matching(
            candidates
                .iter()
                .filter_map(|(symbol, series)| self.analyze_candidate(symbol, &reference_bars, series)),
        );
        Ok(assembler.into_matching())
    }

    /// Correlation of one candidate with the reference, if defined.
    pub fn correlate_candidate(&self, reference: &BarSeries, candidate: &BarSeries) -> Option<f64> {
        correlation(&reference.bars, &candidate.bars)
    }

    /// Candidates whose correlation reaches this analyzer's threshold, in their given order.
    pub fn select_correlated(
        &self,
        reference: &BarSeries,
        candidates: &IndexMap<String, BarSeries>,
    ) -> Result<Vec<CorrelatedCandidate>, AnalysisError> {
        ensure_reference(reference)?;

        let mut assembler = ResultAssembler::new();
        assembler.extend_correlated(candidates.iter().filter_map(|(symbol, series)| {
            let corr = self.correlate_candidate(reference, series);
            debug!(symbol = %symbol, correlation = ?corr, "correlated candidate");
            corr.filter(|c| self.correlation.admits(*c))
                .map(|correlation| CorrelatedCandidate {
                    symbol: symbol.clone(),
                    correlation,
                })
        }));
        Ok(assembler.into_correlated())
    }
}

fn ensure_reference(reference: &BarSeries) -> Result<(), AnalysisError> {
    if reference.is_empty() {
        return Err(AnalysisError::EmptyReference {
            symbol: reference.symbol.clone(),
        });
    }
    Ok(())
}

/// [`LeadLagAnalyzer::analyze_delays`] with default policies.
pub fn analyze_delays(
    reference: &BarSeries,
    candidates: &IndexMap<String, BarSeries>,
) -> Result<Vec<MatchingDirection>, AnalysisError> {
    LeadLagAnalyzer::default().analyze_delays(reference, candidates)
}

/// [`LeadLagAnalyzer::select_correlated`] with the given threshold.
pub fn select_correlated(
    reference: &BarSeries,
    candidates: &IndexMap<String, BarSeries>,
    threshold: f64,
) -> Result<Vec<CorrelatedCandidate>, AnalysisError> {
    let analyzer = LeadLagAnalyzer {
        correlation: CorrelationFilter::new(threshold)?,
        ..Default::default()
    };
    analyzer.select_correlated(reference, candidates)
}
