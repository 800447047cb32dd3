//! Result shapes handed to the presentation layer, and their assembly.

use indexmap::IndexMap;
use market_data_ingestor::models::timeframe::Timeframe;
use serde::Serialize;

use crate::{align::AlignedRow, delay::DelayRecord};

/// Matching-direction report for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchingDirection {
    pub symbol: String,
    pub delay_records: Vec<DelayRecord>,
    /// The agreeing rows the records were computed from, ascending.
    pub detail_rows: Vec<AlignedRow>,
}

/// A candidate selected for charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedCandidate {
    pub symbol: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub reference: String,
    pub reference_timeframe: Timeframe,
    pub reference_bars: usize,
    pub candidates_analyzed: usize,
    pub correlation_threshold: f64,
    pub matching: Vec<MatchingDirection>,
    pub correlated: Vec<CorrelatedCandidate>,
    /// Candidates left out because their data could not be used.
    pub skipped: Vec<SkippedSymbol>,
}

/// Collects per-candidate outcomes in processing order, one entry per symbol.
///
/// A symbol offered twice keeps its first entry.
#[derive(Debug, Default)]
pub struct ResultAssembler {
    matching: IndexMap<String, MatchingDirection>,
    correlated: IndexMap<String, CorrelatedCandidate>,
    skipped: IndexMap<String, SkippedSymbol>,
}

impl ResultAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_matching(&mut self, entry: MatchingDirection) {
        self.matching.entry(entry.symbol.clone()).or_insert(entry);
    }

    pub fn push_correlated(&mut self, entry: CorrelatedCandidate) {
        self.correlated.entry(entry.symbol.clone()).or_insert(entry);
    }

    pub fn skip(&mut self, symbol: impl Into<String>, reason: impl ToString) {
        let symbol = symbol.into();
        self.skipped
            .entry(symbol.clone())
            .or_insert_with(|| SkippedSymbol {
                symbol,
                reason: reason.to_string(),
            });
    }

    pub fn extend_matching(&mut self, entries: impl IntoIterator<Item = MatchingDirection>) {
        entries.into_iter().for_each(|e| self.push_matching(e));
    }

    pub fn extend_correlated(&mut self, entries: impl IntoIterator<Item = CorrelatedCandidate>) {
        entries.into_iter().for_each(|e| self.push_correlated(e));
    }

    pub fn into_matching(self) -> Vec<MatchingDirection> {
        self.matching.into_values().collect()
    }

    pub fn into_correlated(self) -> Vec<CorrelatedCandidate> {
        self.correlated.into_values().collect()
    }

    pub fn finish(
        self,
        reference: impl Into<String>,
        reference_timeframe: Timeframe,
        reference_bars: usize,
        candidates_analyzed: usize,
        correlation_threshold: f64,
    ) -> AnalysisReport {
        AnalysisReport {
            reference: reference.into(),
            reference_timeframe,
            reference_bars,
            candidates_analyzed,
            correlation_threshold,
            matching: self.matching.into_values().collect(),
            correlated: self.correlated.into_values().collect(),
            skipped: self.skipped.into_values().collect(),
        }
    }
}
