use market_data_ingestor::{models::bar_series::SeriesError, providers::ProviderError};
use thiserror::Error;

/// Failures of the analysis entry points.
///
/// Per-candidate problems (no bars, no agreement, undefined correlation) are
/// not errors; they only shrink the output.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    /// Nothing can be aligned against an empty reference.
    #[error("reference series {symbol} has no bars")]
    EmptyReference { symbol: String },

    #[error("correlation threshold must be finite and within (-1, 1], got {0}")]
    InvalidThreshold(f64),
}

/// Failures of a full fetch-and-analyze run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("reference series {symbol} unavailable: {source}")]
    ReferenceUnavailable {
        symbol: String,
        #[source]
        source: ProviderError,
    },

    #[error("reference series {symbol} is malformed: {source}")]
    InvalidReference {
        symbol: String,
        #[source]
        source: SeriesError,
    },

    #[error("failed to list {quote} symbols: {source}")]
    Universe {
        quote: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}
