//! Lead-lag analysis of candidate trading pairs against a reference pair.
//!
//! Bars of each series are labelled with the direction of their close-to-close
//! move ([`direction`]), candidates are joined backward-asof onto the
//! reference ([`align`]), and bars moving in the same direction as the last
//! reference move yield delay statistics ([`delay`]). Independently, close
//! prices are correlated with the reference ([`correlation`]).
//!
//! [`runner::run`] drives a full fetch-and-analyze pass against any
//! [`market_data_ingestor::providers::DataProvider`].

pub mod align;
pub mod analyzer;
pub mod config;
pub mod correlation;
pub mod delay;
pub mod direction;
pub mod errors;
pub mod report;
pub mod runner;

pub use analyzer::{LeadLagAnalyzer, analyze_delays, select_correlated};
pub use config::{LeadLagConfig, load_config_path, load_config_str, parse_config_path};
pub use direction::{Direction, FirstBarPolicy};
pub use errors::{AnalysisError, RunError};
pub use report::{AnalysisReport, CorrelatedCandidate, MatchingDirection};
pub use runner::run;
