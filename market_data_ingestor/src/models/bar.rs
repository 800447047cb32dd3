//! Canonical in-memory representation of a time-series bar (OHLCV).
//!
//! This struct is used as the standard output for all [`DataProvider`](crate::providers::DataProvider)
//! implementations, regardless of venue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single time-series bar (OHLCV) for a given timestamp.
///
/// This struct is vendor-agnostic and is used throughout the data ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// The opening timestamp for this bar (UTC).
    pub timestamp: DateTime<Utc>,

    /// Opening price.
    pub open: f64,

    /// Highest price during the bar interval.
    pub high: f64,

    /// Lowest price during the bar interval.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the bar interval.
    pub volume: f64,

    /// Trade count for the bar. Not all providers supply this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_count: Option<u64>,
}

impl Bar {
    /// Builds a bar with identical OHLC values; handy for close-only data.
    pub fn flat(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
            trade_count: None,
        }
    }
}
