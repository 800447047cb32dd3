//! A collection of time-series bars for a specific symbol and timeframe.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{bar::Bar, timeframe::Timeframe};

/// Reasons a series fails the ordering and sanity checks in [`BarSeries::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("bar {index} at {timestamp} is not after its predecessor")]
    OutOfOrder {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("bar {index} at {timestamp} has a non-finite close")]
    NonFiniteClose {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Represents a complete set of time-series data for a single symbol.
///
/// This struct groups a vector of [`Bar`]s with their corresponding symbol
/// and [`Timeframe`], making the data set self-describing.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    /// The symbol this data represents, in unified `BASE/QUOTE` form (e.g. "ETH/USDT").
    pub symbol: String,
    /// The time interval for each bar in the series.
    pub timeframe: Timeframe,
    /// The collection of OHLCV bars, ascending by timestamp.
    pub bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.timestamp)
    }

    /// Checks that timestamps are strictly increasing and every close is finite.
    pub fn validate(&self) -> Result<(), SeriesError> {
        for (index, bar) in self.bars.iter().enumerate() {
            if !bar.close.is_finite() {
                return Err(SeriesError::NonFiniteClose {
                    index,
                    timestamp: bar.timestamp,
                });
            }
            if index > 0 && bar.timestamp <= self.bars[index - 1].timestamp {
                return Err(SeriesError::OutOfOrder {
                    index,
                    timestamp: bar.timestamp,
                });
            }
        }
        Ok(())
    }

    /// Sorts bars by timestamp and drops later duplicates of the same timestamp.
    pub fn normalize(&mut self) {
        self.bars.sort_by_key(|b| b.timestamp);
        self.bars.dedup_by_key(|b| b.timestamp);
    }
}
