//! Timeframe utilities for expressing uniform bar intervals.
//!
//! A [`Timeframe`] pairs a non-zero amount with a [`TimeframeUnit`], covering
//! minute, hour, day, week, and month buckets in UTC. The textual form follows
//! the exchange kline interval convention: `"1m"`, `"4h"`, `"1d"`, `"1w"`, `"1M"`.
//!
//! ```
//! use market_data_ingestor::models::timeframe::{Timeframe, TimeframeUnit};
//!
//! let tf: Timeframe = "15m".parse().unwrap();
//! assert_eq!(tf.amount().get(), 15);
//! assert_eq!(tf.unit(), TimeframeUnit::Minute);
//! assert_eq!(tf.to_string(), "15m");
//! ```

use std::{fmt, num::NonZeroU32, str::FromStr};

use nonzero_ext::nonzero;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeframeError {
    #[error("Invalid amount for {unit:?}: {message}")]
    InvalidAmount {
        unit: TimeframeUnit,
        message: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

/// Timeframe granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeframeUnit {
    Minute,
    Hour,
    Day,
    Week,
    /// calendar months
    Month,
}

/// A timeframe = amount × unit (e.g., 5-Minute, 4-Hour, 1-Day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeframe {
    pub amount: NonZeroU32,
    pub unit: TimeframeUnit,
}

impl Timeframe {
    pub const ONE_MINUTE: Timeframe = Timeframe::new(nonzero!(1u32), TimeframeUnit::Minute);
    pub const ONE_HOUR: Timeframe = Timeframe::new(nonzero!(1u32), TimeframeUnit::Hour);
    pub const ONE_DAY: Timeframe = Timeframe::new(nonzero!(1u32), TimeframeUnit::Day);

    pub const fn new(amount: NonZeroU32, unit: TimeframeUnit) -> Self {
        Self { amount, unit }
    }

    /// Fallible constructor for amounts coming from untyped input.
    pub fn try_new(amount: u32, unit: TimeframeUnit) -> Result<Self, TimeframeError> {
        let amount = NonZeroU32::new(amount).ok_or_else(|| TimeframeError::InvalidAmount {
            unit,
            message: "amount must be > 0".into(),
        })?;
        Ok(Self::new(amount, unit))
    }

    pub const fn amount(&self) -> NonZeroU32 {
        self.amount
    }

    pub const fn unit(&self) -> TimeframeUnit {
        self.unit
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.amount.get();
        let u = match self.unit {
            TimeframeUnit::Minute => "m",
            TimeframeUnit::Hour => "h",
            TimeframeUnit::Day => "d",
            TimeframeUnit::Week => "w",
            TimeframeUnit::Month => "M",
        };
        write!(f, "{a}{u}")
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(unit_char) = s.chars().last() else {
            return Err(TimeframeError::InvalidInput {
                message: "empty timeframe".into(),
            });
        };
        let digits = &s[..s.len() - unit_char.len_utf8()];
        let unit = match unit_char {
            'm' => TimeframeUnit::Minute,
            'h' | 'H' => TimeframeUnit::Hour,
            'd' | 'D' => TimeframeUnit::Day,
            'w' | 'W' => TimeframeUnit::Week,
            'M' => TimeframeUnit::Month,
            other => {
                return Err(TimeframeError::InvalidInput {
                    message: format!("unknown unit '{other}' in '{s}'"),
                });
            }
        };
        let amount: u32 = digits.parse().map_err(|_| TimeframeError::InvalidInput {
            message: format!("invalid amount in '{s}'"),
        })?;
        Self::try_new(amount, unit)
    }
}

impl Serialize for Timeframe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timeframe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
