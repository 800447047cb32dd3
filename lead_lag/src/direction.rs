//! Per-bar price direction.
//!
//! The direction of bar `i` comes from the percentage change between its close
//! and the close of bar `i - 1` in the same series. The first bar has no
//! predecessor, so its change is absent and its direction is decided by
//! [`FirstBarPolicy`] rather than by whatever a NaN comparison happens to yield.

use chrono::{DateTime, Utc};
use market_data_ingestor::models::bar::Bar;
use serde::{Deserialize, Serialize};

/// Direction label of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    /// Zero or negative change.
    Down,
    /// The change could not be computed.
    Undefined,
}

impl Direction {
    pub fn from_change(change: Option<f64>, policy: FirstBarPolicy) -> Self {
        match change {
            Some(c) if c > 0.0 => Direction::Up,
            Some(_) => Direction::Down,
            None => match policy {
                FirstBarPolicy::Undefined => Direction::Undefined,
                FirstBarPolicy::Down => Direction::Down,
            },
        }
    }

    pub fn is_defined(self) -> bool {
        self != Direction::Undefined
    }

    /// Two directions agree when they are equal and defined.
    /// `Undefined` agrees with nothing, itself included.
    pub fn agrees_with(self, other: Direction) -> bool {
        self.is_defined() && self == other
    }
}

/// What to label a bar whose change is undefined.
///
/// In a validated series that is only the first bar; a zero predecessor
/// close also leaves the change undefined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstBarPolicy {
    /// Label it [`Direction::Undefined`]; it never takes part in agreement.
    #[default]
    Undefined,
    /// Label it [`Direction::Down`], as a plain `change > 0` test against NaN would.
    Down,
}

/// A bar with its percentage change and direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectedBar {
    pub bar: Bar,
    pub price_change: Option<f64>,
    pub direction: Direction,
}

impl DirectedBar {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.bar.timestamp
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }
}

/// `(close - prev) / prev`, or `None` when `prev` is zero or either value is not finite.
pub fn price_change(prev: f64, close: f64) -> Option<f64> {
    if prev == 0.0 || !prev.is_finite() || !close.is_finite() {
        return None;
    }
    Some((close - prev) / prev)
}

/// Labels every bar; output has the same length and order as `bars`.
pub fn classify(bars: &[Bar], policy: FirstBarPolicy) -> Vec<DirectedBar> {
    let mut prev_close: Option<f64> = None;
    bars.iter()
        .map(|bar| {
            let change = prev_close.and_then(|prev| price_change(prev, bar.close));
            prev_close = Some(bar.close);
            DirectedBar {
                bar: bar.clone(),
                price_change: change,
                direction: Direction::from_change(change, policy),
            }
        })
        .collect()
}
