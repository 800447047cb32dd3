use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timeframe::Timeframe;

/// Universal parameters for requesting one symbol's recent bars from any provider.
///
/// The window is "the latest `limit` bars ending at `end`" (or ending now when
/// `end` is `None`), which is how exchange kline endpoints are addressed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BarsRequestParams {
    /// Symbol in unified `BASE/QUOTE` form (e.g. `"BTC/USDT"`).
    pub symbol: String,

    /// The time interval for each bar.
    ///
    /// **Validation of allowed values is performed by each data provider
    /// implementation, according to their own API rules.**
    pub timeframe: Timeframe,

    /// Maximum number of bars to return.
    pub limit: u32,

    /// Optional inclusive upper bound for bar open times.
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl BarsRequestParams {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, limit: u32) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            limit,
            end: None,
        }
    }
}
