use snafu::ensure;

use crate::{
    models::{
        request_params::BarsRequestParams,
        timeframe::{Timeframe, TimeframeUnit},
    },
    providers::{ProviderError, ValidationSnafu},
};

/// Largest `limit` the klines endpoint accepts.
pub const MAX_KLINE_LIMIT: u32 = 1000;

/// Checks that the timeframe maps onto one of Binance's kline intervals.
pub fn validate_timeframe(timeframe: &Timeframe) -> Result<(), ProviderError> {
    let amount = timeframe.amount().get();
    let allowed: &[u32] = match timeframe.unit() {
        TimeframeUnit::Minute => &[1, 3, 5, 15, 30],
        TimeframeUnit::Hour => &[1, 2, 4, 6, 8, 12],
        TimeframeUnit::Day => &[1, 3],
        TimeframeUnit::Week | TimeframeUnit::Month => &[1],
    };
    ensure!(
        allowed.contains(&amount),
        ValidationSnafu {
            message: format!("unsupported kline interval {timeframe}"),
        }
    );
    Ok(())
}

/// `"ETH/USDT"` -> `"ETHUSDT"`. Symbols already in venue form pass through.
pub fn to_venue_symbol(symbol: &str) -> String {
    symbol.replace('/', "").to_uppercase()
}

/// `("ETH", "USDT")` -> `"ETH/USDT"`.
pub fn to_unified_symbol(base: &str, quote: &str) -> String {
    format!("{base}/{quote}")
}

/// Builds the query string for `GET /api/v3/klines`.
pub fn construct_params(params: &BarsRequestParams) -> Result<Vec<(&'static str, String)>, ProviderError> {
    validate_timeframe(&params.timeframe)?;
    ensure!(
        (1..=MAX_KLINE_LIMIT).contains(&params.limit),
        ValidationSnafu {
            message: format!("limit must be within 1..={MAX_KLINE_LIMIT}, got {}", params.limit),
        }
    );
    ensure!(
        !params.symbol.trim().is_empty(),
        ValidationSnafu {
            message: "symbol cannot be empty",
        }
    );

    let mut query = vec![
        ("symbol", to_venue_symbol(params.symbol.trim())),
        ("interval", params.timeframe.to_string()),
        ("limit", params.limit.to_string()),
    ];
    if let Some(end) = params.end {
        query.push(("endTime", end.timestamp_millis().to_string()));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn symbol_mapping() {
        assert_eq!(to_venue_symbol("eth/usdt"), "ETHUSDT");
        assert_eq!(to_venue_symbol("ETHUSDT"), "ETHUSDT");
        assert_eq!(to_unified_symbol("ETH", "USDT"), "ETH/USDT");
    }

    #[test]
    fn builds_kline_query() {
        let mut params = BarsRequestParams::new("BTC/USDT", Timeframe::ONE_HOUR, 100);
        params.end = Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let query = construct_params(&params).unwrap();
        assert_eq!(
            query,
            vec![
                ("symbol", "BTCUSDT".to_string()),
                ("interval", "1h".to_string()),
                ("limit", "100".to_string()),
                ("endTime", "1700000000000".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_unsupported_interval_and_limit() {
        let params = BarsRequestParams::new("BTC/USDT", "7m".parse().unwrap(), 100);
        assert!(matches!(
            construct_params(&params),
            Err(ProviderError::Validation { .. })
        ));

        let params = BarsRequestParams::new("BTC/USDT", Timeframe::ONE_HOUR, 1001);
        assert!(matches!(
            construct_params(&params),
            Err(ProviderError::Validation { .. })
        ));

        let params = BarsRequestParams::new("BTC/USDT", Timeframe::ONE_HOUR, 0);
        assert!(construct_params(&params).is_err());
    }
}
