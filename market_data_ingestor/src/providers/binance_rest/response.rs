use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    models::bar::Bar,
    providers::{DecodeSnafu, ProviderError},
};

use super::params::to_unified_symbol;

/// One row of `GET /api/v3/klines`, which Binance encodes as a positional array:
/// open time, OHLCV as decimal strings, close time, quote volume, trade count,
/// taker buy volumes and an unused trailing field.
#[derive(Deserialize, Debug)]
pub struct RawKline(
    pub i64,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub i64,
    pub String,
    pub u64,
    pub String,
    pub String,
    pub String,
);

#[derive(Deserialize, Debug)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
}

#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub code: i64,
    pub msg: String,
}

fn decimal(field: &str, raw: &str) -> Result<f64, ProviderError> {
    raw.parse::<f64>().map_err(|e| {
        DecodeSnafu {
            message: format!("{field} '{raw}': {e}"),
        }
        .build()
    })
}

impl RawKline {
    pub fn into_bar(self) -> Result<Bar, ProviderError> {
        let timestamp = DateTime::<Utc>::from_timestamp_millis(self.0).ok_or_else(|| {
            DecodeSnafu {
                message: format!("open time {} out of range", self.0),
            }
            .build()
        })?;
        Ok(Bar {
            timestamp,
            open: decimal("open", &self.1)?,
            high: decimal("high", &self.2)?,
            low: decimal("low", &self.3)?,
            close: decimal("close", &self.4)?,
            volume: decimal("volume", &self.5)?,
            trade_count: Some(self.8),
        })
    }
}

/// Decodes a klines payload into bars, keeping the venue's ascending order.
pub fn parse_klines(body: &str) -> Result<Vec<Bar>, ProviderError> {
    let raw: Vec<RawKline> = serde_json::from_str(body).map_err(|e| {
        DecodeSnafu {
            message: format!("klines payload: {e}"),
        }
        .build()
    })?;
    raw.into_iter().map(RawKline::into_bar).collect()
}

/// Decodes an exchangeInfo payload into unified symbols that are trading
/// against `quote`, in listing order.
pub fn parse_symbols(body: &str, quote: &str) -> Result<Vec<String>, ProviderError> {
    let info: ExchangeInfo = serde_json::from_str(body).map_err(|e| {
        DecodeSnafu {
            message: format!("exchangeInfo payload: {e}"),
        }
        .build()
    })?;
    Ok(info
        .symbols
        .into_iter()
        .filter(|s| s.status == "TRADING" && s.quote_asset.eq_ignore_ascii_case(quote))
        .map(|s| to_unified_symbol(&s.base_asset, &s.quote_asset))
        .collect())
}

/// Extracts Binance's `{"code":..,"msg":..}` error message, falling back to the raw body.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => format!("{} (code {})", err.msg, err.code),
        Err(_) if body.trim().is_empty() => "Unknown API error".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
