//! Binance spot REST provider (public market-data endpoints only).

pub mod params;
pub mod provider;
pub mod response;

pub use provider::{BinanceConfig, BinanceProvider};
