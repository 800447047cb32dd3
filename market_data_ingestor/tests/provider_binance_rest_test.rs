#![cfg(test)]
use market_data_ingestor::{
    models::{request_params::BarsRequestParams, timeframe::Timeframe},
    providers::{
        DataProvider,
        binance_rest::{BinanceConfig, BinanceProvider},
    },
};
use serial_test::serial;

#[tokio::test]
#[serial]
#[ignore]
async fn test_binance_provider_fetch_bars() {
    // Hits the public Binance API; run with `--ignored` when network access is available.
    let provider = BinanceProvider::new(BinanceConfig::default()).expect("Failed to create BinanceProvider");

    let params = BarsRequestParams::new("BTC/USDT", Timeframe::ONE_HOUR, 5);
    let result = provider.fetch_bars(params).await;

    assert!(result.is_ok(), "fetch_bars returned an error: {:?}", result.err());

    let series = result.unwrap();
    assert_eq!(series.symbol, "BTC/USDT");
    assert!(!series.bars.is_empty(), "Expected to fetch at least one bar for BTC/USDT");
    assert!(series.bars.len() <= 5, "Expected at most 5 bars due to limit");
    assert!(series.validate().is_ok());
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_binance_provider_fetch_symbols() {
    let provider = BinanceProvider::new(BinanceConfig::default()).expect("Failed to create BinanceProvider");

    let symbols = provider.fetch_symbols("USDT").await.expect("exchangeInfo failed");
    assert!(symbols.iter().any(|s| s == "BTC/USDT"));
    assert!(symbols.iter().all(|s| s.ends_with("/USDT")));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_binance_provider_unknown_symbol_is_api_error() {
    let provider = BinanceProvider::new(BinanceConfig::default()).expect("Failed to create BinanceProvider");

    let err = provider
        .fetch_bars(BarsRequestParams::new("NOPE/NOPE", Timeframe::ONE_HOUR, 5))
        .await
        .unwrap_err();
    assert!(!err.is_transient(), "unexpected transient error: {err}");
}
