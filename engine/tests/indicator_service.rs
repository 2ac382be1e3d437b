use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use indicator_engine::data::{CandleRange, CsvCandleLoader, DataProvider, MarketDataStore, StoreDataProvider};
use indicator_engine::services::{CalculateOptions, IndicatorRequest, IndicatorService};
use indicator_engine::signals::{IchimokuSignal, Signal, Trend};
use indicator_engine::{EngineError, EngineSettings, Result};
use serde_json::json;
use shared::models::{Candle, TimeFrame};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;

/// Serves a fixed candle list for one symbol and counts fetches.
struct FixedProvider {
    symbol: &'static str,
    candles: Vec<Candle>,
    fetches: AtomicUsize,
}

#[async_trait]
impl DataProvider for FixedProvider {
    async fn fetch_candles(&self, symbol: &str, _timeframe: TimeFrame, range: &CandleRange) -> Result<Vec<Candle>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if symbol != self.symbol {
            return Err(EngineError::DataUnavailable(format!("no data for {}", symbol)));
        }
        let mut candles: Vec<Candle> = self.candles.iter().filter(|c| range.contains(c.timestamp)).copied().collect();
        if let Some(limit) = range.limit {
            let skip = candles.len().saturating_sub(limit);
            candles.drain(..skip);
        }
        Ok(candles)
    }
}

fn rising_candles(n: usize) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 50.0 + i as f64 * 0.5;
            Candle::new(start + Duration::days(i as i64), close - 0.2, close + 1.0, close - 1.0, close, 1_000.0)
        })
        .collect()
}

fn all_indicators() -> Vec<IndicatorRequest> {
    ["sma", "ema", "rsi", "stochastic", "macd", "bollinger", "ichimoku"].into_iter().map(IndicatorRequest::new).collect()
}

#[tokio::test]
async fn test_candles_are_fetched_once_per_request() {
    let provider = FixedProvider { symbol: "ACME", candles: rising_candles(120), fetches: AtomicUsize::new(0) };
    let service = IndicatorService::with_defaults(provider);

    let options = CalculateOptions::new("ACME", TimeFrame::Day1, all_indicators()).with_signals();
    let snapshots = service.calculate_indicators(options).await.unwrap();

    assert_eq!(snapshots.len(), 7);
    assert!(snapshots.values().all(|s| s.ready));
    assert_eq!(service.provider().fetches.load(Ordering::SeqCst), 1);

    // a steady uptrend sits above a green cloud with tenkan over kijun
    match snapshots["ichimoku"].signal {
        Some(Signal::Ichimoku(IchimokuSignal { trend, .. })) => assert_eq!(trend, Trend::StrongBullish),
        ref other => panic!("unexpected signal {:?}", other),
    }
}

#[tokio::test]
async fn test_time_series_tracks_every_candle() {
    let candles = rising_candles(90);
    let provider = FixedProvider { symbol: "ACME", candles: candles.clone(), fetches: AtomicUsize::new(0) };
    let service = IndicatorService::with_defaults(provider);

    let options = CalculateOptions::new("ACME", TimeFrame::Day1, all_indicators());
    let series = service.get_indicator_time_series(options.clone()).await.unwrap();
    let snapshots = service.calculate_indicators(options).await.unwrap();

    for (id, points) in &series {
        assert_eq!(points.len(), candles.len(), "{}", id);
        assert!(points[0].values.is_empty(), "{}", id);
        assert_eq!(points.last().unwrap().values, snapshots[id].values, "{}", id);
    }

    // ichimoku senkou values only appear once leadingB history exists and is projected
    let ichimoku = &series["ichimoku"];
    assert!(ichimoku[51 + 26 - 1].values.get("senkouB").is_none());
    assert!(ichimoku[51 + 26].values.get("senkouB").is_some());
}

#[tokio::test]
async fn test_unknown_symbol_and_key_are_reported() {
    let provider = FixedProvider { symbol: "ACME", candles: rising_candles(10), fetches: AtomicUsize::new(0) };
    let service = IndicatorService::with_defaults(provider);

    let missing = CalculateOptions::new("OTHER", TimeFrame::Day1, vec![IndicatorRequest::new("sma")]);
    assert!(matches!(service.calculate_indicators(missing).await, Err(EngineError::DataUnavailable(_))));

    let unknown = CalculateOptions::new("ACME", TimeFrame::Day1, vec![IndicatorRequest::new("supertrend")]);
    let err = service.calculate_indicators(unknown).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownIndicator(_)));
    assert!(err.is_rejected_request());
    assert_eq!(service.provider().fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_csv_file_through_store_to_snapshot() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "timestamp;open;high;low;close;volume").unwrap();
    for (i, close) in [10.0, 11.0, 12.0, 13.0, 14.0, 15.0].iter().enumerate() {
        writeln!(file, "2024-02-0{} 00:00:00;{:.1};{:.1};{:.1};{:.1};100", i + 1, close, close + 0.5, close - 0.5, close)
            .unwrap();
    }

    let candles = CsvCandleLoader::new(b';', false).load_candles_from_csv(file.path()).unwrap();
    let mut store = MarketDataStore::new();
    store.add_candles("CSV", TimeFrame::Day1, candles);
    let provider = StoreDataProvider::new(Arc::new(RwLock::new(store)));
    let settings = EngineSettings { history_margin: 0, ..EngineSettings::default() };
    let service = IndicatorService::new(provider, &settings);

    let options = CalculateOptions::new(
        "CSV",
        TimeFrame::Day1,
        vec![IndicatorRequest::new("sma").with_params(json!({ "period": 3 }))],
    )
    .with_signals();
    let snapshot = &service.calculate_indicators(options).await.unwrap()["sma"];

    assert!(snapshot.ready);
    assert_eq!(snapshot.values.get("value"), Some(14.0));
    assert_eq!(snapshot.timestamp, Some(Utc.with_ymd_and_hms(2024, 2, 6, 0, 0, 0).unwrap()));
    let value = serde_json::to_value(snapshot).unwrap();
    assert_eq!(value["signal"], json!({ "type": "price_vs_average", "bias": "bullish" }));
}
