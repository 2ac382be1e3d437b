// In-memory candle store and the provider that serves from it
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use shared::models::{Candle, TimeFrame};
use tokio::sync::RwLock;

use super::provider::{CandleRange, DataProvider};
use crate::error::{EngineError, Result};

/// Candles per symbol and timeframe, kept sorted and de-duplicated by timestamp.
#[derive(Debug, Default)]
pub struct MarketDataStore {
    data: HashMap<String, HashMap<TimeFrame, Vec<Candle>>>,
}

impl MarketDataStore {
    pub fn new() -> Self {
        MarketDataStore { data: HashMap::new() }
    }

    /// Merges `new_candles` into the series. A candle whose timestamp already
    /// exists replaces the stored one.
    pub fn add_candles(&mut self, symbol: &str, timeframe: TimeFrame, new_candles: Vec<Candle>) -> usize {
        let series = self.data.entry(symbol.to_string()).or_default().entry(timeframe).or_default();

        // later duplicates win, so put the incoming batch first before the stable dedup
        let mut merged = new_candles;
        merged.reverse();
        merged.append(series);
        merged.sort_by_key(|c| c.timestamp);
        merged.dedup_by_key(|c| c.timestamp);
        *series = merged;
        series.len()
    }

    pub fn get_candles(&self, symbol: &str, timeframe: TimeFrame, range: &CandleRange) -> Option<Vec<Candle>> {
        self.data.get(symbol).and_then(|symbol_data| symbol_data.get(&timeframe)).map(|candles| {
            let selected: Vec<Candle> = candles.iter().filter(|c| range.contains(c.timestamp)).copied().collect();
            match range.limit {
                Some(limit) if selected.len() > limit => selected[selected.len() - limit..].to_vec(),
                _ => selected,
            }
        })
    }

    pub fn len(&self, symbol: &str, timeframe: TimeFrame) -> usize {
        self.data.get(symbol).and_then(|s| s.get(&timeframe)).map_or(0, Vec::len)
    }
}

/// [`DataProvider`] backed by a shared [`MarketDataStore`].
#[derive(Debug, Clone, Default)]
pub struct StoreDataProvider {
    store: Arc<RwLock<MarketDataStore>>,
}

impl StoreDataProvider {
    pub fn new(store: Arc<RwLock<MarketDataStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DataProvider for StoreDataProvider {
    async fn fetch_candles(&self, symbol: &str, timeframe: TimeFrame, range: &CandleRange) -> Result<Vec<Candle>> {
        let store = self.store.read().await;
        let candles = store.get_candles(symbol, timeframe, range);
        drop(store);

        match candles {
            None => {
                tracing::warn!(%symbol, %timeframe, "No market data available (symbol/timeframe not found in store)");
                Err(EngineError::DataUnavailable(format!(
                    "Market data not found for symbol '{}' and timeframe {}",
                    symbol, timeframe
                )))
            }
            Some(candles) if candles.is_empty() => {
                tracing::warn!(%symbol, %timeframe, ?range, "No market data found in the given range");
                Err(EngineError::DataUnavailable(format!(
                    "No candles for symbol '{}' and timeframe {} in the requested range",
                    symbol, timeframe
                )))
            }
            Some(candles) => {
                tracing::debug!(%symbol, %timeframe, count = candles.len(), "Serving candles from store");
                Ok(candles)
            }
        }
    }
}
