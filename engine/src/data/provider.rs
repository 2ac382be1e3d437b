// Boundary to whatever supplies historical candles
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{Candle, TimeFrame};

use crate::error::Result;

/// Which candles to fetch. All bounds are inclusive; `limit` keeps only the
/// most recent `limit` candles inside the bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl CandleRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn last(limit: usize) -> Self {
        Self { limit: Some(limit), ..Self::default() }
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from: Some(from), to: Some(to), limit: None }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.from.map_or(true, |start| timestamp >= start) && self.to.map_or(true, |end| timestamp <= end)
    }

    /// Falls back to `limit` when neither bound nor limit was given.
    pub fn or_limit(self, limit: usize) -> Self {
        if self.from.is_none() && self.to.is_none() && self.limit.is_none() {
            Self::last(limit)
        } else {
            self
        }
    }
}

/// Source of historical candles.
///
/// Implementations return candles sorted ascending by timestamp without
/// duplicates, and fail with [`crate::error::EngineError::DataUnavailable`]
/// when nothing can be served.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch_candles(&self, symbol: &str, timeframe: TimeFrame, range: &CandleRange) -> Result<Vec<Candle>>;
}
