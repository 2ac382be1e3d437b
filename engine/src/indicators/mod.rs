// Streaming technical indicators
pub mod bollinger;
pub mod ema;
pub mod ichimoku;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod window;

pub use bollinger::{BollingerBands, BollingerParams};
pub use ema::{Ema, EmaParams};
pub use ichimoku::{IchimokuCloud, IchimokuParams, IchimokuValues, DEFAULT_HISTORY_MARGIN};
pub use macd::{Macd, MacdParams};
pub use rsi::{Rsi, RsiParams};
pub use sma::{Sma, SmaParams};
pub use stochastic::{Stochastic, StochasticParams};
pub use window::{rolling_extrema, rolling_midpoint, Extrema, RollingWindow};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use shared::models::Candle;

use crate::error::{EngineError, Result};
use crate::registry::IndicatorKind;
use crate::signals::Signal;

/// A running indicator instance for one symbol, timeframe and parameter set.
///
/// Instances are advanced strictly in candle order. `update` takes `&mut self`,
/// so an instance is never advanced from two places at once.
pub trait Indicator: Send + Sync {
    fn kind(&self) -> IndicatorKind;

    fn name(&self) -> &str;

    /// Parameters this instance was built with, defaults already merged.
    fn parameters(&self) -> Value;

    /// Feeds the next candle. A malformed candle is rejected with
    /// [`EngineError::InvalidInput`] and the instance is left untouched.
    fn update(&mut self, candle: &Candle) -> Result<()>;

    /// Current time-aligned view of every output field.
    fn result(&self) -> IndicatorResult;

    /// Interpretation of [`Indicator::result`] against the latest close, or
    /// `None` while any required input is unavailable.
    fn signal(&self) -> Option<Signal>;

    fn is_ready(&self) -> bool;

    /// Clears all history. Configuration is kept.
    fn reset(&mut self);
}

/// Ordered `field -> value` snapshot. `None` means "not available yet".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndicatorResult {
    fields: Vec<(&'static str, Option<f64>)>,
}

impl IndicatorResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &'static str, value: Option<f64>) -> Self {
        self.fields.push((field, value));
        self
    }

    /// Value of `field`; `None` both for unknown fields and unavailable values.
    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.iter().find(|(name, _)| *name == field).and_then(|(_, v)| *v)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| *name == field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Option<f64>)> + '_ {
        self.fields.iter().copied()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }

    /// True when every field is unavailable.
    pub fn is_empty(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_none())
    }
}

impl Serialize for IndicatorResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Rejects candles whose high/low/close cannot feed indicator math.
pub(crate) fn validate_candle(candle: &Candle) -> Result<()> {
    match candle.defect() {
        None => Ok(()),
        Some(field) => Err(EngineError::InvalidInput(format!(
            "candle at {} has unusable {}",
            candle.timestamp, field
        ))),
    }
}

/// Combines two optional values, short-circuiting to `None`.
pub(crate) fn zip_with(a: Option<f64>, b: Option<f64>, f: impl FnOnce(f64, f64) -> f64) -> Option<f64> {
    Some(f(a?, b?))
}
