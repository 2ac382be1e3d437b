// Exponential Moving Average (EMA) indicator implementation
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::Candle;

use super::{validate_candle, Indicator, IndicatorResult};
use crate::error::{EngineError, Result};
use crate::registry::IndicatorKind;
use crate::signals::{interpret_average, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmaParams {
    pub period: usize,
}

impl Default for EmaParams {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl EmaParams {
    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(EngineError::invalid_parameter(IndicatorKind::Ema.key(), "period must be greater than 0"));
        }
        Ok(())
    }
}

/// Incremental EMA over a stream of plain values.
///
/// The first value is the SMA of the first `period` inputs, after which each
/// input moves the average by `2 / (period + 1)` of the difference.
#[derive(Debug, Clone)]
pub(crate) struct EmaLine {
    period: usize,
    multiplier: f64,
    seed_sum: f64,
    seen: usize,
    value: Option<f64>,
}

impl EmaLine {
    pub(crate) fn new(period: usize) -> Self {
        Self { period, multiplier: 2.0 / (period as f64 + 1.0), seed_sum: 0.0, seen: 0, value: None }
    }

    pub(crate) fn push(&mut self, input: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        match self.value {
            Some(previous) => {
                self.value = Some((input - previous) * self.multiplier + previous);
            }
            None => {
                self.seed_sum += input;
                self.seen += 1;
                if self.seen == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }

    pub(crate) fn value(&self) -> Option<f64> {
        self.value
    }

    pub(crate) fn clear(&mut self) {
        self.seed_sum = 0.0;
        self.seen = 0;
        self.value = None;
    }
}

pub struct Ema {
    name: String,
    params: EmaParams,
    line: EmaLine,
    last_close: Option<f64>,
}

impl Ema {
    pub fn new(params: EmaParams) -> Self {
        Self {
            name: format!("EMA({})", params.period),
            params,
            line: EmaLine::new(params.period),
            last_close: None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.line.value()
    }
}

impl Indicator for Ema {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Ema
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.params.period })
    }

    fn update(&mut self, candle: &Candle) -> Result<()> {
        validate_candle(candle)?;
        self.line.push(candle.close);
        self.last_close = Some(candle.close);
        Ok(())
    }

    fn result(&self) -> IndicatorResult {
        IndicatorResult::new().with("value", self.value())
    }

    fn signal(&self) -> Option<Signal> {
        interpret_average(self.last_close, self.value())
    }

    fn is_ready(&self) -> bool {
        self.line.value().is_some()
    }

    fn reset(&mut self) {
        self.line.clear();
        self.last_close = None;
    }
}
