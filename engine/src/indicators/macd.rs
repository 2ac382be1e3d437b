// Moving Average Convergence Divergence (MACD) implementation
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::Candle;

use super::ema::EmaLine;
use super::{validate_candle, zip_with, Indicator, IndicatorResult};
use crate::error::{EngineError, Result};
use crate::registry::IndicatorKind;
use crate::signals::{interpret_macd, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct MacdParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self { fast_period: 12, slow_period: 26, signal_period: 9 }
    }
}

impl MacdParams {
    pub fn validate(&self) -> Result<()> {
        let key = IndicatorKind::Macd.key();
        if self.fast_period == 0 || self.slow_period == 0 || self.signal_period == 0 {
            return Err(EngineError::invalid_parameter(key, "periods must be greater than 0"));
        }
        if self.fast_period >= self.slow_period {
            return Err(EngineError::invalid_parameter(key, "fastPeriod must be below slowPeriod"));
        }
        Ok(())
    }
}

pub struct Macd {
    name: String,
    params: MacdParams,
    fast: EmaLine,
    slow: EmaLine,
    signal_line: EmaLine,
    macd: Option<f64>,
}

impl Macd {
    pub fn new(params: MacdParams) -> Self {
        Self {
            name: format!("MACD({},{},{})", params.fast_period, params.slow_period, params.signal_period),
            params,
            fast: EmaLine::new(params.fast_period),
            slow: EmaLine::new(params.slow_period),
            signal_line: EmaLine::new(params.signal_period),
            macd: None,
        }
    }

    pub fn macd(&self) -> Option<f64> {
        self.macd
    }

    pub fn signal_value(&self) -> Option<f64> {
        self.signal_line.value()
    }

    pub fn histogram(&self) -> Option<f64> {
        zip_with(self.macd, self.signal_value(), |m, s| m - s)
    }
}

impl Indicator for Macd {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Macd
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::to_value(self.params).unwrap_or_default()
    }

    fn update(&mut self, candle: &Candle) -> Result<()> {
        validate_candle(candle)?;
        let fast = self.fast.push(candle.close);
        let slow = self.slow.push(candle.close);
        self.macd = zip_with(fast, slow, |f, s| f - s);
        if let Some(macd) = self.macd {
            self.signal_line.push(macd);
        }
        Ok(())
    }

    fn result(&self) -> IndicatorResult {
        IndicatorResult::new()
            .with("macd", self.macd())
            .with("signal", self.signal_value())
            .with("histogram", self.histogram())
    }

    fn signal(&self) -> Option<Signal> {
        interpret_macd(self.macd(), self.signal_value(), self.histogram())
    }

    fn is_ready(&self) -> bool {
        self.macd.is_some()
    }

    fn reset(&mut self) {
        self.fast.clear();
        self.slow.clear();
        self.signal_line.clear();
        self.macd = None;
    }
}
