// Stochastic oscillator (%K / %D) implementation
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::Candle;

use super::window::{rolling_extrema, trim_front, RollingWindow};
use super::{validate_candle, Indicator, IndicatorResult};
use crate::error::{EngineError, Result};
use crate::registry::IndicatorKind;
use crate::signals::{interpret_stochastic, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct StochasticParams {
    pub k_period: usize,
    pub d_period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for StochasticParams {
    fn default() -> Self {
        Self { k_period: 14, d_period: 3, overbought: 80.0, oversold: 20.0 }
    }
}

impl StochasticParams {
    pub fn validate(&self) -> Result<()> {
        let key = IndicatorKind::Stochastic.key();
        if self.k_period == 0 || self.d_period == 0 {
            return Err(EngineError::invalid_parameter(key, "kPeriod and dPeriod must be greater than 0"));
        }
        if self.oversold >= self.overbought {
            return Err(EngineError::invalid_parameter(key, "oversold must be below overbought"));
        }
        Ok(())
    }
}

pub struct Stochastic {
    name: String,
    params: StochasticParams,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
    k: Option<f64>,
    k_history: RollingWindow,
}

impl Stochastic {
    pub fn new(params: StochasticParams) -> Self {
        Self {
            name: format!("Stochastic({},{})", params.k_period, params.d_period),
            params,
            highs: VecDeque::with_capacity(params.k_period + 1),
            lows: VecDeque::with_capacity(params.k_period + 1),
            k: None,
            k_history: RollingWindow::new(params.d_period),
        }
    }

    pub fn k(&self) -> Option<f64> {
        self.k
    }

    /// %D, the simple average of the last `d_period` %K values.
    pub fn d(&self) -> Option<f64> {
        self.k_history.mean()
    }
}

impl Indicator for Stochastic {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Stochastic
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::to_value(self.params).unwrap_or_default()
    }

    fn update(&mut self, candle: &Candle) -> Result<()> {
        validate_candle(candle)?;
        self.highs.push_back(candle.high);
        self.lows.push_back(candle.low);
        trim_front(&mut self.highs, self.params.k_period);
        trim_front(&mut self.lows, self.params.k_period);

        let highest = rolling_extrema(&self.highs, self.params.k_period).map(|e| e.max);
        let lowest = rolling_extrema(&self.lows, self.params.k_period).map(|e| e.min);
        self.k = match (highest, lowest) {
            (Some(high), Some(low)) if high > low => Some((candle.close - low) / (high - low) * 100.0),
            // flat range
            (Some(_), Some(_)) => Some(50.0),
            _ => None,
        };
        if let Some(k) = self.k {
            self.k_history.push(k);
        }
        Ok(())
    }

    fn result(&self) -> IndicatorResult {
        IndicatorResult::new().with("k", self.k()).with("d", self.d())
    }

    fn signal(&self) -> Option<Signal> {
        interpret_stochastic(self.k(), self.d(), self.params.overbought, self.params.oversold)
    }

    fn is_ready(&self) -> bool {
        self.k.is_some()
    }

    fn reset(&mut self) {
        self.highs.clear();
        self.lows.clear();
        self.k = None;
        self.k_history.clear();
    }
}
