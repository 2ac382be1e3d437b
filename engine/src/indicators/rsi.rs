// Relative Strength Index (RSI) indicator implementation
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::Candle;

use super::{validate_candle, Indicator, IndicatorResult};
use crate::error::{EngineError, Result};
use crate::registry::IndicatorKind;
use crate::signals::{interpret_oscillator, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RsiParams {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self { period: 14, overbought: 70.0, oversold: 30.0 }
    }
}

impl RsiParams {
    pub fn validate(&self) -> Result<()> {
        let key = IndicatorKind::Rsi.key();
        if self.period == 0 {
            return Err(EngineError::invalid_parameter(key, "period must be greater than 0"));
        }
        if !(0.0..=100.0).contains(&self.oversold) || !(0.0..=100.0).contains(&self.overbought) {
            return Err(EngineError::invalid_parameter(key, "thresholds must lie within 0..=100"));
        }
        if self.oversold >= self.overbought {
            return Err(EngineError::invalid_parameter(key, "oversold must be below overbought"));
        }
        Ok(())
    }
}

/// Wilder-smoothed RSI.
///
/// The first value needs `period` price changes, i.e. `period + 1` closes.
pub struct Rsi {
    name: String,
    params: RsiParams,
    previous_close: Option<f64>,
    changes_seen: usize,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
}

impl Rsi {
    pub fn new(params: RsiParams) -> Self {
        Self {
            name: format!("RSI({})", params.period),
            params,
            previous_close: None,
            changes_seen: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: None,
            avg_loss: None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        let (avg_gain, avg_loss) = (self.avg_gain?, self.avg_loss?);
        if avg_loss == 0.0 {
            // no losses in the window
            return Some(100.0);
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }

    fn push_change(&mut self, change: f64) {
        let period = self.params.period as f64;
        let (gain, loss) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };
        match (self.avg_gain, self.avg_loss) {
            (Some(avg_gain), Some(avg_loss)) => {
                self.avg_gain = Some((avg_gain * (period - 1.0) + gain) / period);
                self.avg_loss = Some((avg_loss * (period - 1.0) + loss) / period);
            }
            _ => {
                self.gain_sum += gain;
                self.loss_sum += loss;
                self.changes_seen += 1;
                if self.changes_seen == self.params.period {
                    self.avg_gain = Some(self.gain_sum / period);
                    self.avg_loss = Some(self.loss_sum / period);
                }
            }
        }
    }
}

impl Indicator for Rsi {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Rsi
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "period": self.params.period,
            "overbought": self.params.overbought,
            "oversold": self.params.oversold,
        })
    }

    fn update(&mut self, candle: &Candle) -> Result<()> {
        validate_candle(candle)?;
        if let Some(previous) = self.previous_close {
            if self.params.period > 0 {
                self.push_change(candle.close - previous);
            }
        }
        self.previous_close = Some(candle.close);
        Ok(())
    }

    fn result(&self) -> IndicatorResult {
        IndicatorResult::new().with("value", self.value())
    }

    fn signal(&self) -> Option<Signal> {
        interpret_oscillator(self.value(), self.params.overbought, self.params.oversold)
    }

    fn is_ready(&self) -> bool {
        self.avg_gain.is_some()
    }

    fn reset(&mut self) {
        self.previous_close = None;
        self.changes_seen = 0;
        self.gain_sum = 0.0;
        self.loss_sum = 0.0;
        self.avg_gain = None;
        self.avg_loss = None;
    }
}
