// Simple Moving Average (SMA) indicator implementation
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::Candle;

use super::window::RollingWindow;
use super::{validate_candle, Indicator, IndicatorResult};
use crate::error::{EngineError, Result};
use crate::registry::IndicatorKind;
use crate::signals::{interpret_average, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmaParams {
    pub period: usize,
}

impl Default for SmaParams {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl SmaParams {
    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(EngineError::invalid_parameter(IndicatorKind::Sma.key(), "period must be greater than 0"));
        }
        Ok(())
    }
}

pub struct Sma {
    name: String,
    params: SmaParams,
    window: RollingWindow,
    last_close: Option<f64>,
}

impl Sma {
    pub fn new(params: SmaParams) -> Self {
        Self {
            name: format!("SMA({})", params.period),
            params,
            window: RollingWindow::new(params.period),
            last_close: None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.window.mean()
    }
}

impl Indicator for Sma {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Sma
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.params.period })
    }

    fn update(&mut self, candle: &Candle) -> Result<()> {
        validate_candle(candle)?;
        self.window.push(candle.close);
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
        self.window.is_full()
    }

    fn reset(&mut self) {
        self.window.clear();
        self.last_close = None;
    }
}
