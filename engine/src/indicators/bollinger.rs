// Bollinger Bands implementation
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::Candle;

use super::window::RollingWindow;
use super::{validate_candle, Indicator, IndicatorResult};
use crate::error::{EngineError, Result};
use crate::registry::IndicatorKind;
use crate::signals::{interpret_bands, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct BollingerParams {
    pub period: usize,
    pub std_dev: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self { period: 20, std_dev: 2.0 }
    }
}

impl BollingerParams {
    pub fn validate(&self) -> Result<()> {
        let key = IndicatorKind::Bollinger.key();
        if self.period == 0 {
            return Err(EngineError::invalid_parameter(key, "period must be greater than 0"));
        }
        if !self.std_dev.is_finite() || self.std_dev <= 0.0 {
            return Err(EngineError::invalid_parameter(key, "stdDev must be a positive number"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

pub struct BollingerBands {
    name: String,
    params: BollingerParams,
    window: RollingWindow,
    last_close: Option<f64>,
}

impl BollingerBands {
    pub fn new(params: BollingerParams) -> Self {
        Self {
            name: format!("BB({},{})", params.period, params.std_dev),
            params,
            window: RollingWindow::new(params.period),
            last_close: None,
        }
    }

    pub fn bands(&self) -> Option<Bands> {
        let middle = self.window.mean()?;
        let offset = self.window.std_dev()? * self.params.std_dev;
        Some(Bands { upper: middle + offset, middle, lower: middle - offset })
    }

    /// `(upper - lower) / middle`, unavailable for a zero middle band.
    pub fn bandwidth(&self) -> Option<f64> {
        let bands = self.bands()?;
        (bands.middle != 0.0).then(|| (bands.upper - bands.lower) / bands.middle)
    }
}

impl Indicator for BollingerBands {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Bollinger
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::to_value(self.params).unwrap_or_default()
    }

    fn update(&mut self, candle: &Candle) -> Result<()> {
        validate_candle(candle)?;
        self.window.push(candle.close);
        self.last_close = Some(candle.close);
        Ok(())
    }

    fn result(&self) -> IndicatorResult {
        let bands = self.bands();
        IndicatorResult::new()
            .with("upper", bands.map(|b| b.upper))
            .with("middle", bands.map(|b| b.middle))
            .with("lower", bands.map(|b| b.lower))
            .with("bandwidth", self.bandwidth())
    }

    fn signal(&self) -> Option<Signal> {
        let bands = self.bands();
        interpret_bands(self.last_close, bands.map(|b| b.upper), bands.map(|b| b.lower))
    }

    fn is_ready(&self) -> bool {
        self.window.is_full()
    }

    fn reset(&mut self) {
        self.window.clear();
        self.last_close = None;
    }
}
