// Typed parameter resolution: caller JSON merged over registry defaults
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::IndicatorKind;
use crate::error::{EngineError, Result};
use crate::indicators::{
    BollingerBands, BollingerParams, Ema, EmaParams, IchimokuCloud, IchimokuParams, Indicator, Macd, MacdParams,
    Rsi, RsiParams, Sma, SmaParams, Stochastic, StochasticParams,
};

/// A fully resolved, validated indicator configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorConfig {
    Sma(SmaParams),
    Ema(EmaParams),
    Rsi(RsiParams),
    Stochastic(StochasticParams),
    Macd(MacdParams),
    Bollinger(BollingerParams),
    Ichimoku(IchimokuParams),
}

/// Deserializes `params` over `T::default()`; absent keys keep their default.
fn merge<T>(kind: IndicatorKind, params: Option<&Value>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match params {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
            .map_err(|e| EngineError::invalid_parameter(kind.key(), e.to_string())),
        Some(other) => Err(EngineError::invalid_parameter(
            kind.key(),
            format!("parameters must be a JSON object, got {}", other),
        )),
    }
}

impl IndicatorConfig {
    /// Defaults for `kind`.
    pub fn defaults(kind: IndicatorKind) -> Self {
        match kind {
            IndicatorKind::Sma => IndicatorConfig::Sma(SmaParams::default()),
            IndicatorKind::Ema => IndicatorConfig::Ema(EmaParams::default()),
            IndicatorKind::Rsi => IndicatorConfig::Rsi(RsiParams::default()),
            IndicatorKind::Stochastic => IndicatorConfig::Stochastic(StochasticParams::default()),
            IndicatorKind::Macd => IndicatorConfig::Macd(MacdParams::default()),
            IndicatorKind::Bollinger => IndicatorConfig::Bollinger(BollingerParams::default()),
            IndicatorKind::Ichimoku => IndicatorConfig::Ichimoku(IchimokuParams::default()),
        }
    }

    /// Merges caller-supplied `params` over the defaults of `kind` and validates
    /// the result. Unknown keys and out-of-range values are rejected.
    pub fn resolve(kind: IndicatorKind, params: Option<&Value>) -> Result<Self> {
        let config = match kind {
            IndicatorKind::Sma => {
                let p: SmaParams = merge(kind, params)?;
                p.validate()?;
                IndicatorConfig::Sma(p)
            }
            IndicatorKind::Ema => {
                let p: EmaParams = merge(kind, params)?;
                p.validate()?;
                IndicatorConfig::Ema(p)
            }
            IndicatorKind::Rsi => {
                let p: RsiParams = merge(kind, params)?;
                p.validate()?;
                IndicatorConfig::Rsi(p)
            }
            IndicatorKind::Stochastic => {
                let p: StochasticParams = merge(kind, params)?;
                p.validate()?;
                IndicatorConfig::Stochastic(p)
            }
            IndicatorKind::Macd => {
                let p: MacdParams = merge(kind, params)?;
                p.validate()?;
                IndicatorConfig::Macd(p)
            }
            IndicatorKind::Bollinger => {
                let p: BollingerParams = merge(kind, params)?;
                p.validate()?;
                IndicatorConfig::Bollinger(p)
            }
            IndicatorKind::Ichimoku => {
                let p: IchimokuParams = merge(kind, params)?;
                p.validate()?;
                IndicatorConfig::Ichimoku(p)
            }
        };
        Ok(config)
    }

    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorConfig::Sma(_) => IndicatorKind::Sma,
            IndicatorConfig::Ema(_) => IndicatorKind::Ema,
            IndicatorConfig::Rsi(_) => IndicatorKind::Rsi,
            IndicatorConfig::Stochastic(_) => IndicatorKind::Stochastic,
            IndicatorConfig::Macd(_) => IndicatorKind::Macd,
            IndicatorConfig::Bollinger(_) => IndicatorKind::Bollinger,
            IndicatorConfig::Ichimoku(_) => IndicatorKind::Ichimoku,
        }
    }

    /// Merged parameters as a JSON object.
    pub fn to_value(&self) -> Value {
        fn value_of<T: Serialize>(params: &T) -> Value {
            serde_json::to_value(params).unwrap_or_default()
        }
        match self {
            IndicatorConfig::Sma(p) => value_of(p),
            IndicatorConfig::Ema(p) => value_of(p),
            IndicatorConfig::Rsi(p) => value_of(p),
            IndicatorConfig::Stochastic(p) => value_of(p),
            IndicatorConfig::Macd(p) => value_of(p),
            IndicatorConfig::Bollinger(p) => value_of(p),
            IndicatorConfig::Ichimoku(p) => value_of(p),
        }
    }

    /// Fresh instance with empty history. `history_margin` only affects
    /// indicators that keep displaced history.
    pub fn build(&self, history_margin: usize) -> Box<dyn Indicator> {
        match *self {
            IndicatorConfig::Sma(p) => Box::new(Sma::new(p)),
            IndicatorConfig::Ema(p) => Box::new(Ema::new(p)),
            IndicatorConfig::Rsi(p) => Box::new(Rsi::new(p)),
            IndicatorConfig::Stochastic(p) => Box::new(Stochastic::new(p)),
            IndicatorConfig::Macd(p) => Box::new(Macd::new(p)),
            IndicatorConfig::Bollinger(p) => Box::new(BollingerBands::new(p)),
            IndicatorConfig::Ichimoku(p) => Box::new(IchimokuCloud::with_margin(p, history_margin)),
        }
    }
}
