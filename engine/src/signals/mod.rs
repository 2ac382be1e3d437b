//! Qualitative readings derived from the latest indicator values.
//!
//! Every function here is pure and fails soft: a missing input yields `None`,
//! never an error. Signals are recomputed on demand and never stored.

pub mod ichimoku;

pub use ichimoku::{interpret_ichimoku, CloudColor, IchimokuSignal, PriceVsCloud, Trend};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl Bias {
    /// `Bullish` when `a > b`, `Bearish` when `a < b`, otherwise `Neutral`.
    pub fn compare(a: f64, b: f64) -> Self {
        if a > b {
            Bias::Bullish
        } else if a < b {
            Bias::Bearish
        } else {
            Bias::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Overbought,
    Oversold,
    Neutral,
}

impl Zone {
    pub fn classify(value: f64, overbought: f64, oversold: f64) -> Self {
        if value >= overbought {
            Zone::Overbought
        } else if value <= oversold {
            Zone::Oversold
        } else {
            Zone::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPosition {
    AboveUpper,
    BelowLower,
    Inside,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    /// Close relative to a moving average.
    PriceVsAverage { bias: Bias },
    Oscillator { zone: Zone },
    Stochastic { zone: Zone, cross: Bias },
    Macd { bias: Bias, cross: Bias },
    Bands { position: BandPosition },
    Ichimoku(IchimokuSignal),
}

pub fn interpret_average(close: Option<f64>, average: Option<f64>) -> Option<Signal> {
    Some(Signal::PriceVsAverage { bias: Bias::compare(close?, average?) })
}

pub fn interpret_oscillator(value: Option<f64>, overbought: f64, oversold: f64) -> Option<Signal> {
    Some(Signal::Oscillator { zone: Zone::classify(value?, overbought, oversold) })
}

pub fn interpret_stochastic(k: Option<f64>, d: Option<f64>, overbought: f64, oversold: f64) -> Option<Signal> {
    let (k, d) = (k?, d?);
    Some(Signal::Stochastic { zone: Zone::classify(k, overbought, oversold), cross: Bias::compare(k, d) })
}

pub fn interpret_macd(macd: Option<f64>, signal: Option<f64>, histogram: Option<f64>) -> Option<Signal> {
    Some(Signal::Macd { bias: Bias::compare(histogram?, 0.0), cross: Bias::compare(macd?, signal?) })
}

pub fn interpret_bands(close: Option<f64>, upper: Option<f64>, lower: Option<f64>) -> Option<Signal> {
    let (close, upper, lower) = (close?, upper?, lower?);
    let position = if close > upper {
        BandPosition::AboveUpper
    } else if close < lower {
        BandPosition::BelowLower
    } else {
        BandPosition::Inside
    };
    Some(Signal::Bands { position })
}
