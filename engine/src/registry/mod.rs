//! Static catalog of every indicator the engine can run.
//!
//! The set of indicators is closed: [`IndicatorKind`] enumerates them and each
//! variant maps to one [`IndicatorMetadata`] entry built once at first use.

pub mod params;

pub use params::IndicatorConfig;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::indicators::{
    BollingerParams, EmaParams, IchimokuParams, MacdParams, RsiParams, SmaParams, StochasticParams,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorCategory {
    Trend,
    Momentum,
    Volatility,
}

impl IndicatorCategory {
    pub const ALL: [IndicatorCategory; 3] =
        [IndicatorCategory::Trend, IndicatorCategory::Momentum, IndicatorCategory::Volatility];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorCategory::Trend => "trend",
            IndicatorCategory::Momentum => "momentum",
            IndicatorCategory::Volatility => "volatility",
        }
    }
}

impl fmt::Display for IndicatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorCategory {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        IndicatorCategory::ALL.into_iter().find(|c| c.as_str() == needle).ok_or_else(|| {
            EngineError::UnknownCategory {
                category: s.to_string(),
                valid: IndicatorCategory::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Stochastic,
    Macd,
    Bollinger,
    Ichimoku,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 7] = [
        IndicatorKind::Sma,
        IndicatorKind::Ema,
        IndicatorKind::Rsi,
        IndicatorKind::Stochastic,
        IndicatorKind::Macd,
        IndicatorKind::Bollinger,
        IndicatorKind::Ichimoku,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Stochastic => "stochastic",
            IndicatorKind::Macd => "macd",
            IndicatorKind::Bollinger => "bollinger",
            IndicatorKind::Ichimoku => "ichimoku",
        }
    }

    pub fn category(&self) -> IndicatorCategory {
        match self {
            IndicatorKind::Sma | IndicatorKind::Ema | IndicatorKind::Ichimoku => IndicatorCategory::Trend,
            IndicatorKind::Rsi | IndicatorKind::Stochastic | IndicatorKind::Macd => IndicatorCategory::Momentum,
            IndicatorKind::Bollinger => IndicatorCategory::Volatility,
        }
    }

    pub fn metadata(&self) -> &'static IndicatorMetadata {
        let index = IndicatorKind::ALL.iter().position(|k| k == self).unwrap_or_default();
        &catalog_entries()[index]
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for IndicatorKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        IndicatorKind::ALL
            .into_iter()
            .find(|k| k.key() == needle)
            .ok_or_else(|| EngineError::UnknownIndicator(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Integer,
    Number,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: &'static str,
    pub default: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl ParamSpec {
    fn period(name: &'static str, description: &'static str, default: usize) -> Self {
        Self {
            name,
            param_type: ParamType::Integer,
            description,
            default: Value::from(default),
            minimum: Some(1.0),
            maximum: None,
        }
    }

    fn number(name: &'static str, description: &'static str, default: f64, range: (Option<f64>, Option<f64>)) -> Self {
        Self {
            name,
            param_type: ParamType::Number,
            description,
            default: Value::from(default),
            minimum: range.0,
            maximum: range.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorMetadata {
    pub key: &'static str,
    pub name: &'static str,
    pub category: IndicatorCategory,
    pub description: &'static str,
    pub parameters: Vec<ParamSpec>,
    /// Parameter object used when the caller supplies none.
    pub defaults: Value,
    pub output_fields: Vec<&'static str>,
}

pub type Catalog = BTreeMap<IndicatorCategory, Vec<IndicatorMetadata>>;

fn defaults_of<T: Serialize>(params: T) -> Value {
    serde_json::to_value(params).unwrap_or_default()
}

fn build_metadata(kind: IndicatorKind) -> IndicatorMetadata {
    let (name, description, parameters, defaults, output_fields) = match kind {
        IndicatorKind::Sma => {
            let d = SmaParams::default();
            (
                "Simple Moving Average",
                "Arithmetic mean of the last `period` closes.",
                vec![ParamSpec::period("period", "Number of closes averaged", d.period)],
                defaults_of(d),
                vec!["value"],
            )
        }
        IndicatorKind::Ema => {
            let d = EmaParams::default();
            (
                "Exponential Moving Average",
                "Exponentially weighted mean of closes, seeded with the SMA of the first `period` closes.",
                vec![ParamSpec::period("period", "Smoothing period", d.period)],
                defaults_of(d),
                vec!["value"],
            )
        }
        IndicatorKind::Rsi => {
            let d = RsiParams::default();
            (
                "Relative Strength Index",
                "Wilder-smoothed ratio of average gains to average losses, scaled to 0..100.",
                vec![
                    ParamSpec::period("period", "Number of price changes averaged", d.period),
                    ParamSpec::number("overbought", "Overbought threshold", d.overbought, (Some(0.0), Some(100.0))),
                    ParamSpec::number("oversold", "Oversold threshold", d.oversold, (Some(0.0), Some(100.0))),
                ],
                defaults_of(d),
                vec!["value"],
            )
        }
        IndicatorKind::Stochastic => {
            let d = StochasticParams::default();
            (
                "Stochastic Oscillator",
                "Position of the close within the recent high/low range (%K) and its moving average (%D).",
                vec![
                    ParamSpec::period("kPeriod", "Lookback for the high/low range", d.k_period),
                    ParamSpec::period("dPeriod", "Moving average length applied to %K", d.d_period),
                    ParamSpec::number("overbought", "Overbought threshold", d.overbought, (Some(0.0), Some(100.0))),
                    ParamSpec::number("oversold", "Oversold threshold", d.oversold, (Some(0.0), Some(100.0))),
                ],
                defaults_of(d),
                vec!["k", "d"],
            )
        }
        IndicatorKind::Macd => {
            let d = MacdParams::default();
            (
                "Moving Average Convergence Divergence",
                "Difference between a fast and a slow EMA, with an EMA signal line and histogram.",
                vec![
                    ParamSpec::period("fastPeriod", "Fast EMA period", d.fast_period),
                    ParamSpec::period("slowPeriod", "Slow EMA period", d.slow_period),
                    ParamSpec::period("signalPeriod", "Signal line EMA period", d.signal_period),
                ],
                defaults_of(d),
                vec!["macd", "signal", "histogram"],
            )
        }
        IndicatorKind::Bollinger => {
            let d = BollingerParams::default();
            (
                "Bollinger Bands",
                "SMA of closes with bands a multiple of the population standard deviation away.",
                vec![
                    ParamSpec::period("period", "Window length", d.period),
                    ParamSpec::number("stdDev", "Band width in standard deviations", d.std_dev, (Some(0.0), None)),
                ],
                defaults_of(d),
                vec!["upper", "middle", "lower", "bandwidth"],
            )
        }
        IndicatorKind::Ichimoku => {
            let d = IchimokuParams::default();
            (
                "Ichimoku Kinko Hyo",
                "Conversion and base lines, a cloud projected forward and a lagging close.",
                vec![
                    ParamSpec::period("conversionPeriod", "Tenkan-sen window", d.conversion_period),
                    ParamSpec::period("basePeriod", "Kijun-sen window", d.base_period),
                    ParamSpec::period("leadingBPeriod", "Senkou span B window", d.leading_b_period),
                    ParamSpec::period("displacement", "Forward shift of the cloud and backward shift of the lagging span", d.displacement),
                ],
                defaults_of(d),
                vec!["tenkan", "kijun", "senkouA", "senkouB", "chikou"],
            )
        }
    };

    IndicatorMetadata {
        key: kind.key(),
        name,
        category: kind.category(),
        description,
        parameters,
        defaults,
        output_fields,
    }
}

fn catalog_entries() -> &'static [IndicatorMetadata] {
    static ENTRIES: OnceLock<Vec<IndicatorMetadata>> = OnceLock::new();
    ENTRIES.get_or_init(|| IndicatorKind::ALL.into_iter().map(build_metadata).collect())
}

/// Every indicator grouped by category, optionally narrowed to one category.
pub fn get_catalog(category: Option<&str>) -> Result<Catalog> {
    let filter = category.map(str::parse::<IndicatorCategory>).transpose()?;
    let mut catalog = Catalog::new();
    for entry in catalog_entries() {
        if filter.map_or(true, |c| c == entry.category) {
            catalog.entry(entry.category).or_default().push(entry.clone());
        }
    }
    Ok(catalog)
}

/// Metadata for `key`, or `None` for an unknown key.
pub fn get_indicator_metadata(key: &str) -> Option<&'static IndicatorMetadata> {
    key.parse::<IndicatorKind>().ok().map(|kind| kind.metadata())
}
