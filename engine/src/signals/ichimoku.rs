// Ichimoku cloud interpretation
use serde::Serialize;

use super::Bias;
use crate::indicators::IchimokuValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudColor {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceVsCloud {
    Above,
    Below,
    Inside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IchimokuSignal {
    pub cloud_color: CloudColor,
    pub price_vs_cloud: PriceVsCloud,
    pub cross: Bias,
    pub trend: Trend,
}

/// Reads the cloud against `close`.
///
/// Needs tenkan, kijun, both leading spans and the close; returns `None` if
/// any of them is unavailable. The lagging span is not consulted.
pub fn interpret_ichimoku(values: &IchimokuValues, close: Option<f64>) -> Option<IchimokuSignal> {
    let tenkan = values.tenkan?;
    let kijun = values.kijun?;
    let span_a = values.senkou_a?;
    let span_b = values.senkou_b?;
    let close = close?;

    // equal spans resolve to bearish
    let cloud_color = if span_a > span_b { CloudColor::Bullish } else { CloudColor::Bearish };

    let price_vs_cloud = if close > span_a.max(span_b) {
        PriceVsCloud::Above
    } else if close < span_a.min(span_b) {
        PriceVsCloud::Below
    } else {
        PriceVsCloud::Inside
    };

    let cross = Bias::compare(tenkan, kijun);

    let trend = match (price_vs_cloud, cloud_color, cross) {
        (PriceVsCloud::Above, CloudColor::Bullish, Bias::Bullish) => Trend::StrongBullish,
        (PriceVsCloud::Below, CloudColor::Bearish, Bias::Bearish) => Trend::StrongBearish,
        (PriceVsCloud::Above, _, _) => Trend::Bullish,
        (PriceVsCloud::Below, _, _) => Trend::Bearish,
        (PriceVsCloud::Inside, _, _) => Trend::Neutral,
    };

    Some(IchimokuSignal { cloud_color, price_vs_cloud, cross, trend })
}
