// Ichimoku Kinko Hyo (cloud) indicator implementation
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::Candle;

use super::window::{rolling_midpoint, trim_front};
use super::{validate_candle, zip_with, Indicator, IndicatorResult};
use crate::error::{EngineError, Result};
use crate::registry::IndicatorKind;
use crate::signals::{interpret_ichimoku, Signal};

/// Extra raw points kept beyond `max(periods) + displacement`.
pub const DEFAULT_HISTORY_MARGIN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct IchimokuParams {
    pub conversion_period: usize,
    pub base_period: usize,
    pub leading_b_period: usize,
    /// Shift applied forward to the leading spans and backward to the lagging span.
    pub displacement: usize,
}

impl Default for IchimokuParams {
    fn default() -> Self {
        Self { conversion_period: 9, base_period: 26, leading_b_period: 52, displacement: 26 }
    }
}

impl IchimokuParams {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("conversionPeriod", self.conversion_period),
            ("basePeriod", self.base_period),
            ("leadingBPeriod", self.leading_b_period),
            ("displacement", self.displacement),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(EngineError::invalid_parameter(
                    IndicatorKind::Ichimoku.key(),
                    format!("{} must be greater than 0", field),
                ));
            }
        }
        Ok(())
    }

    /// Longest lookback window among the three midpoint lines.
    pub fn max_period(&self) -> usize {
        self.conversion_period.max(self.base_period).max(self.leading_b_period)
    }
}

/// The five lines as they apply to the current candle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IchimokuValues {
    pub tenkan: Option<f64>,
    pub kijun: Option<f64>,
    pub senkou_a: Option<f64>,
    pub senkou_b: Option<f64>,
    pub chikou: Option<f64>,
}

/// Streaming Ichimoku cloud.
///
/// Raw history (highs, lows, closes) and the four computed lines are kept in
/// parallel buffers of equal length: index `i` of a line was computed when
/// raw index `i` was the newest point. All buffers are trimmed together to
/// `max_period + displacement + margin`, which always retains what
/// [`IchimokuCloud::values`] reads for the current head.
#[derive(Debug, Clone)]
pub struct IchimokuCloud {
    name: String,
    params: IchimokuParams,
    capacity: usize,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
    closes: VecDeque<f64>,
    tenkan: VecDeque<Option<f64>>,
    kijun: VecDeque<Option<f64>>,
    senkou_a: VecDeque<Option<f64>>,
    senkou_b: VecDeque<Option<f64>>,
}

impl IchimokuCloud {
    pub fn new(params: IchimokuParams) -> Self {
        Self::with_margin(params, DEFAULT_HISTORY_MARGIN)
    }

    pub fn with_margin(params: IchimokuParams, margin: usize) -> Self {
        let capacity = params.max_period() + params.displacement + margin;
        Self {
            name: format!(
                "Ichimoku({},{},{},{})",
                params.conversion_period, params.base_period, params.leading_b_period, params.displacement
            ),
            params,
            capacity,
            highs: VecDeque::with_capacity(capacity + 1),
            lows: VecDeque::with_capacity(capacity + 1),
            closes: VecDeque::with_capacity(capacity + 1),
            tenkan: VecDeque::with_capacity(capacity + 1),
            kijun: VecDeque::with_capacity(capacity + 1),
            senkou_a: VecDeque::with_capacity(capacity + 1),
            senkou_b: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn params(&self) -> &IchimokuParams {
        &self.params
    }

    /// Upper bound on every buffer's length.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn history_len(&self) -> usize {
        self.closes.len()
    }

    pub fn tenkan_series(&self) -> &VecDeque<Option<f64>> {
        &self.tenkan
    }

    pub fn kijun_series(&self) -> &VecDeque<Option<f64>> {
        &self.kijun
    }

    pub fn senkou_a_series(&self) -> &VecDeque<Option<f64>> {
        &self.senkou_a
    }

    pub fn senkou_b_series(&self) -> &VecDeque<Option<f64>> {
        &self.senkou_b
    }

    pub fn closes(&self) -> &VecDeque<f64> {
        &self.closes
    }

    /// Current view of the cloud.
    ///
    /// Tenkan and kijun are read at the newest index. The leading spans were
    /// projected `displacement` periods ahead when computed, so the values
    /// overlaying the current candle are the ones computed `displacement`
    /// updates ago. The lagging span is the close from `displacement` periods ago.
    pub fn values(&self) -> IchimokuValues {
        let Some(latest) = self.closes.len().checked_sub(1) else {
            return IchimokuValues::default();
        };
        let shifted = latest.checked_sub(self.params.displacement);
        let at = |series: &VecDeque<Option<f64>>, index: Option<usize>| index.and_then(|i| series.get(i).copied().flatten());

        IchimokuValues {
            tenkan: at(&self.tenkan, Some(latest)),
            kijun: at(&self.kijun, Some(latest)),
            senkou_a: at(&self.senkou_a, shifted),
            senkou_b: at(&self.senkou_b, shifted),
            chikou: shifted.and_then(|i| self.closes.get(i).copied()),
        }
    }

    fn trim(&mut self) {
        let capacity = self.capacity;
        trim_front(&mut self.highs, capacity);
        trim_front(&mut self.lows, capacity);
        trim_front(&mut self.closes, capacity);
        trim_front(&mut self.tenkan, capacity);
        trim_front(&mut self.kijun, capacity);
        trim_front(&mut self.senkou_a, capacity);
        trim_front(&mut self.senkou_b, capacity);
    }
}

impl Default for IchimokuCloud {
    fn default() -> Self {
        Self::new(IchimokuParams::default())
    }
}

impl Indicator for IchimokuCloud {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Ichimoku
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
        self.closes.push_back(candle.close);

        let tenkan = rolling_midpoint(&self.highs, &self.lows, self.params.conversion_period);
        let kijun = rolling_midpoint(&self.highs, &self.lows, self.params.base_period);
        let senkou_a = zip_with(tenkan, kijun, |t, k| (t + k) / 2.0);
        let senkou_b = rolling_midpoint(&self.highs, &self.lows, self.params.leading_b_period);

        self.tenkan.push_back(tenkan);
        self.kijun.push_back(kijun);
        self.senkou_a.push_back(senkou_a);
        self.senkou_b.push_back(senkou_b);

        self.trim();
        Ok(())
    }

    fn result(&self) -> IndicatorResult {
        let values = self.values();
        IndicatorResult::new()
            .with("tenkan", values.tenkan)
            .with("kijun", values.kijun)
            .with("senkouA", values.senkou_a)
            .with("senkouB", values.senkou_b)
            .with("chikou", values.chikou)
    }

    fn signal(&self) -> Option<Signal> {
        interpret_ichimoku(&self.values(), self.closes.back().copied()).map(Signal::Ichimoku)
    }

    fn is_ready(&self) -> bool {
        self.closes.len() >= self.params.max_period()
    }

    fn reset(&mut self) {
        self.highs.clear();
        self.lows.clear();
        self.closes.clear();
        self.tenkan.clear();
        self.kijun.clear();
        self.senkou_a.clear();
        self.senkou_b.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::candle_at;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    /// Candle `n` (1-based) of the spike scenario: flat 105/95/100 with candle 30 spiking to 150.
    fn spike_stream(len: usize) -> Vec<Candle> {
        (1..=len)
            .map(|n| {
                let high = if n == 30 { 150.0 } else { 105.0 };
                candle_at(n - 1, high, 95.0, 100.0)
            })
            .collect()
    }

    fn wave_stream(len: usize) -> Vec<Candle> {
        (0..len)
            .map(|i| {
                let mid = 100.0 + (i as f64 * 0.37).sin() * 8.0 + (i as f64 * 0.05).cos() * 3.0;
                let spread = 1.0 + (i % 7) as f64 * 0.4;
                candle_at(i, mid + spread, mid - spread, mid + (i as f64 * 1.3).sin() * spread)
            })
            .collect()
    }

    fn midpoint_at(candles: &[Candle], index: usize, period: usize) -> Option<f64> {
        if index + 1 < period {
            return None;
        }
        let window = &candles[index + 1 - period..=index];
        let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        Some((high + low) / 2.0)
    }

    fn expected_senkou_a(candles: &[Candle], index: usize, params: &IchimokuParams) -> Option<f64> {
        let tenkan = midpoint_at(candles, index, params.conversion_period)?;
        let kijun = midpoint_at(candles, index, params.base_period)?;
        Some((tenkan + kijun) / 2.0)
    }

    #[test]
    fn test_readiness_follows_largest_period() {
        let mut cloud = IchimokuCloud::default();
        for (i, candle) in spike_stream(60).iter().enumerate() {
            cloud.update(candle).unwrap();
            let len = i + 1;
            assert_eq!(cloud.is_ready(), len >= 52, "length {}", len);
        }
    }

    #[test]
    fn test_readiness_uses_max_of_custom_periods() {
        let params = IchimokuParams { conversion_period: 30, base_period: 5, leading_b_period: 10, displacement: 3 };
        let mut cloud = IchimokuCloud::new(params);
        for (i, candle) in wave_stream(40).iter().enumerate() {
            cloud.update(candle).unwrap();
            assert_eq!(cloud.is_ready(), i + 1 >= 30);
        }
    }

    #[test]
    fn test_spike_scenario() {
        let candles = spike_stream(60);
        let mut cloud = IchimokuCloud::default();
        for (i, candle) in candles.iter().enumerate() {
            cloud.update(candle).unwrap();
            let n = i + 1;
            let values = cloud.values();

            let expected_tenkan = match n {
                1..=8 => None,
                30..=38 => Some(122.5),
                _ => Some(100.0),
            };
            assert_eq!(values.tenkan, expected_tenkan, "tenkan at candle {}", n);

            let expected_kijun = match n {
                1..=25 => None,
                30..=55 => Some(122.5),
                _ => Some(100.0),
            };
            assert_eq!(values.kijun, expected_kijun, "kijun at candle {}", n);
        }

        // candle 60 shows what was computed at candle 34
        let values = cloud.values();
        assert_eq!(cloud.senkou_a_series()[33], Some(122.5));
        assert_eq!(values.senkou_a, Some(122.5));
        assert_eq!(cloud.senkou_b_series()[33], None);
        assert_eq!(values.senkou_b, None);
        assert_eq!(values.chikou, Some(100.0));
        assert!(cloud.is_ready());
    }

    #[test]
    fn test_senkou_b_reflects_spike_once_projected() {
        let candles = spike_stream(90);
        let mut cloud = IchimokuCloud::default();
        for candle in &candles[..78] {
            cloud.update(candle).unwrap();
        }
        // candle 78 reads candle 52, the first with a full 52-point window
        assert_eq!(cloud.values().senkou_b, Some(122.5));
        for candle in &candles[78..] {
            cloud.update(candle).unwrap();
        }
        // candle 90 reads candle 64, still covering candle 30
        assert_eq!(cloud.values().senkou_b, Some(122.5));
    }

    #[test]
    fn test_senkou_a_is_average_of_same_index_lines() {
        let mut cloud = IchimokuCloud::default();
        for candle in wave_stream(120) {
            cloud.update(&candle).unwrap();
            let idx = cloud.history_len() - 1;
            let expected = match (cloud.tenkan_series()[idx], cloud.kijun_series()[idx]) {
                (Some(t), Some(k)) => Some((t + k) / 2.0),
                _ => None,
            };
            assert_eq!(cloud.senkou_a_series()[idx], expected);
        }
    }

    #[test]
    fn test_derived_series_stay_aligned_with_raw_history() {
        let mut cloud = IchimokuCloud::with_margin(IchimokuParams::default(), 0);
        for candle in wave_stream(200) {
            cloud.update(&candle).unwrap();
            let len = cloud.history_len();
            assert!(len <= cloud.capacity());
            assert_eq!(cloud.tenkan_series().len(), len);
            assert_eq!(cloud.kijun_series().len(), len);
            assert_eq!(cloud.senkou_a_series().len(), len);
            assert_eq!(cloud.senkou_b_series().len(), len);
        }
        assert_eq!(cloud.history_len(), 52 + 26);
    }

    #[test]
    fn test_displacement_reads_values_from_earlier_updates() {
        let candles = wave_stream(300);
        let params = IchimokuParams::default();
        let mut cloud = IchimokuCloud::new(params);
        for (t, candle) in candles.iter().enumerate() {
            cloud.update(candle).unwrap();
            let values = cloud.values();
            let expected_a = t.checked_sub(params.displacement).and_then(|i| expected_senkou_a(&candles, i, &params));
            let expected_b = t
                .checked_sub(params.displacement)
                .and_then(|i| midpoint_at(&candles, i, params.leading_b_period));
            assert_eq!(values.senkou_a, expected_a, "senkouA at {}", t);
            assert_eq!(values.senkou_b, expected_b, "senkouB at {}", t);
        }
    }

    #[quickcheck]
    fn test_displacement_holds_for_any_configuration(conv: u8, base: u8, lead: u8, disp: u8, margin: u8) -> TestResult {
        let params = IchimokuParams {
            conversion_period: conv as usize % 12 + 1,
            base_period: base as usize % 30 + 1,
            leading_b_period: lead as usize % 60 + 1,
            displacement: disp as usize % 30 + 1,
        };
        let candles = wave_stream(params.max_period() + params.displacement + 40);
        let mut cloud = IchimokuCloud::with_margin(params, margin as usize % 5);
        for (t, candle) in candles.iter().enumerate() {
            if cloud.update(candle).is_err() {
                return TestResult::failed();
            }
            let expected = t.checked_sub(params.displacement).and_then(|i| expected_senkou_a(&candles, i, &params));
            if cloud.values().senkou_a != expected {
                return TestResult::failed();
            }
        }
        TestResult::passed()
    }

    #[test]
    fn test_lagging_span_is_close_from_displacement_ago() {
        let params = IchimokuParams { conversion_period: 3, base_period: 5, leading_b_period: 8, displacement: 4 };
        let candles = wave_stream(50);
        let mut cloud = IchimokuCloud::with_margin(params, 2);
        for (t, candle) in candles.iter().enumerate() {
            cloud.update(candle).unwrap();
            let length = t + 1;
            let expected = (length > params.displacement).then(|| candles[length - params.displacement - 1].close);
            assert_eq!(cloud.values().chikou, expected, "length {}", length);
        }
    }

    #[test]
    fn test_malformed_candle_leaves_state_untouched() {
        let candles = wave_stream(30);
        let mut cloud = IchimokuCloud::default();
        for candle in &candles {
            cloud.update(candle).unwrap();
        }
        let before = cloud.result();
        let len_before = cloud.history_len();

        let mut bad = candles[29];
        bad.low = f64::NAN;
        let err = cloud.update(&bad).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert_eq!(cloud.history_len(), len_before);
        assert_eq!(cloud.result(), before);
    }

    #[test]
    fn test_reset_then_replay_is_bit_identical() {
        let candles = wave_stream(150);
        let mut cloud = IchimokuCloud::default();
        let first: Vec<IchimokuValues> = candles
            .iter()
            .map(|c| {
                cloud.update(c).unwrap();
                cloud.values()
            })
            .collect();

        cloud.reset();
        assert_eq!(cloud.history_len(), 0);
        assert!(!cloud.is_ready());
        assert_eq!(cloud.values(), IchimokuValues::default());
        assert_eq!(cloud.params(), &IchimokuParams::default());

        for (candle, expected) in candles.iter().zip(&first) {
            cloud.update(candle).unwrap();
            let got = cloud.values();
            let bits = |v: Option<f64>| v.map(f64::to_bits);
            assert_eq!(bits(got.tenkan), bits(expected.tenkan));
            assert_eq!(bits(got.kijun), bits(expected.kijun));
            assert_eq!(bits(got.senkou_a), bits(expected.senkou_a));
            assert_eq!(bits(got.senkou_b), bits(expected.senkou_b));
            assert_eq!(bits(got.chikou), bits(expected.chikou));
        }
    }

    #[test]
    fn test_result_exposes_all_five_fields() {
        let mut cloud = IchimokuCloud::default();
        cloud.update(&candle_at(0, 105.0, 95.0, 100.0)).unwrap();
        let result = cloud.result();
        assert_eq!(result.field_names(), vec!["tenkan", "kijun", "senkouA", "senkouB", "chikou"]);
        assert!(result.is_empty());
        assert_eq!(cloud.signal(), None);
    }

    #[test]
    fn test_signal_available_once_cloud_is_projected() {
        let params = IchimokuParams { conversion_period: 2, base_period: 3, leading_b_period: 4, displacement: 2 };
        let mut cloud = IchimokuCloud::new(params);
        for i in 0..10 {
            let base = 100.0 + i as f64;
            cloud.update(&candle_at(i, base + 1.0, base - 1.0, base + 0.5)).unwrap();
        }
        match cloud.signal() {
            Some(Signal::Ichimoku(signal)) => assert_eq!(signal.trend, crate::signals::Trend::StrongBullish),
            other => panic!("unexpected signal {:?}", other),
        }
    }

    #[test]
    fn test_params_reject_zero_periods() {
        let params = IchimokuParams { displacement: 0, ..IchimokuParams::default() };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("displacement"));
        assert!(IchimokuParams::default().validate().is_ok());
    }

    #[test]
    fn test_parameters_use_camel_case_keys() {
        let cloud = IchimokuCloud::default();
        assert_eq!(
            cloud.parameters(),
            serde_json::json!({ "conversionPeriod": 9, "basePeriod": 26, "leadingBPeriod": 52, "displacement": 26 })
        );
        assert_eq!(cloud.name(), "Ichimoku(9,26,52,26)");
    }
}
