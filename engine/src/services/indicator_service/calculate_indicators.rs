// Handler for CalculateIndicators: replay the fetched candles and report the final state
use std::collections::BTreeMap;

use shared::models::Candle;

use super::{fetch_candles, prepare_requests, run_per_indicator, CalculateOptions, IndicatorSnapshot, ServiceLimits};
use crate::data::DataProvider;
use crate::error::Result;
use crate::indicators::Indicator;

pub async fn handle_calculate_indicators<P: DataProvider>(
    options: CalculateOptions,
    provider: &P,
    limits: ServiceLimits,
) -> Result<BTreeMap<String, IndicatorSnapshot>> {
    let prepared = prepare_requests(&options)?;
    if prepared.is_empty() {
        return Ok(BTreeMap::new());
    }

    let candles = fetch_candles(provider, &options.symbol, options.timeframe, options.range, limits).await?;
    let include_signals = options.include_signals;
    let history_margin = limits.history_margin;

    let snapshots = run_per_indicator(prepared, candles, move |config, candles| {
        let mut indicator = config.build(history_margin);
        let timestamp = replay(indicator.as_mut(), candles)?;
        Ok(IndicatorSnapshot::capture(indicator.as_ref(), timestamp, include_signals))
    })
    .await?;

    tracing::debug!(symbol = %options.symbol, computed = snapshots.len(), "Indicators calculated");
    Ok(snapshots)
}

/// Feeds every candle in order; returns the timestamp of the last one.
pub(crate) fn replay(indicator: &mut dyn Indicator, candles: &[Candle]) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    for candle in candles {
        indicator.update(candle)?;
    }
    Ok(candles.last().map(|c| c.timestamp))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::IndicatorRequest;
    use crate::data::CandleRange;
    use crate::error::EngineError;
    use crate::signals::{Bias, IchimokuSignal, Signal};
    use serde_json::json;
    use shared::models::TimeFrame;

    #[tokio::test]
    async fn test_calculates_several_indicators_in_one_call() {
        let service = service_with(hourly_candles(&trending_closes(80)));
        let options = super::CalculateOptions::new(
            SYMBOL,
            TimeFrame::Hour1,
            vec![
                IndicatorRequest::new("sma").with_params(json!({ "period": 5 })).with_id("sma5"),
                IndicatorRequest::new("sma").with_id("sma20"),
                IndicatorRequest::new("ichimoku"),
                IndicatorRequest::new("rsi"),
            ],
        )
        .with_signals();

        let snapshots = service.calculate_indicators(options).await.unwrap();
        assert_eq!(snapshots.keys().map(String::as_str).collect::<Vec<_>>(), vec!["ichimoku", "rsi", "sma20", "sma5"]);

        let sma5 = &snapshots["sma5"];
        assert_eq!(sma5.key, "sma");
        assert_eq!(sma5.parameters, json!({ "period": 5 }));
        assert!(sma5.ready);
        let closes = trending_closes(80);
        let expected = closes[75..].iter().sum::<f64>() / 5.0;
        assert!((sma5.values.get("value").unwrap() - expected).abs() < 1e-9);
        assert_eq!(sma5.signal, Some(Signal::PriceVsAverage { bias: Bias::Bullish }));

        let ichimoku = &snapshots["ichimoku"];
        assert!(ichimoku.ready);
        assert_eq!(ichimoku.timestamp, hourly_candles(&closes).last().map(|c| c.timestamp));
        assert!(matches!(ichimoku.signal, Some(Signal::Ichimoku(IchimokuSignal { .. }))));
    }

    #[tokio::test]
    async fn test_insufficient_history_is_not_an_error() {
        let service = service_with(hourly_candles(&[10.0, 11.0, 12.0]));
        let options = super::CalculateOptions::new(SYMBOL, TimeFrame::Hour1, vec![IndicatorRequest::new("ichimoku")])
            .with_signals();

        let snapshot = &service.calculate_indicators(options).await.unwrap()["ichimoku"];
        assert!(!snapshot.ready);
        assert_eq!(snapshot.values.get("tenkan"), None);
        assert_eq!(snapshot.signal, None);
    }

    #[tokio::test]
    async fn test_signals_are_omitted_unless_requested() {
        let service = service_with(hourly_candles(&trending_closes(30)));
        let options = super::CalculateOptions::new(SYMBOL, TimeFrame::Hour1, vec![IndicatorRequest::new("sma")]);
        let snapshot = &service.calculate_indicators(options).await.unwrap()["sma"];
        assert!(snapshot.ready);
        assert_eq!(snapshot.signal, None);
    }

    #[tokio::test]
    async fn test_range_limits_the_replayed_candles() {
        let service = service_with(hourly_candles(&trending_closes(40)));
        let options = super::CalculateOptions::new(SYMBOL, TimeFrame::Hour1, vec![IndicatorRequest::new("sma")])
            .with_range(CandleRange::last(10));
        let snapshot = &service.calculate_indicators(options).await.unwrap()["sma"];
        assert!(!snapshot.ready);
    }

    #[tokio::test]
    async fn test_rejected_requests_do_not_reach_the_provider() {
        let service = service_with(Vec::new());
        let unknown = super::CalculateOptions::new(SYMBOL, TimeFrame::Hour1, vec![IndicatorRequest::new("vwap")]);
        assert!(matches!(service.calculate_indicators(unknown).await, Err(EngineError::UnknownIndicator(ref k)) if k == "vwap"));

        let bad_params = super::CalculateOptions::new(
            SYMBOL,
            TimeFrame::Hour1,
            vec![IndicatorRequest::new("ema").with_params(json!({ "period": 0 }))],
        );
        assert!(matches!(service.calculate_indicators(bad_params).await, Err(EngineError::InvalidParameter { .. })));
    }

    #[tokio::test]
    async fn test_missing_data_propagates_unchanged() {
        let service = service_with(hourly_candles(&[1.0, 2.0]));
        let options = super::CalculateOptions::new("UNKNOWN", TimeFrame::Hour1, vec![IndicatorRequest::new("sma")]);
        assert!(matches!(service.calculate_indicators(options).await, Err(EngineError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn test_malformed_candle_fails_the_calculation() {
        let mut candles = hourly_candles(&trending_closes(10));
        candles[4].high = candles[4].low - 1.0;
        let service = service_with(candles);
        let options = super::CalculateOptions::new(SYMBOL, TimeFrame::Hour1, vec![IndicatorRequest::new("sma")]);
        assert!(matches!(service.calculate_indicators(options).await, Err(EngineError::InvalidInput(_))));
    }
}
