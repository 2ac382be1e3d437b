// Handler for GetIndicatorTimeSeries: one point per input candle
use std::collections::BTreeMap;

use super::{fetch_candles, prepare_requests, run_per_indicator, CalculateOptions, ServiceLimits, TimeSeriesPoint};
use crate::data::DataProvider;
use crate::error::Result;

pub async fn handle_get_indicator_time_series<P: DataProvider>(
    options: CalculateOptions,
    provider: &P,
    limits: ServiceLimits,
) -> Result<BTreeMap<String, Vec<TimeSeriesPoint>>> {
    let prepared = prepare_requests(&options)?;
    if prepared.is_empty() {
        return Ok(BTreeMap::new());
    }

    let candles = fetch_candles(provider, &options.symbol, options.timeframe, options.range, limits).await?;
    let include_signals = options.include_signals;
    let history_margin = limits.history_margin;

    let series = run_per_indicator(prepared, candles, move |config, candles| {
        let mut indicator = config.build(history_margin);
        let mut points = Vec::with_capacity(candles.len());
        for candle in candles {
            indicator.update(candle)?;
            points.push(TimeSeriesPoint {
                timestamp: candle.timestamp,
                values: indicator.result(),
                signal: if include_signals { indicator.signal() } else { None },
            });
        }
        Ok(points)
    })
    .await?;

    tracing::debug!(symbol = %options.symbol, series = series.len(), "Indicator time series computed");
    Ok(series)
}
