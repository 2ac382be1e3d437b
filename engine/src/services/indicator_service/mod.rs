// Indicator service: the engine's single entry point.
// Requests are dispatched to one handler module per operation.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::{Candle, TimeFrame};

use crate::config::EngineSettings;
use crate::data::{CandleRange, DataProvider};
use crate::error::{EngineError, Result};
use crate::indicators::{Indicator, IndicatorResult};
use crate::registry::{self, Catalog, IndicatorConfig, IndicatorKind, IndicatorMetadata};
use crate::signals::Signal;

pub mod calculate_indicators;
pub mod live;
pub mod time_series;

pub use live::InstanceId;

/// One indicator to compute. `id` names the entry in the response and
/// defaults to `key`, so the same kind can be requested twice with
/// different parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct IndicatorRequest {
    pub key: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<String>,
}

impl IndicatorRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), params: None, id: None }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn response_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CalculateOptions {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub indicators: Vec<IndicatorRequest>,
    #[serde(default)]
    pub range: CandleRange,
    #[serde(default)]
    pub include_signals: bool,
}

impl CalculateOptions {
    pub fn new(symbol: impl Into<String>, timeframe: TimeFrame, indicators: Vec<IndicatorRequest>) -> Self {
        Self { symbol: symbol.into(), timeframe, indicators, range: CandleRange::default(), include_signals: false }
    }

    pub fn with_range(mut self, range: CandleRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_signals(mut self) -> Self {
        self.include_signals = true;
        self
    }
}

/// Latest state of one indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub key: &'static str,
    pub parameters: Value,
    pub ready: bool,
    /// Timestamp of the last candle fed, `None` before the first one.
    pub timestamp: Option<DateTime<Utc>>,
    pub values: IndicatorResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,
}

impl IndicatorSnapshot {
    pub(crate) fn capture(indicator: &dyn Indicator, timestamp: Option<DateTime<Utc>>, include_signal: bool) -> Self {
        Self {
            key: indicator.kind().key(),
            parameters: indicator.parameters(),
            ready: indicator.is_ready(),
            timestamp,
            values: indicator.result(),
            signal: if include_signal { indicator.signal() } else { None },
        }
    }
}

/// Indicator state right after one input candle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub values: IndicatorResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,
}

/// Engine tunables the handlers need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLimits {
    pub history_margin: usize,
    pub default_candle_limit: usize,
}

impl From<&EngineSettings> for ServiceLimits {
    fn from(settings: &EngineSettings) -> Self {
        Self { history_margin: settings.history_margin, default_candle_limit: settings.default_candle_limit }
    }
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

pub struct IndicatorService<P: DataProvider> {
    provider: P,
    limits: ServiceLimits,
    instances: live::LiveInstances,
}

impl<P: DataProvider> IndicatorService<P> {
    pub fn new(provider: P, settings: &EngineSettings) -> Self {
        Self { provider, limits: ServiceLimits::from(settings), instances: live::LiveInstances::default() }
    }

    pub fn with_defaults(provider: P) -> Self {
        Self::new(provider, &EngineSettings::default())
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn get_catalog(&self, category: Option<&str>) -> Result<Catalog> {
        tracing::debug!(?category, "Received GetCatalog request");
        registry::get_catalog(category).map_err(|e| {
            tracing::error!(?category, error_detail = %e, "Rejected catalog request");
            e
        })
    }

    pub fn get_indicator_metadata(&self, key: &str) -> Option<&'static IndicatorMetadata> {
        registry::get_indicator_metadata(key)
    }

    pub async fn calculate_indicators(&self, options: CalculateOptions) -> Result<BTreeMap<String, IndicatorSnapshot>> {
        tracing::debug!(
            symbol = %options.symbol,
            timeframe = %options.timeframe,
            indicators = options.indicators.len(),
            include_signals = options.include_signals,
            "Received CalculateIndicators request, dispatching to handler."
        );
        calculate_indicators::handle_calculate_indicators(options, &self.provider, self.limits).await
    }

    pub async fn get_indicator_time_series(
        &self,
        options: CalculateOptions,
    ) -> Result<BTreeMap<String, Vec<TimeSeriesPoint>>> {
        tracing::debug!(
            symbol = %options.symbol,
            timeframe = %options.timeframe,
            indicators = options.indicators.len(),
            "Received GetIndicatorTimeSeries request, dispatching to handler."
        );
        time_series::handle_get_indicator_time_series(options, &self.provider, self.limits).await
    }

    /// Opens a live instance warmed up with the candles in `range`, or returns
    /// the id of the instance already open for the same symbol, timeframe,
    /// kind and parameters.
    pub async fn open_instance(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        request: &IndicatorRequest,
        range: CandleRange,
    ) -> Result<InstanceId> {
        tracing::debug!(%symbol, %timeframe, key = %request.key, "Received OpenInstance request");
        self.instances.open(&self.provider, self.limits, symbol, timeframe, request, range).await
    }

    pub async fn advance_instance(&self, id: InstanceId, candle: &Candle) -> Result<IndicatorSnapshot> {
        self.instances.advance(id, candle).await
    }

    pub async fn instance_snapshot(&self, id: InstanceId) -> Result<IndicatorSnapshot> {
        self.instances.snapshot(id).await
    }

    pub async fn reset_instance(&self, id: InstanceId) -> Result<()> {
        self.instances.reset(id).await
    }

    pub async fn discard_instance(&self, id: InstanceId) -> Result<()> {
        self.instances.discard(id).await
    }

    pub async fn open_instances(&self) -> usize {
        self.instances.len().await
    }
}

/// A request whose key and parameters have been checked.
#[derive(Debug, Clone)]
pub(crate) struct PreparedRequest {
    pub id: String,
    pub config: IndicatorConfig,
}

pub(crate) fn prepare_request(request: &IndicatorRequest) -> Result<IndicatorConfig> {
    let kind: IndicatorKind = request.key.parse()?;
    IndicatorConfig::resolve(kind, request.params.as_ref())
}

/// Validates every request up front so nothing is fetched for a request that
/// can never succeed.
pub(crate) fn prepare_requests(options: &CalculateOptions) -> Result<Vec<PreparedRequest>> {
    if options.symbol.trim().is_empty() {
        return Err(EngineError::InvalidInput("symbol must not be empty".to_string()));
    }
    let mut seen = HashSet::new();
    let mut prepared = Vec::with_capacity(options.indicators.len());
    for request in &options.indicators {
        let id = request.response_id();
        if !seen.insert(id.to_string()) {
            return Err(EngineError::InvalidInput(format!("duplicate indicator id '{}'", id)));
        }
        let config = prepare_request(request).map_err(|e| {
            tracing::error!(symbol = %options.symbol, key = %request.key, error_detail = %e, "Rejected indicator request");
            e
        })?;
        prepared.push(PreparedRequest { id: id.to_string(), config });
    }
    Ok(prepared)
}

pub(crate) async fn fetch_candles<P: DataProvider>(
    provider: &P,
    symbol: &str,
    timeframe: TimeFrame,
    range: CandleRange,
    limits: ServiceLimits,
) -> Result<Arc<Vec<Candle>>> {
    let range = range.or_limit(limits.default_candle_limit);
    let candles = provider.fetch_candles(symbol, timeframe, &range).await?;
    tracing::debug!(%symbol, %timeframe, count = candles.len(), "Fetched candles");
    Ok(Arc::new(candles))
}

/// Runs `job` once per prepared request, each on its own blocking task, over
/// the same shared candles.
pub(crate) async fn run_per_indicator<T, F>(
    prepared: Vec<PreparedRequest>,
    candles: Arc<Vec<Candle>>,
    job: F,
) -> Result<BTreeMap<String, T>>
where
    T: Send + 'static,
    F: Fn(IndicatorConfig, &[Candle]) -> Result<T> + Clone + Send + 'static,
{
    let handles: Vec<_> = prepared
        .into_iter()
        .map(|request| {
            let candles = candles.clone();
            let job = job.clone();
            let handle = tokio::task::spawn_blocking(move || job(request.config, candles.as_slice()));
            (request.id, handle)
        })
        .collect();

    let mut results = BTreeMap::new();
    for (id, handle) in handles {
        let output = handle.await.map_err(|e| EngineError::TaskFailed(format!("indicator '{}': {}", id, e)))??;
        results.insert(id, output);
    }
    Ok(results)
}
