// Live indicator instances advanced one candle at a time by the caller
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use shared::models::{Candle, TimeFrame};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::calculate_indicators::replay;
use super::{fetch_candles, prepare_request, IndicatorRequest, IndicatorSnapshot, ServiceLimits};
use crate::data::{CandleRange, DataProvider};
use crate::error::{EngineError, Result};
use crate::indicators::Indicator;

pub type InstanceId = Uuid;

/// Identity of a live instance: two opens with an equal key share one instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InstanceKey {
    symbol: String,
    timeframe: TimeFrame,
    key: &'static str,
    /// Canonical JSON of the merged parameters.
    params: String,
}

struct LiveInstance {
    key: InstanceKey,
    indicator: Box<dyn Indicator>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl LiveInstance {
    fn snapshot(&self) -> IndicatorSnapshot {
        IndicatorSnapshot::capture(self.indicator.as_ref(), self.last_timestamp, true)
    }
}

#[derive(Default)]
struct Instances {
    by_id: HashMap<InstanceId, LiveInstance>,
    by_key: HashMap<InstanceKey, InstanceId>,
}

impl Instances {
    fn get_mut(&mut self, id: InstanceId) -> Result<&mut LiveInstance> {
        self.by_id.get_mut(&id).ok_or(EngineError::UnknownInstance(id))
    }
}

/// Open instances. Never expire; the caller discards them.
#[derive(Default)]
pub struct LiveInstances {
    inner: Mutex<Instances>,
}

impl LiveInstances {
    pub(crate) async fn open<P: DataProvider>(
        &self,
        provider: &P,
        limits: ServiceLimits,
        symbol: &str,
        timeframe: TimeFrame,
        request: &IndicatorRequest,
        range: CandleRange,
    ) -> Result<InstanceId> {
        if symbol.trim().is_empty() {
            return Err(EngineError::InvalidInput("symbol must not be empty".to_string()));
        }
        let config = prepare_request(request).map_err(|e| {
            tracing::error!(%symbol, key = %request.key, error_detail = %e, "Rejected live instance request");
            e
        })?;
        let key = InstanceKey {
            symbol: symbol.to_string(),
            timeframe,
            key: config.kind().key(),
            params: config.to_value().to_string(),
        };

        if let Some(id) = self.inner.lock().await.by_key.get(&key) {
            tracing::debug!(%symbol, %timeframe, %id, "Reusing live instance");
            return Ok(*id);
        }

        // warm up outside the lock
        let candles = fetch_candles(provider, symbol, timeframe, range, limits).await?;
        let mut indicator = config.build(limits.history_margin);
        let (indicator, last_timestamp) = tokio::task::spawn_blocking(move || {
            let last = replay(indicator.as_mut(), &candles)?;
            Ok::<_, EngineError>((indicator, last))
        })
        .await
        .map_err(|e| EngineError::TaskFailed(format!("warm-up of '{}': {}", request.key, e)))??;

        let mut instances = self.inner.lock().await;
        if let Some(id) = instances.by_key.get(&key) {
            return Ok(*id);
        }
        let id = Uuid::new_v4();
        instances.by_key.insert(key.clone(), id);
        instances.by_id.insert(id, LiveInstance { key, indicator, last_timestamp });
        tracing::info!(%symbol, %timeframe, %id, "Opened live instance");
        Ok(id)
    }

    /// Feeds one candle. Candles must arrive in strictly increasing timestamp
    /// order; a rejected candle leaves the instance unchanged.
    pub(crate) async fn advance(&self, id: InstanceId, candle: &Candle) -> Result<IndicatorSnapshot> {
        let mut instances = self.inner.lock().await;
        let instance = instances.get_mut(id)?;
        if let Some(last) = instance.last_timestamp {
            if candle.timestamp <= last {
                return Err(EngineError::InvalidInput(format!(
                    "candle at {} is not after the last candle at {}",
                    candle.timestamp, last
                )));
            }
        }
        instance.indicator.update(candle)?;
        instance.last_timestamp = Some(candle.timestamp);
        Ok(instance.snapshot())
    }

    pub(crate) async fn snapshot(&self, id: InstanceId) -> Result<IndicatorSnapshot> {
        let mut instances = self.inner.lock().await;
        Ok(instances.get_mut(id)?.snapshot())
    }

    pub(crate) async fn reset(&self, id: InstanceId) -> Result<()> {
        let mut instances = self.inner.lock().await;
        let instance = instances.get_mut(id)?;
        instance.indicator.reset();
        instance.last_timestamp = None;
        tracing::debug!(%id, "Reset live instance");
        Ok(())
    }

    pub(crate) async fn discard(&self, id: InstanceId) -> Result<()> {
        let mut instances = self.inner.lock().await;
        let instance = instances.by_id.remove(&id).ok_or(EngineError::UnknownInstance(id))?;
        instances.by_key.remove(&instance.key);
        tracing::debug!(%id, "Discarded live instance");
        Ok(())
    }

    pub(crate) async fn len(&self) -> usize {
        self.inner.lock().await.by_id.len()
    }
}
