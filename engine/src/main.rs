// Engine runner: preloads the configured candle files and prints every
// indicator with default parameters as JSON.
use std::sync::Arc;

use anyhow::Context;
use indicator_engine::config::EngineSettings;
use indicator_engine::data::{MarketDataStore, StoreDataProvider};
use indicator_engine::registry::IndicatorKind;
use indicator_engine::services::{CalculateOptions, IndicatorRequest, IndicatorService};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = EngineSettings::load().context("Failed to load engine settings")?;

    // RUST_LOG wins over the configured filter
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.log_filter).context("Invalid logFilter")?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    info!("Starting indicator engine...");

    let market_data_store = Arc::new(RwLock::new(MarketDataStore::new()));
    for data_file in &settings.data_files {
        let candles = data_file
            .loader()?
            .load_candles_from_csv(&data_file.path)
            .with_context(|| format!("Failed to load '{}'", data_file.path.display()))?;
        let loaded = candles.len();
        let total = market_data_store.write().await.add_candles(&data_file.symbol, data_file.timeframe, candles);
        info!(symbol = %data_file.symbol, timeframe = %data_file.timeframe, loaded, total, "Loaded candle file");
    }

    let service = IndicatorService::new(StoreDataProvider::new(market_data_store), &settings);

    let catalog = service.get_catalog(None)?;
    println!("{}", serde_json::to_string_pretty(&catalog)?);

    let requests: Vec<IndicatorRequest> = IndicatorKind::ALL.iter().map(|kind| IndicatorRequest::new(kind.key())).collect();
    for data_file in &settings.data_files {
        let options = CalculateOptions::new(&data_file.symbol, data_file.timeframe, requests.clone()).with_signals();
        let snapshots = service.calculate_indicators(options).await?;
        let report = json!({
            "symbol": data_file.symbol,
            "timeframe": data_file.timeframe,
            "indicators": snapshots,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
