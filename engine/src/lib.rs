// Engine library root

pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod registry;
pub mod services;
pub mod signals;

pub use config::EngineSettings;
pub use data::{CandleRange, CsvCandleLoader, DataProvider, MarketDataStore, StoreDataProvider};
pub use error::{EngineError, Result};
pub use indicators::{Indicator, IndicatorResult};
pub use registry::{get_catalog, get_indicator_metadata, IndicatorCategory, IndicatorConfig, IndicatorKind, IndicatorMetadata};
pub use services::{CalculateOptions, IndicatorRequest, IndicatorService, IndicatorSnapshot, InstanceId, TimeSeriesPoint};
pub use signals::Signal;
