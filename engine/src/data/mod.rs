pub mod csv_parser;
pub mod market_data;
pub mod provider;

pub use csv_parser::CsvCandleLoader;
pub use market_data::{MarketDataStore, StoreDataProvider};
pub use provider::{CandleRange, DataProvider};
