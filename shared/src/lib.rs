pub mod models;

pub use models::{Candle, TimeFrame};
