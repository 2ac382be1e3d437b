pub mod settings;

pub use settings::{DataFileSettings, EngineSettings, CONFIG_ENV_VAR};
