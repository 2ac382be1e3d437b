// Engine settings, loaded from a JSON file or defaulted
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shared::models::TimeFrame;

use crate::data::csv_parser::CsvCandleLoader;
use crate::error::{EngineError, Result};
use crate::indicators::DEFAULT_HISTORY_MARGIN;

/// Environment variable naming the settings file read by [`EngineSettings::load`].
pub const CONFIG_ENV_VAR: &str = "INDICATOR_ENGINE_CONFIG";

/// A candle file preloaded into the market data store at startup.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct DataFileSettings {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub decimal_comma: bool,
}

fn default_delimiter() -> char {
    ','
}

impl DataFileSettings {
    pub fn loader(&self) -> Result<CsvCandleLoader> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| EngineError::ConfigError(format!("delimiter '{}' must be a single ASCII character", self.delimiter)))?;
        Ok(CsvCandleLoader::new(delimiter, self.decimal_comma))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct EngineSettings {
    /// Extra candles of displaced history kept beyond what an indicator needs.
    pub history_margin: usize,
    /// Candle count fetched when a request gives no range at all.
    pub default_candle_limit: usize,
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    pub log_filter: String,
    pub data_files: Vec<DataFileSettings>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            history_margin: DEFAULT_HISTORY_MARGIN,
            default_candle_limit: 500,
            log_filter: "info".to_string(),
            data_files: Vec::new(),
        }
    }
}

impl EngineSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: EngineSettings =
            serde_json::from_str(json).map_err(|e| EngineError::ConfigError(format!("invalid settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::ConfigError(format!("cannot read settings file '{}': {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Reads the file named by [`CONFIG_ENV_VAR`], or falls back to defaults
    /// when the variable is unset.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_json_file(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_candle_limit == 0 {
            return Err(EngineError::ConfigError("defaultCandleLimit must be greater than 0".to_string()));
        }
        if self.log_filter.trim().is_empty() {
            return Err(EngineError::ConfigError("logFilter must not be empty".to_string()));
        }
        for file in &self.data_files {
            if file.symbol.trim().is_empty() {
                return Err(EngineError::ConfigError(format!("data file '{}' has an empty symbol", file.path.display())));
            }
            file.loader()?;
        }
        Ok(())
    }
}
