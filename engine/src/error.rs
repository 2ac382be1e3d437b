use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter for indicator '{key}': {message}")]
    InvalidParameter { key: String, message: String },

    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("Unknown category '{category}'. Valid categories: {}", valid.join(", "))]
    UnknownCategory { category: String, valid: Vec<String> },

    #[error("Unknown indicator instance: {0}")]
    UnknownInstance(Uuid),

    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    #[error("Indicator task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

impl EngineError {
    /// Stable identifier a transport can map onto its own status codes.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::InvalidParameter { .. } => "invalid_parameter",
            EngineError::UnknownIndicator(_) => "unknown_indicator",
            EngineError::UnknownCategory { .. } => "unknown_category",
            EngineError::UnknownInstance(_) => "unknown_instance",
            EngineError::DataUnavailable(_) => "data_unavailable",
            EngineError::ConfigError(_) => "config_error",
            EngineError::CsvSystemError { .. } | EngineError::CsvDataFormatError(_) => "csv_error",
            EngineError::IoError { .. } => "io_error",
            EngineError::TaskFailed(_) | EngineError::AnyhowError(_) => "internal",
        }
    }

    /// Whether the caller sent a request the engine can never satisfy as-is.
    pub fn is_rejected_request(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidInput(_)
                | EngineError::InvalidParameter { .. }
                | EngineError::UnknownIndicator(_)
                | EngineError::UnknownCategory { .. }
                | EngineError::UnknownInstance(_)
        )
    }

    pub(crate) fn invalid_parameter(key: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidParameter { key: key.into(), message: message.into() }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
