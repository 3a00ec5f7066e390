use thiserror::Error;

/// Result type used across the lokictx core crate.
pub type Result<T> = std::result::Result<T, LokiCtxError>;

/// Canonical error representation shared by the workspace crates.
#[derive(Debug, Error)]
pub enum LokiCtxError {
    #[error("invalid timestamp '{input}': {reason}")]
    TimeParse { input: String, reason: String },

    #[error("{0}")]
    GeneralError(String),
}

impl LokiCtxError {
    pub fn time_parse(input: &str, reason: impl Into<String>) -> Self {
        LokiCtxError::TimeParse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Dedicated configuration error used by the configuration module.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingValue(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("failed to read config file {path}: {reason}")]
    File { path: String, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key,
            reason: reason.into(),
        }
    }
}
