use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration source not found: {0}")]
    SourceNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => Self::SourceNotFound(key),
            config::ConfigError::Foreign(inner) => Self::SourceNotFound(inner.to_string()),
            other => Self::ParseError(other.to_string()),
        }
    }
}

impl From<ConfigError> for error_common::AuthError {
    fn from(err: ConfigError) -> Self {
        error_common::AuthError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
