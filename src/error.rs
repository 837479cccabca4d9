//! Error types for Toolgate.

use thiserror::Error;

/// Library-level error type for Toolgate operations.
#[derive(Error, Debug)]
pub enum ToolgateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Toolgate operations.
pub type Result<T> = std::result::Result<T, ToolgateError>;
