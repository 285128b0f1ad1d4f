//! Error handling

pub use anyhow::{anyhow, Error as AnyhowError, Result};
pub use thiserror::Error;

/// Application-level error
#[derive(Debug, Error)]
pub enum AppError {
    /// Fatal at startup: the engine never reaches RUNNING
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
