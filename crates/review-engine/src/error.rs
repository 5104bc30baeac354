//! Error types for loading review data
//!
//! Only loading can fail. Once a session is running, every failure mode
//! degrades to showing less (see `NormalizeWarning` and `Navigation`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Dataset contains no usable documents ({dropped} dropped)")]
    EmptyDataset { dropped: usize },
}

pub type Result<T> = std::result::Result<T, ReviewError>;
