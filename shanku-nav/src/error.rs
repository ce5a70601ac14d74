//! Error types for ShankuNav.

use thiserror::Error;

/// ShankuNav error type
#[derive(Error, Debug)]
pub enum NavError {
    #[error("Transform failed: {0}")]
    Transform(#[from] crate::bus::TransformError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for NavError {
    fn from(e: toml::de::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
