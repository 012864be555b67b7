//! Error types for sitewide-comment-control
//!
//! Classification itself never fails; these cover the plumbing around it.

use thiserror::Error;

/// Errors raised while loading the TOML configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors raised by a settings store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store file must hold a JSON object")]
    NotAnObject,

    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors raised by the administrative settings update
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("actor lacks the network management capability")]
    Forbidden,

    #[error("anti-forgery token missing or invalid")]
    InvalidToken,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while applying a verdict to a stored comment
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("comment {0} not found")]
    NotFound(u64),

    #[error("comment repository lock poisoned")]
    Poisoned,
}
