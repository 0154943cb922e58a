// Kasa — Top-level error types
//
// Aggregates errors from the service, store and config modules into
// a single error enum for the application boundary.

use thiserror::Error;

/// Top-level error type for all Kasa operations.
#[derive(Debug, Error)]
pub enum KasaError {
    #[error(transparent)]
    Service(#[from] crate::service::ServiceError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] crate::store::CacheError),

    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KasaError>;
