//! Core render error types (pure - no I/O variants).

use thiserror::Error;

/// Maximum size for the serialized render payload handed to the engine (5MB).
pub const MAX_RENDER_PAYLOAD_SIZE: usize = 5 * 1024 * 1024;

/// Core errors (pure - no I/O variants).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("Pending queue size must be at least 1")]
    InvalidQueueSize,

    #[error("Render timeout must be positive")]
    InvalidTimeout,

    #[error("Asset cache capacity must be at least 1")]
    InvalidCacheCapacity,

    #[error("Render requires at least one entry")]
    NoEntries,

    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, CoreError>;
