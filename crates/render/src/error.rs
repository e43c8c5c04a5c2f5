//! Render errors including I/O operations.

use sveltide_core::{CoreError, EngineError};
use thiserror::Error;

/// Render errors including I/O operations.
#[derive(Error, Debug, Clone)]
pub enum RenderError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Template execution failed: {0}")]
    Template(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Worker channel closed")]
    ChannelClosed,

    #[error("Render timeout after {0}ms")]
    Timeout(u64),

    #[error("Service overloaded, retry after {retry_after_secs}s")]
    Overloaded { retry_after_secs: u32 },
}

pub type Result<T> = std::result::Result<T, RenderError>;

impl RenderError {
    /// Index of the entry that caused the failure, when known.
    pub fn entry_index(&self) -> Option<usize> {
        match self {
            RenderError::Engine(e) => e.entry_index(),
            _ => None,
        }
    }

    /// Message handed to error pages.
    pub fn message(&self) -> String {
        match self {
            RenderError::Engine(e) => e.message(),
            other => other.to_string(),
        }
    }
}

/// Sanitize error messages for client-facing responses.
///
/// Hides internal details while providing useful feedback.
pub fn sanitize_error(error: &RenderError) -> String {
    match error {
        // Safe to expose
        RenderError::Timeout(ms) => format!("Render timed out after {ms}ms"),
        RenderError::ChannelClosed => "Service temporarily unavailable".to_string(),
        RenderError::Overloaded { retry_after_secs } => {
            format!("Service busy, retry after {retry_after_secs}s")
        }
        RenderError::Engine(EngineError::ComponentNotFound { .. }) => {
            "Page not available".to_string()
        }
        // Hide internal details
        RenderError::Engine(EngineError::BundleLoad { .. }) | RenderError::Io { .. } => {
            "Internal configuration error".to_string()
        }
        RenderError::Engine(EngineError::NoResult) => "Render produced no output".to_string(),
        RenderError::Engine(_) | RenderError::Template(_) => "Render failed".to_string(),
        RenderError::Core(_) | RenderError::Serialization(_) => "Invalid request".to_string(),
    }
}
