//! Script engine contract.
//!
//! Every JS-runtime binding sits behind [`ScriptEngine`]; nothing else in the
//! workspace depends on engine-specific types.

use thiserror::Error;

use crate::entry::{RenderData, RenderResult};
use crate::error::CoreError;
use crate::manifest::BuildMetadata;

/// Errors raised by a script engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("\"{component}\" is not a component")]
    ComponentNotFound {
        component: String,
        /// Position of the offending entry; `None` when it is the error page.
        index: Option<usize>,
    },

    #[error("render error occurred at entry {index}: {message}")]
    Render {
        index: usize,
        message: String,
        stack_trace: String,
    },

    #[error("script error: {message}")]
    Script { message: String, stack_trace: String },

    #[error("Failed to load server bundle from {path}: {reason}")]
    BundleLoad { path: String, reason: String },

    #[error("JavaScript execution error: {0}")]
    JsExecution(String),

    #[error("Engine produced no result")]
    NoResult,

    #[error("Malformed engine result: {0}")]
    Protocol(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl EngineError {
    /// Index of the entry that caused the failure, when known.
    pub fn entry_index(&self) -> Option<usize> {
        match self {
            EngineError::Render { index, .. } => Some(*index),
            EngineError::ComponentNotFound { index, .. } => *index,
            _ => None,
        }
    }

    /// Message suitable for an error page.
    pub fn message(&self) -> String {
        match self {
            EngineError::Render { message, .. } | EngineError::Script { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

/// A component-rendering engine in the `Ready` state.
///
/// Implementations need not be `Send`; the pool builds each one on the thread
/// that uses it. A call must not depend on state left behind by earlier calls.
pub trait ScriptEngine {
    /// Manifest and asset prefix loaded at construction.
    fn metadata(&self) -> &BuildMetadata;

    /// Render the nested entry chain.
    fn render(&mut self, data: &RenderData) -> Result<RenderResult, EngineError>;
}
