//! Request-scoped render context module.
//!
//! Provides `RenderContext`, the per-request accumulator of layouts and the
//! error page, and its extractor.

mod extractor;
mod types;

pub(crate) use extractor::{context_of, is_navigation, request_url};
pub use types::{
    into_response, log_render_error, ContextNotRegistered, RenderContext, RenderErrorHook,
    RenderErrorReport,
};
