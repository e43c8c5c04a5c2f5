//! Renderer - Imperative Shell.
//!
//! This crate orchestrates I/O operations using pure functions from
//! `sveltide_core`. It owns the engine pool that runs the compiled server
//! bundle with `deno_core`, the HTML shell template and the resource inliner.
//!
//! # Architecture
//!
//! - **Functional Core** (`sveltide_core`): entries, manifest, engine contract, JS glue, tag scanning
//! - **Imperative Shell** (this crate): build output I/O, threading, JsRuntime execution
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sveltide_render::{DirFs, RenderOutput, Renderer, RendererConfig};
//!
//! // Spawns workers, loads server/render.js and server/template.html
//! let renderer = Renderer::new(Arc::new(DirFs::new("build")), RendererConfig::with_defaults(4)?)?;
//!
//! let mut out = RenderOutput::new();
//! renderer.render(&mut out, &data, false).await?;
//! ```

mod error;
mod fs;
mod inliner;
mod output;
mod pool;
mod renderer;
mod runtime;
mod template;
mod worker;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export core types for convenience
pub use sveltide_core::{
    error_props, BuildMetadata, ContextData, CoreError, EngineError, Entry, Manifest,
    ManifestEntry, NavigationEntry, NavigationResponse, Props, RenderData, RenderResult,
    RendererConfig, ScriptEngine, DEFAULT_ASSET_CACHE_CAPACITY, DEFAULT_ERROR_PAGE,
    NAVIGATION_HEADER,
};

// Export shell types
pub use error::{sanitize_error, RenderError, Result};
pub use fs::{check_path, BuildFs, DirFs, MemoryFs, SharedFs, SubFs};
pub use inliner::ResourceInliner;
pub use output::RenderOutput;
pub use pool::{HealthStatus, PoolStats, RenderPool};
pub use renderer::Renderer;
pub use runtime::DenoEngine;
pub use template::HtmlTemplate;
pub use worker::EngineFactory;
