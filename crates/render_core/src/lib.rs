//! Pure render logic - no I/O, no async, no side effects.
//!
//! This crate provides:
//! - Entry, render payload and result types
//! - The component manifest and CSR navigation response
//! - The script engine contract
//! - JavaScript glue generation and result decoding
//! - Resource reference scanning for the inliner
//! - Renderer configuration with validation
//!
//! # Example
//!
//! ```
//! use sveltide_core::{ContextData, Entry, Manifest, ManifestEntry, RenderData, DEFAULT_ERROR_PAGE};
//!
//! let manifest: Manifest = [
//!     ("page/home".to_string(), ManifestEntry::new("/app_/entries/home.js", vec![])),
//!     (DEFAULT_ERROR_PAGE.to_string(), ManifestEntry::new("/app_/entries/error.js", vec![])),
//! ]
//! .into_iter()
//! .collect();
//!
//! let data = RenderData::new(
//!     vec![Entry::new("page/home", None)],
//!     DEFAULT_ERROR_PAGE,
//!     ContextData { url: "http://localhost/".to_string() },
//! );
//!
//! let navigation = manifest.navigation(&data).unwrap();
//! assert_eq!(navigation.entries[0].file, "/app_/entries/home.js");
//! ```

pub mod bootstrap;
mod config;
mod engine;
mod entry;
mod error;
mod manifest;
pub mod resource;

pub use config::{RendererConfig, DEFAULT_ASSET_CACHE_CAPACITY};
pub use engine::{EngineError, ScriptEngine};
pub use entry::{
    error_props, ContextData, Entry, Props, RenderData, RenderResult, DEFAULT_ERROR_PAGE,
    NAVIGATION_HEADER,
};
pub use error::{CoreError, Result, MAX_RENDER_PAYLOAD_SIZE};
pub use manifest::{BuildMetadata, Manifest, ManifestEntry, NavigationEntry, NavigationResponse};
