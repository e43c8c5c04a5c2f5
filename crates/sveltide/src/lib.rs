//! Svelte server-side rendering for axum.
//!
//! Tower layers accumulate the layouts and error page of a request into a
//! [`RenderContext`]; a page handler appends the page and renders the chain
//! through a shared [`Renderer`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use axum::Router;
//! use sveltide::{attach, error_page, layout, page, DirFs, Renderer, RendererConfig};
//! use tower::ServiceBuilder;
//!
//! let renderer = Arc::new(Renderer::new(
//!     Arc::new(DirFs::new("build")),
//!     RendererConfig::with_defaults(4)?,
//! )?);
//!
//! let app = Router::new()
//!     .route("/", page("page/home"))
//!     .layer(
//!         ServiceBuilder::new()
//!             .layer(attach(Arc::clone(&renderer)))
//!             .layer(error_page("error/main"))
//!             .layer(layout("layout/shell")),
//!     )
//!     .merge(sveltide::assets_router(renderer));
//! ```

pub mod app;
pub mod config;
pub mod context;
pub mod handlers;
pub mod layer;
pub mod routes;

pub use app::{create_app, create_app_with};
pub use config::Config;
pub use context::{
    into_response, log_render_error, ContextNotRegistered, RenderContext, RenderErrorHook,
    RenderErrorReport,
};
pub use handlers::{assets_router, health_router};
pub use layer::{
    attach, error_page, layout, layout_with_props, page, page_with_props, RenderLayer,
    RenderService,
};
pub use routes::{LayoutSpec, RouteSpec, RouteTable, RouteTableError};

pub use sveltide_render::{
    BuildFs, ContextData, DirFs, Entry, MemoryFs, Props, RenderError, RenderOutput, Renderer,
    RendererConfig, DEFAULT_ERROR_PAGE, NAVIGATION_HEADER,
};
