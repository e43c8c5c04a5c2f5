//! Declarative route table served by the binary.
//!
//! ```json
//! {
//!   "errorPage": "error/main",
//!   "layouts": [{ "component": "layout/shell" }],
//!   "routes": [
//!     { "path": "/", "page": "page/home", "props": { "title": "Home" } },
//!     { "path": "/docs/{slug}", "page": "page/doc", "layouts": [{ "component": "layout/docs" }] }
//!   ]
//! }
//! ```

use std::collections::HashSet;

use serde::Deserialize;
use sveltide_render::Props;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteTableError {
    #[error("Invalid route table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Route path must start with '/': {0}")]
    InvalidPath(String),

    #[error("Duplicate route path: {0}")]
    DuplicatePath(String),

    #[error("Route {path} has an empty page component")]
    EmptyPage { path: String },
}

/// A layout wrapping routes, with optional props.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayoutSpec {
    pub component: String,
    #[serde(default)]
    pub props: Props,
}

/// One GET route rendering `page` inside its layouts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub path: String,
    pub page: String,
    #[serde(default)]
    pub props: Props,
    /// Inner layouts, nested inside the table-wide ones.
    #[serde(default)]
    pub layouts: Vec<LayoutSpec>,
    /// Overrides the table-wide error page for this route.
    #[serde(default)]
    pub error_page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTable {
    #[serde(default)]
    pub error_page: Option<String>,
    #[serde(default)]
    pub layouts: Vec<LayoutSpec>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

impl RouteTable {
    /// Parse and validate a route table.
    pub fn from_json(source: &str) -> Result<Self, RouteTableError> {
        let table: RouteTable = serde_json::from_str(source)?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<(), RouteTableError> {
        let mut seen = HashSet::new();
        for route in &self.routes {
            if !route.path.starts_with('/') {
                return Err(RouteTableError::InvalidPath(route.path.clone()));
            }
            if route.page.trim().is_empty() {
                return Err(RouteTableError::EmptyPage {
                    path: route.path.clone(),
                });
            }
            if !seen.insert(route.path.as_str()) {
                return Err(RouteTableError::DuplicatePath(route.path.clone()));
            }
        }
        Ok(())
    }
}
