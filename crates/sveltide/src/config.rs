use std::{env, path::PathBuf, str::FromStr};

use sveltide_render::{CoreError, RendererConfig, DEFAULT_ASSET_CACHE_CAPACITY};

const DEFAULT_MAX_PENDING: usize = 100;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Build output directory (default: "build")
    pub build_dir: PathBuf,
    /// Render workers (default: available parallelism)
    pub workers: usize,
    /// Queued renders per worker (default: 100)
    pub max_pending: usize,
    /// Render timeout in milliseconds (default: none)
    pub render_timeout_ms: Option<u64>,
    /// NODE_ENV exposed to the server bundle (default: "production")
    pub node_env: String,
    /// Inline `<script src>` tags as well as stylesheets (default: false)
    pub inline_scripts: bool,
    /// Client files kept in the inliner cache (default: 256)
    pub asset_cache_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SVELTIDE_BUILD_DIR` - Build output directory (default: "build")
    /// - `SVELTIDE_WORKERS` - Render workers (default: available parallelism)
    /// - `SVELTIDE_MAX_PENDING` - Queued renders per worker (default: 100)
    /// - `SVELTIDE_RENDER_TIMEOUT_MS` - Render timeout (default: none)
    /// - `SVELTIDE_NODE_ENV` - NODE_ENV for the bundle (default: "production")
    /// - `SVELTIDE_INLINE_SCRIPTS` - `true`/`1` to inline scripts (default: false)
    /// - `SVELTIDE_ASSET_CACHE_CAPACITY` - Inliner cache entries (default: 256)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
            lookup(key).and_then(|v| v.trim().parse().ok())
        }

        Self {
            build_dir: lookup("SVELTIDE_BUILD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("build")),
            workers: parsed(&lookup, "SVELTIDE_WORKERS").unwrap_or_else(default_workers),
            max_pending: parsed(&lookup, "SVELTIDE_MAX_PENDING").unwrap_or(DEFAULT_MAX_PENDING),
            render_timeout_ms: parsed(&lookup, "SVELTIDE_RENDER_TIMEOUT_MS"),
            node_env: lookup("SVELTIDE_NODE_ENV").unwrap_or_else(|| "production".to_string()),
            inline_scripts: lookup("SVELTIDE_INLINE_SCRIPTS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            asset_cache_capacity: parsed(&lookup, "SVELTIDE_ASSET_CACHE_CAPACITY")
                .unwrap_or(DEFAULT_ASSET_CACHE_CAPACITY),
        }
    }

    /// Validated renderer configuration.
    pub fn renderer_config(&self) -> Result<RendererConfig, CoreError> {
        RendererConfig::new(
            self.workers,
            self.max_pending,
            self.render_timeout_ms,
            self.node_env.clone(),
        )?
        .with_inline_scripts(self.inline_scripts)
        .with_asset_cache_capacity(self.asset_cache_capacity)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}
