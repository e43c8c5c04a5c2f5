//! Renderer configuration with validation.

use crate::error::{CoreError, Result};

/// Default number of client files kept in the inliner cache.
pub const DEFAULT_ASSET_CACHE_CAPACITY: usize = 256;

/// Configuration for the renderer and its engine pool (validated).
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Number of worker threads, each owning one script engine.
    pub worker_count: usize,
    /// Maximum queued renders per worker before the pool reports overload.
    pub max_pending: usize,
    /// Caller-side render timeout in milliseconds. `None` waits for completion.
    pub render_timeout_ms: Option<u64>,
    /// NODE_ENV value exposed to the server bundle.
    pub node_env: String,
    /// Also inline `<script src>` tags, not only stylesheets.
    pub inline_scripts: bool,
    /// Number of client files kept in the inliner cache.
    pub asset_cache_capacity: usize,
}

impl RendererConfig {
    /// Create and validate renderer config.
    pub fn new(
        worker_count: usize,
        max_pending: usize,
        render_timeout_ms: Option<u64>,
        node_env: String,
    ) -> Result<Self> {
        if worker_count == 0 {
            return Err(CoreError::InvalidWorkerCount);
        }
        if max_pending == 0 {
            return Err(CoreError::InvalidQueueSize);
        }
        if render_timeout_ms == Some(0) {
            return Err(CoreError::InvalidTimeout);
        }

        Ok(Self {
            worker_count,
            max_pending,
            render_timeout_ms,
            node_env,
            inline_scripts: false,
            asset_cache_capacity: DEFAULT_ASSET_CACHE_CAPACITY,
        })
    }

    /// Create with defaults (100 pending, no timeout, production).
    pub fn with_defaults(worker_count: usize) -> Result<Self> {
        Self::new(worker_count, 100, None, "production".to_string())
    }

    /// Enable or disable `<script src>` inlining.
    pub fn with_inline_scripts(mut self, enabled: bool) -> Self {
        self.inline_scripts = enabled;
        self
    }

    /// Set the inliner cache capacity.
    pub fn with_asset_cache_capacity(mut self, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CoreError::InvalidCacheCapacity);
        }
        self.asset_cache_capacity = capacity;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_valid() {
        let config = RendererConfig::new(4, 100, Some(10_000), "production".to_string()).unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.max_pending, 100);
        assert_eq!(config.render_timeout_ms, Some(10_000));
        assert_eq!(config.node_env, "production");
        assert!(!config.inline_scripts);
        assert_eq!(config.asset_cache_capacity, DEFAULT_ASSET_CACHE_CAPACITY);
    }

    #[test]
    fn test_config_zero_workers() {
        let result = RendererConfig::new(0, 100, None, "production".to_string());
        assert!(matches!(result, Err(CoreError::InvalidWorkerCount)));
    }

    #[test]
    fn test_config_zero_pending() {
        let result = RendererConfig::new(2, 0, None, "production".to_string());
        assert!(matches!(result, Err(CoreError::InvalidQueueSize)));
    }

    #[test]
    fn test_config_zero_timeout() {
        let result = RendererConfig::new(4, 100, Some(0), "production".to_string());
        assert!(matches!(result, Err(CoreError::InvalidTimeout)));
    }

    #[test]
    fn test_config_with_defaults() {
        let config = RendererConfig::with_defaults(8).unwrap();
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.max_pending, 100);
        assert_eq!(config.render_timeout_ms, None);
        assert_eq!(config.node_env, "production");
    }

    #[test]
    fn test_config_builders() {
        let config = RendererConfig::with_defaults(1)
            .unwrap()
            .with_inline_scripts(true)
            .with_asset_cache_capacity(16)
            .unwrap();
        assert!(config.inline_scripts);
        assert_eq!(config.asset_cache_capacity, 16);

        let result = RendererConfig::with_defaults(1)
            .unwrap()
            .with_asset_cache_capacity(0);
        assert!(matches!(result, Err(CoreError::InvalidCacheCapacity)));
    }
}
