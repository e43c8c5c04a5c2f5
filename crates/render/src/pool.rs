//! Engine pool for concurrent rendering.
//!
//! The pool manages multiple worker threads, distributing render requests
//! using round-robin scheduling with backpressure support.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use sveltide_core::{
    BuildMetadata, ContextData, Entry, RenderData, RenderResult, RendererConfig,
    DEFAULT_ERROR_PAGE,
};
use tokio::sync::{mpsc::error::TrySendError, oneshot};

use crate::{
    error::{RenderError, Result},
    worker::{EngineFactory, RenderRequest, RenderWorker},
};

/// Seconds suggested to clients when every worker queue is full.
const RETRY_AFTER_SECS: u32 = 5;

/// Deadline for the active health probe.
const HEALTH_TIMEOUT_MS: u64 = 5000;

/// A pool of render workers, one engine each.
pub struct RenderPool {
    workers: Vec<RenderWorker>,
    next_worker: AtomicUsize,
    render_timeout_ms: Option<u64>,
    metadata: BuildMetadata,
}

impl RenderPool {
    /// Create a new render pool.
    ///
    /// This is an I/O operation that spawns `worker_count` threads and waits
    /// until every engine has loaded the bundle. Any failure is fatal.
    pub fn new(config: &RendererConfig, factory: EngineFactory) -> Result<Self> {
        let mut workers = Vec::with_capacity(config.worker_count);
        let mut metadata = None;

        for id in 0..config.worker_count {
            let (worker, loaded) = RenderWorker::spawn(id, factory.clone(), config.max_pending)?;
            workers.push(worker);
            metadata.get_or_insert(loaded);
        }

        let metadata = metadata.ok_or(RenderError::Core(
            sveltide_core::CoreError::InvalidWorkerCount,
        ))?;

        tracing::info!(
            worker_count = workers.len(),
            components = metadata.manifest.len(),
            "Render pool initialized"
        );

        Ok(Self {
            workers,
            next_worker: AtomicUsize::new(0),
            render_timeout_ms: config.render_timeout_ms,
            metadata,
        })
    }

    /// Manifest and asset prefix shared by every worker.
    pub fn metadata(&self) -> &BuildMetadata {
        &self.metadata
    }

    /// Render using the pool.
    ///
    /// Uses round-robin scheduling, skipping workers whose queue is full.
    /// Returns `Overloaded` error if no workers have capacity.
    pub async fn render(&self, data: RenderData) -> Result<RenderResult> {
        let (_, response_rx) = self.dispatch(data)?;

        let Some(timeout_ms) = self.render_timeout_ms else {
            return response_rx.await.map_err(|_| RenderError::ChannelClosed)?;
        };

        // The worker still runs the job to completion after a timeout
        match tokio::time::timeout(Duration::from_millis(timeout_ms), response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RenderError::ChannelClosed),
            Err(_) => Err(RenderError::Timeout(timeout_ms)),
        }
    }

    /// Queue a request on the next worker with capacity.
    fn dispatch(
        &self,
        data: RenderData,
    ) -> Result<(usize, oneshot::Receiver<Result<RenderResult>>)> {
        let (response_tx, response_rx) = oneshot::channel();
        let mut request = RenderRequest { data, response_tx };

        let start = self.next_worker.fetch_add(1, Ordering::Relaxed);
        let mut closed = 0;

        for offset in 0..self.workers.len() {
            let worker_idx = (start + offset) % self.workers.len();
            match self.workers[worker_idx].try_send(request) {
                Ok(()) => return Ok((worker_idx, response_rx)),
                Err(TrySendError::Full(returned)) => request = returned,
                Err(TrySendError::Closed(returned)) => {
                    closed += 1;
                    request = returned;
                }
            }
        }

        if closed == self.workers.len() {
            return Err(RenderError::ChannelClosed);
        }

        tracing::warn!(
            worker_count = self.workers.len(),
            "All render workers are at capacity"
        );
        Err(RenderError::Overloaded {
            retry_after_secs: RETRY_AFTER_SECS,
        })
    }

    /// Get pool statistics (passive - no I/O).
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            worker_count: self.workers.len(),
            workers_with_capacity: self.workers.iter().filter(|w| w.has_capacity()).count(),
        }
    }

    /// Active health check - verifies workers can process requests.
    ///
    /// Renders the default error page and checks for a response within 5s.
    pub async fn health_check(&self) -> Result<HealthStatus> {
        let start = Instant::now();

        let probe = RenderData::new(
            vec![Entry::error(DEFAULT_ERROR_PAGE, "health probe", 200)],
            DEFAULT_ERROR_PAGE,
            ContextData::default(),
        );
        let (worker_idx, response_rx) = self.dispatch(probe)?;

        let outcome =
            tokio::time::timeout(Duration::from_millis(HEALTH_TIMEOUT_MS), response_rx).await;
        let error = match outcome {
            Ok(Ok(Ok(_result))) => None,
            Ok(Ok(Err(e))) => Some(e.to_string()),
            Ok(Err(_)) => return Err(RenderError::ChannelClosed),
            Err(_) => return Err(RenderError::Timeout(HEALTH_TIMEOUT_MS)),
        };

        Ok(HealthStatus {
            healthy: error.is_none(),
            latency_ms: start.elapsed().as_millis() as u64,
            worker_idx,
            stats: self.stats(),
            error,
        })
    }
}

/// Pool statistics (passive data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub worker_count: usize,
    pub workers_with_capacity: usize,
}

/// Health check result.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: u64,
    pub worker_idx: usize,
    pub stats: PoolStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{self, EchoEngine};
    use sveltide_core::{EngineError, Props};

    fn config(workers: usize, pending: usize, timeout: Option<u64>) -> RendererConfig {
        RendererConfig::new(workers, pending, timeout, "test".to_string()).unwrap()
    }

    fn page(title: &str) -> RenderData {
        let mut props = Props::new();
        props.insert("title".to_string(), title.into());
        RenderData::new(
            vec![
                Entry::new("layout/shell", None),
                Entry::new("page/home", Some(props)),
            ],
            DEFAULT_ERROR_PAGE,
            ContextData::default(),
        )
    }

    #[tokio::test]
    async fn test_pool_renders() {
        let pool = RenderPool::new(&config(2, 10, None), EchoEngine::default().factory()).unwrap();

        let result = pool.render(page("Hi")).await.unwrap();
        assert_eq!(
            result.body,
            r#"<shell-root><home-root data-title="Hi"></home-root></shell-root>"#
        );
        assert_eq!(pool.metadata(), &testing::metadata());
    }

    #[tokio::test]
    async fn test_concurrent_renders_do_not_bleed() {
        let pool = Arc::new(
            RenderPool::new(&config(2, 64, None), EchoEngine::default().factory()).unwrap(),
        );

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    let title = format!("request-{i}");
                    let result = pool.render(page(&title)).await.unwrap();
                    (title, result.body)
                })
            })
            .collect();

        for handle in handles {
            let (title, body) = handle.await.unwrap();
            assert_eq!(
                body,
                format!(r#"<shell-root><home-root data-title="{title}"></home-root></shell-root>"#)
            );
        }
    }

    #[tokio::test]
    async fn test_factory_failure_is_fatal() {
        let factory: EngineFactory = Arc::new(|| {
            Err(EngineError::BundleLoad {
                path: "server/render.js".to_string(),
                reason: "missing".to_string(),
            })
        });

        let err = RenderPool::new(&config(2, 10, None), factory).err().unwrap();
        assert!(matches!(
            err,
            RenderError::Engine(EngineError::BundleLoad { .. })
        ));
    }

    #[tokio::test]
    async fn test_overloaded_when_queues_full() {
        let engine = EchoEngine::default().with_delay(Duration::from_millis(300));
        let pool = Arc::new(RenderPool::new(&config(1, 1, None), engine.factory()).unwrap());

        // One request in flight, one queued
        let first = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.render(page("a")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.render(page("b")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = pool.render(page("c")).await.unwrap_err();
        assert!(matches!(err, RenderError::Overloaded { retry_after_secs: 5 }));
        assert_eq!(pool.stats().workers_with_capacity, 0);

        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_timeout() {
        let engine = EchoEngine::default().with_delay(Duration::from_millis(500));
        let pool = RenderPool::new(&config(1, 10, Some(50)), engine.factory()).unwrap();

        let err = pool.render(page("slow")).await.unwrap_err();
        assert!(matches!(err, RenderError::Timeout(50)));
    }

    #[tokio::test]
    async fn test_stats_and_health() {
        let pool = RenderPool::new(&config(3, 10, None), EchoEngine::default().factory()).unwrap();

        assert_eq!(
            pool.stats(),
            PoolStats {
                worker_count: 3,
                workers_with_capacity: 3,
            }
        );

        let health = pool.health_check().await.unwrap();
        assert!(health.healthy);
        assert!(health.error.is_none());
        assert!(health.worker_idx < 3);
    }
}
