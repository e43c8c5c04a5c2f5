//! Render worker thread management.
//!
//! Each worker runs in a dedicated thread with its own Tokio runtime
//! because script engines (`deno_core::JsRuntime` in particular) are not `Send`.

use std::sync::Arc;

use sveltide_core::{BuildMetadata, EngineError, RenderData, RenderResult, ScriptEngine};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};

use crate::error::{RenderError, Result};

/// Builds one engine per worker, on the worker's own thread.
pub type EngineFactory =
    Arc<dyn Fn() -> std::result::Result<Box<dyn ScriptEngine>, EngineError> + Send + Sync>;

/// Request sent to a worker for rendering.
pub struct RenderRequest {
    pub data: RenderData,
    /// Channel to send the result back.
    pub response_tx: oneshot::Sender<Result<RenderResult>>,
}

/// A dedicated render worker thread owning exactly one engine.
///
/// Requests are processed one at a time, so an engine never sees two
/// in-flight calls.
pub struct RenderWorker {
    request_tx: mpsc::Sender<RenderRequest>,
}

impl RenderWorker {
    /// Spawn a worker thread and wait until its engine is ready.
    ///
    /// Returns the metadata the engine loaded, or the error that kept it
    /// from starting.
    pub fn spawn(
        id: usize,
        factory: EngineFactory,
        max_pending: usize,
    ) -> Result<(Self, BuildMetadata)> {
        let (request_tx, mut request_rx) = mpsc::channel::<RenderRequest>(max_pending);
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<BuildMetadata>>(1);

        std::thread::Builder::new()
            .name(format!("sveltide-render-{id}"))
            .spawn(move || {
                // Create a single-threaded Tokio runtime for this worker
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(RenderError::Io {
                            path: "<worker runtime>".to_string(),
                            reason: e.to_string(),
                        }));
                        return;
                    }
                };

                rt.block_on(async move {
                    let mut engine = match factory() {
                        Ok(engine) => engine,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e.into()));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(engine.metadata().clone()));

                    tracing::debug!(worker = id, "Render worker started");

                    while let Some(req) = request_rx.recv().await {
                        let result = engine.render(&req.data).map_err(RenderError::from);

                        // Send result back, ignoring if receiver dropped
                        let _ = req.response_tx.send(result);
                    }

                    tracing::debug!(worker = id, "Render worker shutting down");
                });
            })
            .map_err(|e| RenderError::Io {
                path: "<worker thread>".to_string(),
                reason: e.to_string(),
            })?;

        let metadata = ready_rx.recv().map_err(|_| RenderError::ChannelClosed)??;

        Ok((Self { request_tx }, metadata))
    }

    /// Check if the worker has capacity for more requests.
    pub fn has_capacity(&self) -> bool {
        self.request_tx.capacity() > 0
    }

    /// Queue a request without waiting; hands it back when the queue is full or closed.
    pub fn try_send(
        &self,
        request: RenderRequest,
    ) -> std::result::Result<(), TrySendError<RenderRequest>> {
        self.request_tx.try_send(request)
    }
}
