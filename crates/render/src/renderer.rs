//! Renderer: turns render data into an HTML page or a navigation document.

use std::sync::Arc;

use sveltide_core::{
    BuildMetadata, Manifest, RenderData, RendererConfig, ScriptEngine, NAVIGATION_HEADER,
};

use crate::{
    error::{RenderError, Result},
    fs::{SharedFs, SubFs},
    inliner::ResourceInliner,
    output::RenderOutput,
    pool::{HealthStatus, PoolStats, RenderPool},
    runtime::DenoEngine,
    template::HtmlTemplate,
    worker::EngineFactory,
};

/// Process-wide renderer, shared by every request.
pub struct Renderer {
    pool: RenderPool,
    template: HtmlTemplate,
    inliner: ResourceInliner,
    client: SharedFs,
}

impl Renderer {
    /// Create a renderer backed by deno engines.
    ///
    /// `build_fs` is the build output root holding `server/` and `client/`.
    pub fn new(build_fs: SharedFs, config: RendererConfig) -> Result<Self> {
        let server: SharedFs = Arc::new(SubFs::new(Arc::clone(&build_fs), "server"));
        let node_env = config.node_env.clone();

        let factory: EngineFactory = Arc::new(move || {
            DenoEngine::new(server.as_ref(), &node_env)
                .map(|engine| Box::new(engine) as Box<dyn ScriptEngine>)
        });

        Self::with_engine(build_fs, config, factory)
    }

    /// Create a renderer with engines built by `factory`.
    pub fn with_engine(
        build_fs: SharedFs,
        config: RendererConfig,
        factory: EngineFactory,
    ) -> Result<Self> {
        let template = HtmlTemplate::load(&SubFs::new(Arc::clone(&build_fs), "server"))?;
        let pool = RenderPool::new(&config, factory)?;

        let client: SharedFs = Arc::new(SubFs::new(build_fs, "client"));
        let inliner = ResourceInliner::new(
            Arc::clone(&client),
            config.inline_scripts,
            config.asset_cache_capacity,
        );

        tracing::info!(
            assets = %pool.metadata().assets,
            inline_scripts = config.inline_scripts,
            "Renderer ready"
        );

        Ok(Self {
            pool,
            template,
            inliner,
            client,
        })
    }

    /// Render `data` into `out`.
    ///
    /// With `csr` set, answers the navigation JSON without running the engine.
    /// Body bytes are written only once every step succeeded.
    pub async fn render(&self, out: &mut RenderOutput, data: &RenderData, csr: bool) -> Result<()> {
        out.set_header("vary", NAVIGATION_HEADER);

        if csr {
            let navigation = self.manifest().navigation(data)?;
            let json = serde_json::to_string(&navigation)
                .map_err(|e| RenderError::Serialization(e.to_string()))?;

            out.set_header("content-type", "application/json");
            out.write_body(&json);
            return Ok(());
        }

        let result = self.pool.render(data.clone()).await?;
        if result.has_error {
            out.write_status(500);
        }

        let html = self.template.render(&result.head, &result.body)?;
        let html = self.inliner.inline(&html);

        out.set_header("content-type", "text/html; charset=utf-8");
        out.write_body(&html);
        Ok(())
    }

    /// Asset path prefix, as reported by the build.
    pub fn assets(&self) -> &str {
        &self.metadata().assets
    }

    /// Asset prefix as a URL path: `/prefix/`, or `/` when empty.
    pub fn asset_prefix(&self) -> String {
        let trimmed = self.assets().trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.metadata().manifest
    }

    pub fn metadata(&self) -> &BuildMetadata {
        self.pool.metadata()
    }

    /// Root of the client build output.
    pub fn client_fs(&self) -> &SharedFs {
        &self.client
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub async fn health_check(&self) -> Result<HealthStatus> {
        self.pool.health_check().await
    }
}
