//! In-process script engine and build output fixtures for tests.
//!
//! `EchoEngine` renders each entry as `<{name}-root data-{prop}="{value}">`
//! where `{name}` is the last `/` segment of the component id, nesting later
//! entries inside earlier ones the way a compiled bundle nests layouts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sveltide_core::{
    BuildMetadata, EngineError, Manifest, ManifestEntry, RenderData, RenderResult,
    RendererConfig, ScriptEngine, DEFAULT_ERROR_PAGE,
};

use crate::fs::{MemoryFs, SharedFs};
use crate::renderer::Renderer;
use crate::worker::EngineFactory;

/// Shell template written with Go-style placeholders, as existing build tooling emits it.
pub const TEMPLATE_HTML: &str =
    "<!doctype html><html><head>{{.Head}}</head><body>{{.Body}}</body></html>";

/// Deterministic engine echoing entries and props as nested markup.
#[derive(Clone)]
pub struct EchoEngine {
    metadata: BuildMetadata,
    throws: HashMap<String, String>,
    soft_errors: Vec<String>,
    delay: Option<Duration>,
}

impl Default for EchoEngine {
    fn default() -> Self {
        Self::new(metadata())
    }
}

impl EchoEngine {
    pub fn new(metadata: BuildMetadata) -> Self {
        Self {
            metadata,
            throws: HashMap::new(),
            soft_errors: Vec::new(),
            delay: None,
        }
    }

    /// Throw a render error with `message` whenever `component` is rendered.
    pub fn throwing(mut self, component: &str, message: &str) -> Self {
        self.throws
            .insert(component.to_string(), message.to_string());
        self
    }

    /// Report `hasError` whenever `component` is rendered.
    pub fn soft_error(mut self, component: &str) -> Self {
        self.soft_errors.push(component.to_string());
        self
    }

    /// Block the worker for `delay` on every render.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn factory(self) -> EngineFactory {
        Arc::new(move || Ok(Box::new(self.clone()) as Box<dyn ScriptEngine>))
    }
}

impl ScriptEngine for EchoEngine {
    fn metadata(&self) -> &BuildMetadata {
        &self.metadata
    }

    fn render(&mut self, data: &RenderData) -> Result<RenderResult, EngineError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        self.metadata.manifest.check(data)?;

        for (index, entry) in data.entries.iter().enumerate() {
            if let Some(message) = self.throws.get(&entry.component) {
                return Err(EngineError::Render {
                    index,
                    message: message.clone(),
                    stack_trace: format!("Error: {message}\n    at {}", entry.component),
                });
            }
        }

        let body = data.entries.iter().rev().fold(String::new(), |inner, entry| {
            let name = entry.component.rsplit('/').next().unwrap_or_default();
            let attrs: String = entry
                .props
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    format!(" data-{key}=\"{}\"", escape_attribute(&value))
                })
                .collect();
            format!("<{name}-root{attrs}>{inner}</{name}-root>")
        });

        let head: String = self
            .metadata
            .manifest
            .stylesheets(data)
            .into_iter()
            .map(|href| format!(r#"<link rel="stylesheet" href="{href}">"#))
            .collect();

        let has_error = data
            .entries
            .iter()
            .any(|entry| self.soft_errors.contains(&entry.component));

        Ok(RenderResult {
            head,
            body,
            has_error,
        })
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn entry(client: &str, css: &[&str]) -> ManifestEntry {
    ManifestEntry::new(client, css.iter().map(|s| s.to_string()).collect())
}

/// Manifest of the fixture build.
pub fn metadata() -> BuildMetadata {
    let manifest: Manifest = [
        ("layout/shell", entry("/app_/entries/shell.js", &["/app_/assets/shell.css"])),
        ("layout/l0", entry("/app_/entries/l0.js", &[])),
        ("layout/l1", entry("/app_/entries/l1.js", &[])),
        ("layout/bad", entry("/app_/entries/bad.js", &[])),
        ("page/home", entry("/app_/entries/home.js", &["/app_/assets/home.css"])),
        ("page/p", entry("/app_/entries/p.js", &[])),
        ("page/x", entry("/app_/entries/x.js", &["/app_/assets/x.css"])),
        ("error/main", entry("/app_/entries/main-error.js", &["/app_/assets/error.css"])),
        (DEFAULT_ERROR_PAGE, entry("/app_/entries/error.js", &[])),
    ]
    .into_iter()
    .map(|(id, entry)| (id.to_string(), entry))
    .collect();

    BuildMetadata {
        manifest,
        assets: "app_".to_string(),
    }
}

/// Build output matching [`metadata`].
pub fn build_fs() -> MemoryFs {
    MemoryFs::new()
        .with_file("server/template.html", TEMPLATE_HTML)
        .with_file("client/assets/shell.css", ".shell{display:grid}")
        .with_file("client/assets/home.css", ".home{color:red}")
        .with_file("client/assets/x.css", ".x{margin:0}")
        .with_file("client/assets/error.css", ".error{color:crimson}")
        .with_file("client/assets/logo-3f2a9c1d.svg", "<svg></svg>")
        .with_file("client/entries/x.js", "export const x = 1;")
        .with_file("client/entries/home.js", "export const home = 1;")
        .with_file("client/chunks/shared-8b1e.js", "export const shared = 1;")
}

/// Renderer over [`build_fs`] driven by `engine`.
pub fn renderer(engine: EchoEngine) -> Renderer {
    renderer_with(build_fs(), engine, config())
}

pub fn renderer_with(fs: MemoryFs, engine: EchoEngine, config: RendererConfig) -> Renderer {
    let fs: SharedFs = Arc::new(fs);
    match Renderer::with_engine(fs, config, engine.factory()) {
        Ok(renderer) => renderer,
        Err(e) => panic!("fixture renderer failed to start: {e}"),
    }
}

/// Two workers, no timeout.
pub fn config() -> RendererConfig {
    match RendererConfig::new(2, 32, None, "test".to_string()) {
        Ok(config) => config,
        Err(e) => panic!("invalid fixture config: {e}"),
    }
}
