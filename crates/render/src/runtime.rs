//! deno_core-backed script engine.
//!
//! This module contains the impure side-effect code that executes
//! JavaScript using deno_core's JsRuntime. It is the only module that
//! touches engine-specific types.

use std::cell::RefCell;

use deno_core::{extension, op2, JsRuntime, RuntimeOptions};
use sveltide_core::{
    bootstrap::{self, INFO_GLOBAL, RENDER_GLOBAL},
    BuildMetadata, EngineError, RenderData, RenderResult, ScriptEngine,
};

use crate::fs::BuildFs;

thread_local! {
    /// Thread-local storage for the JSON document written by the last script.
    /// This is used because deno_core ops can't easily return complex values.
    static SCRIPT_RESULT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Custom op to receive a script's result from JavaScript.
#[op2(fast)]
fn op_set_result(#[string] json: String) {
    SCRIPT_RESULT.with(|cell| {
        *cell.borrow_mut() = Some(json);
    });
}

/// Custom op forwarding `console.*` to tracing.
#[op2(fast)]
fn op_log(#[string] level: String, #[string] message: String) {
    match level.as_str() {
        "error" => tracing::error!(target: "sveltide::js", "{message}"),
        "warn" => tracing::warn!(target: "sveltide::js", "{message}"),
        "debug" => tracing::debug!(target: "sveltide::js", "{message}"),
        _ => tracing::info!(target: "sveltide::js", "{message}"),
    }
}

extension!(sveltide_ext, ops = [op_set_result, op_log]);

/// Script engine running the compiled server bundle in one persistent `JsRuntime`.
///
/// **MUST stay on the thread that created it** - `JsRuntime` is not `Send`.
pub struct DenoEngine {
    runtime: JsRuntime,
    metadata: BuildMetadata,
}

impl DenoEngine {
    /// Load `render.js` and `info.js` from the server build output.
    pub fn new(server_fs: &dyn BuildFs, node_env: &str) -> Result<Self, EngineError> {
        let render_code = read_bundle(server_fs, "render.js")?;
        let info_code = read_bundle(server_fs, "info.js")?;

        // Pure function call from core - generates prelude string
        let prelude = bootstrap::generate_prelude(node_env)?;

        let mut runtime = JsRuntime::new(RuntimeOptions {
            extensions: vec![sveltide_ext::init()],
            ..Default::default()
        });

        runtime
            .execute_script("<prelude>", prelude)
            .map_err(|e| EngineError::JsExecution(e.to_string()))?;

        runtime
            .execute_script(
                "<render.js>",
                bootstrap::wrap_commonjs(RENDER_GLOBAL, &render_code),
            )
            .map_err(|e| bundle_error("render.js", e))?;

        runtime
            .execute_script("<info.js>", bootstrap::wrap_commonjs(INFO_GLOBAL, &info_code))
            .map_err(|e| bundle_error("info.js", e))?;

        let raw = run_for_result(&mut runtime, "<metadata>", bootstrap::metadata_script())?;
        let metadata = bootstrap::decode_metadata(&raw)?;

        tracing::debug!(
            components = metadata.manifest.len(),
            assets = %metadata.assets,
            "Server bundle loaded"
        );

        Ok(Self { runtime, metadata })
    }
}

impl ScriptEngine for DenoEngine {
    fn metadata(&self) -> &BuildMetadata {
        &self.metadata
    }

    fn render(&mut self, data: &RenderData) -> Result<RenderResult, EngineError> {
        self.metadata.manifest.check(data)?;

        let payload = data.to_json()?;
        let script = bootstrap::render_call(&payload)?;
        let raw = run_for_result(&mut self.runtime, "<render>", script)?;

        bootstrap::decode_render_outcome(&raw)
    }
}

fn read_bundle(server_fs: &dyn BuildFs, path: &str) -> Result<String, EngineError> {
    server_fs
        .read_to_string(path)
        .map_err(|e| bundle_error(path, e))
}

fn bundle_error(path: &str, e: impl std::fmt::Display) -> EngineError {
    EngineError::BundleLoad {
        path: format!("server/{path}"),
        reason: e.to_string(),
    }
}

/// Execute a script and take the document it passed to `op_set_result`.
fn run_for_result(
    runtime: &mut JsRuntime,
    name: &'static str,
    script: String,
) -> Result<String, EngineError> {
    clear_script_result();

    let executed = runtime.execute_script(name, script);
    // Taken even on failure so a partial result never reaches the next script.
    let result = SCRIPT_RESULT.with(|cell| cell.borrow_mut().take());

    executed.map_err(|e| EngineError::JsExecution(e.to_string()))?;
    result.ok_or(EngineError::NoResult)
}

fn clear_script_result() {
    SCRIPT_RESULT.with(|cell| {
        *cell.borrow_mut() = None;
    });
}
