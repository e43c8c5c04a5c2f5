//! Pure JavaScript glue for the embedded engine.
//!
//! Scripts here talk back to Rust through two ops: `op_set_result` (one JSON
//! document per script) and `op_log` (console forwarding).

use serde::Deserialize;

use crate::engine::EngineError;
use crate::entry::RenderResult;
use crate::error::{CoreError, Result};
use crate::manifest::BuildMetadata;

/// Global holding the exports of `server/render.js`.
pub const RENDER_GLOBAL: &str = "__sveltide_render";

/// Global holding the exports of `server/info.js`.
pub const INFO_GLOBAL: &str = "__sveltide_info";

/// Generate the runtime prelude: console forwarding, `process` and `performance`.
///
/// Uses safe string injection for `node_env`.
pub fn generate_prelude(node_env: &str) -> Result<String> {
    let node_env_escaped =
        serde_json::to_string(node_env).map_err(|e| CoreError::Serialization(e.to_string()))?;

    Ok(format!(
        r#"
// Process polyfill (Node.js compatibility)
globalThis.process = {{
    env: {{ NODE_ENV: {node_env_escaped} }},
    nextTick: (fn) => queueMicrotask(fn),
}};

{CONSOLE_POLYFILL}
{PERFORMANCE_POLYFILL}
"#
    ))
}

const CONSOLE_POLYFILL: &str = r#"
// Console polyfill - forward JS logs to Rust tracing
const formatArgs = (args) => args.map(a => typeof a === 'object' ? JSON.stringify(a) : String(a)).join(' ');
globalThis.console = {
    log: (...args) => Deno.core.ops.op_log('info', formatArgs(args)),
    info: (...args) => Deno.core.ops.op_log('info', formatArgs(args)),
    warn: (...args) => Deno.core.ops.op_log('warn', formatArgs(args)),
    error: (...args) => Deno.core.ops.op_log('error', formatArgs(args)),
    debug: (...args) => Deno.core.ops.op_log('debug', formatArgs(args)),
};
"#;

const PERFORMANCE_POLYFILL: &str = r#"
// Performance polyfill for timing
const performanceStart = Date.now();
globalThis.performance = { now: () => Date.now() - performanceStart };
"#;

/// Evaluate a CommonJS module and store its exports in `globalThis[global]`.
pub fn wrap_commonjs(global: &str, source: &str) -> String {
    format!(
        r#"
globalThis.{global} = (function () {{
    const module = {{ exports: {{}} }};
    const require = (id) => {{ throw new Error(`require("${{id}}") is not available; bundle server code into one file`); }};
    (function (module, exports, require) {{
{source}
    }})(module, module.exports, require);
    return module.exports;
}})();
"#
    )
}

/// Script reporting the manifest and asset prefix through `op_set_result`.
pub fn metadata_script() -> String {
    format!(
        r#"
(() => {{
    const render = globalThis.{RENDER_GLOBAL} ?? {{}};
    const info = globalThis.{INFO_GLOBAL} ?? {{}};
    const source = render.Manifest ?? render.manifest;
    const fn = render.Render ?? render.render;
    if (!source || typeof fn !== 'function') {{
        Deno.core.ops.op_set_result(JSON.stringify({{ err: {{ message: 'render.js must export Manifest and Render' }} }}));
        return;
    }}
    const manifest = {{}};
    for (const [id, c] of Object.entries(source)) {{
        manifest[id] = {{
            client: String(c.client ?? c.Client ?? ''),
            css: Array.from(c.css ?? c.CSS ?? [], String),
        }};
    }}
    const assets = String(info.Assets ?? info.assets ?? '');
    Deno.core.ops.op_set_result(JSON.stringify({{ ok: {{ manifest, assets }} }}));
}})();
"#
    )
}

/// Script running one render with the given payload.
///
/// Double-encodes the payload (JSON string containing JSON) so props can
/// only ever be parsed as data.
pub fn render_call(payload_json: &str) -> Result<String> {
    let payload_escaped = serde_json::to_string(payload_json)
        .map_err(|e| CoreError::Serialization(e.to_string()))?;

    Ok(format!(
        r#"
(() => {{
    const render = globalThis.{RENDER_GLOBAL};
    const {{ entries, errorPage, contextData }} = JSON.parse({payload_escaped});
    const isRenderError = render.IsRenderError ?? ((e) => e != null && Number.isInteger(e.index));
    let outcome;
    try {{
        const r = (render.Render ?? render.render)(entries, contextData, errorPage);
        outcome = {{ ok: {{
            head: String(r.Head ?? r.head ?? ''),
            body: String(r.Body ?? r.body ?? ''),
            hasError: !!(r.HasError ?? r.hasError),
        }} }};
    }} catch (e) {{
        const message = String(e?.message ?? e);
        const stack = String(e?.stack ?? e);
        outcome = isRenderError(e)
            ? {{ err: {{ index: e.index, message, stack }} }}
            : {{ err: {{ message, stack }} }};
    }}
    Deno.core.ops.op_set_result(JSON.stringify(outcome));
}})();
"#
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum Outcome<T> {
    Ok(T),
    Err(ScriptFailure),
}

#[derive(Deserialize)]
struct ScriptFailure {
    index: Option<usize>,
    message: String,
    #[serde(default)]
    stack: String,
}

/// Decode the document written by [`render_call`].
pub fn decode_render_outcome(raw: &str) -> std::result::Result<RenderResult, EngineError> {
    let outcome: Outcome<RenderResult> =
        serde_json::from_str(raw).map_err(|e| EngineError::Protocol(e.to_string()))?;

    match outcome {
        Outcome::Ok(result) => Ok(result),
        Outcome::Err(ScriptFailure {
            index: Some(index),
            message,
            stack,
        }) => Err(EngineError::Render {
            index,
            message,
            stack_trace: stack,
        }),
        Outcome::Err(ScriptFailure {
            index: None,
            message,
            stack,
        }) => Err(EngineError::Script {
            message,
            stack_trace: stack,
        }),
    }
}

/// Decode the document written by [`metadata_script`].
pub fn decode_metadata(raw: &str) -> std::result::Result<BuildMetadata, EngineError> {
    let outcome: Outcome<BuildMetadata> =
        serde_json::from_str(raw).map_err(|e| EngineError::Protocol(e.to_string()))?;

    match outcome {
        Outcome::Ok(metadata) => Ok(metadata),
        Outcome::Err(failure) => Err(EngineError::BundleLoad {
            path: "render.js".to_string(),
            reason: failure.message,
        }),
    }
}
