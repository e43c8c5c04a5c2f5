//! Static file serving for the client build output.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    routing::get,
    Router,
};
use sveltide_render::{check_path, Renderer};

/// Serve the client build output under the renderer's asset prefix.
pub fn assets_router<S>(renderer: Arc<Renderer>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let route = format!("{}{{*path}}", renderer.asset_prefix());
    Router::new()
        .route(&route, get(serve_asset))
        .with_state(renderer)
}

/// GET {prefix}/{*path} - one file from the client build output.
///
/// Directories and traversal attempts are not found.
pub async fn serve_asset(
    State(renderer): State<Arc<Renderer>>,
    Path(path): Path<String>,
) -> Response<Body> {
    let client = renderer.client_fs();
    if check_path(&path).is_err() || client.is_dir(&path) {
        return not_found();
    }

    let Ok(contents) = client.read(&path) else {
        return not_found();
    };

    let filename = path.rsplit('/').next().unwrap_or(path.as_str());

    // Set cache headers for hashed files (immutable)
    let is_hashed = filename.contains('-') && !filename.ends_with(".map");
    let cache_control = if is_hashed {
        "public, max-age=31536000, immutable"
    } else {
        "public, max-age=3600"
    };

    let mut response = Response::new(Body::from(contents));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(content_type(filename)),
    );
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static(cache_control),
    );
    response
}

/// Content type by extension.
fn content_type(filename: &str) -> &'static str {
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "map" | "json" => "application/json",
        "html" => "text/html; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "wasm" => "application/wasm",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn not_found() -> Response<Body> {
    let mut response = Response::new(Body::from("Not found"));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
