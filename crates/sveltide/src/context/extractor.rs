//! Axum extractor for RenderContext.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, Extensions, HeaderMap, Uri},
};
use sveltide_render::NAVIGATION_HEADER;

use super::types::{ContextNotRegistered, RenderContext};

/// Absolute URL of the request.
///
/// Scheme from `X-Forwarded-Proto`, else the URI, else `http`. Host from the
/// `Host` header, else the URI authority.
pub(crate) fn request_url(uri: &Uri, headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| uri.scheme_str().map(str::to_string))
        .unwrap_or_else(|| "http".to_string());

    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_default();

    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    format!("{scheme}://{host}{path}")
}

/// The client router asked for the navigation JSON.
pub(crate) fn is_navigation(headers: &HeaderMap) -> bool {
    headers.contains_key(NAVIGATION_HEADER)
}

/// Context attached to a request.
///
/// # Panics
///
/// Panics with [`ContextNotRegistered`] when the attach layer is missing.
pub(crate) fn context_of(extensions: &Extensions) -> RenderContext {
    match extensions.get::<RenderContext>() {
        Some(ctx) => ctx.clone(),
        None => panic!("{ContextNotRegistered}"),
    }
}

impl<S> FromRequestParts<S> for RenderContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(context_of(&parts.extensions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_from_host_header() {
        let uri: Uri = "/blog/post?id=1".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("host", "example.com:8080".parse().unwrap());

        assert_eq!(
            request_url(&uri, &headers),
            "http://example.com:8080/blog/post?id=1"
        );
    }

    #[test]
    fn test_request_url_honours_forwarded_proto() {
        let uri: Uri = "/".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("host", "example.com".parse().unwrap());
        headers.insert("x-forwarded-proto", "https, http".parse().unwrap());

        assert_eq!(request_url(&uri, &headers), "https://example.com/");
    }

    #[test]
    fn test_request_url_from_absolute_uri() {
        let uri: Uri = "https://example.org/a".parse().unwrap();
        assert_eq!(request_url(&uri, &HeaderMap::new()), "https://example.org/a");
    }

    #[test]
    fn test_is_navigation() {
        let mut headers = HeaderMap::new();
        assert!(!is_navigation(&headers));

        headers.insert(NAVIGATION_HEADER, "true".parse().unwrap());
        assert!(is_navigation(&headers));
    }

    #[test]
    #[should_panic(expected = "render context not registered")]
    fn test_missing_context_panics() {
        context_of(&Extensions::new());
    }
}
