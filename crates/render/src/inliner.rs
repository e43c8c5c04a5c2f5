//! Resource inliner.
//!
//! Replaces `<link rel="stylesheet">` (and optionally `<script src>`) tags that
//! point into the client build output with inline `<style>` / `<script>`
//! elements. Inlining is best-effort: any reference that cannot be resolved is
//! left as it was.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use sveltide_core::resource::{self, Replacement, SEARCH_DIRS};

use crate::fs::SharedFs;

/// A client file located in the build output.
#[derive(Debug)]
struct Asset {
    /// Path relative to the client root, e.g. `assets/app.css`.
    path: String,
    content: String,
}

/// Filename → located file (or a cached miss).
type AssetCache = LruCache<String, Option<Arc<Asset>>>;

pub struct ResourceInliner {
    client: SharedFs,
    include_scripts: bool,
    cache: Mutex<AssetCache>,
}

impl ResourceInliner {
    /// `client` is the root of the client build output.
    pub fn new(client: SharedFs, include_scripts: bool, cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            include_scripts,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Inline every resolvable reference in `html`.
    pub fn inline(&self, html: &str) -> String {
        let references = resource::scan(html, self.include_scripts);
        if references.is_empty() {
            return html.to_string();
        }

        let mut inlined = HashSet::new();
        let mut replacements = Vec::with_capacity(references.len());

        for reference in &references {
            if reference.is_external() {
                continue;
            }
            let Some(name) = reference.file_name() else {
                continue;
            };
            let Some(asset) = self.load(name) else {
                tracing::debug!(path = %reference.path, "Resource not found in client build output");
                continue;
            };
            if resource::breaks_inline_element(reference.kind, &asset.content) {
                tracing::debug!(path = %asset.path, "Resource would close its inline element, skipping");
                continue;
            }

            // Same file again in this pass: drop the tag instead of repeating its content
            let text = if inlined.insert(asset.path.clone()) {
                resource::inline_tag(reference, &asset.content)
            } else {
                String::new()
            };

            replacements.push(Replacement {
                span: reference.span.clone(),
                text,
            });
        }

        resource::substitute(html, replacements)
    }

    /// Number of filenames currently cached.
    pub fn cached(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn load(&self, name: &str) -> Option<Arc<Asset>> {
        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return hit.clone();
        }

        // Read outside the lock; a concurrent miss for the same name stores the same value
        let found = SEARCH_DIRS.iter().find_map(|dir| {
            let path = format!("{dir}/{name}");
            let bytes = self.client.read(&path).ok()?;
            match String::from_utf8(bytes) {
                Ok(content) => Some(Arc::new(Asset { path, content })),
                Err(_) => {
                    tracing::debug!(path = %path, "Resource is not UTF-8, skipping");
                    None
                }
            }
        });

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(name.to_string(), found.clone());

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{MemoryFs, SubFs};

    fn inliner(include_scripts: bool) -> ResourceInliner {
        let root: SharedFs = Arc::new(
            MemoryFs::new()
                .with_file("client/assets/a.css", ".a{}")
                .with_file("client/assets/dup.js", "assets()")
                .with_file("client/entries/dup.js", "entries()")
                .with_file("client/entries/x.js", "x()")
                .with_file("client/chunks/c.js", "chunk()")
                .with_file("client/assets/evil.css", "a{}</style><script>alert(1)</script>")
                .with_file("client/assets/bin.css", vec![0xffu8, 0xfe, 0x00]),
        );
        let client: SharedFs = Arc::new(SubFs::new(root, "client"));
        ResourceInliner::new(client, include_scripts, 16)
    }

    #[test]
    fn test_inlines_stylesheets_in_place() {
        let html = r#"<head><link rel="stylesheet" href="/app_/assets/a.css"><title>t</title></head>"#;
        assert_eq!(
            inliner(false).inline(html),
            "<head><style>.a{}</style><title>t</title></head>"
        );
    }

    #[test]
    fn test_skips_external_missing_and_unsafe() {
        let html = concat!(
            r#"<link rel="stylesheet" href="https://cdn.example.com/a.css">"#,
            r#"<link rel="stylesheet" href="/app_/assets/missing.css">"#,
            r#"<link rel="stylesheet" href="/app_/assets/evil.css">"#,
            r#"<link rel="stylesheet" href="/app_/assets/bin.css">"#,
        );
        assert_eq!(inliner(false).inline(html), html);
    }

    #[test]
    fn test_scripts_only_when_enabled() {
        let html = r#"<script type="module" src="/app_/entries/x.js"></script>"#;
        assert_eq!(inliner(false).inline(html), html);
        assert_eq!(
            inliner(true).inline(html),
            r#"<script type="module">x()</script>"#
        );
    }

    #[test]
    fn test_search_order_prefers_assets() {
        let html = r#"<script src="/app_/chunks/dup.js"></script><script src="/c.js"></script>"#;
        assert_eq!(
            inliner(true).inline(html),
            "<script>assets()</script><script>chunk()</script>"
        );
    }

    #[test]
    fn test_duplicate_reference_is_inlined_once() {
        let html = r#"<link rel="stylesheet" href="/app_/assets/a.css"><p></p><link rel="stylesheet" href="/other/a.css?v=2">"#;
        assert_eq!(inliner(false).inline(html), "<style>.a{}</style><p></p>");
    }

    #[test]
    fn test_inlining_is_idempotent() {
        let inliner = inliner(true);
        let html = r#"<link rel="stylesheet" href="/app_/assets/a.css"><script src="/app_/entries/x.js"></script><link rel="stylesheet" href="https://cdn.example.com/b.css">"#;

        let once = inliner.inline(html);
        let twice = inliner.inline(&once);
        assert_eq!(once, twice);
        assert!(!once.contains("/app_/"));
    }

    #[test]
    fn test_cache_is_shared_across_passes() {
        let inliner = inliner(false);
        let html = r#"<link rel="stylesheet" href="/app_/assets/a.css"><link rel="stylesheet" href="/app_/assets/missing.css">"#;

        inliner.inline(html);
        inliner.inline(html);
        assert_eq!(inliner.cached(), 2);
    }

    #[test]
    fn test_order_is_preserved() {
        let root: SharedFs = Arc::new(
            MemoryFs::new()
                .with_file("client/assets/one.css", "1")
                .with_file("client/assets/two.css", "2")
                .with_file("client/assets/three.css", "3"),
        );
        let inliner = ResourceInliner::new(Arc::new(SubFs::new(root, "client")), false, 4);
        let html = r#"<link rel="stylesheet" href="/one.css"><link href="/two.css" rel="stylesheet"><i></i><link rel=stylesheet href=/three.css>"#;

        assert_eq!(
            inliner.inline(html),
            "<style>1</style><style>2</style><i></i><style>3</style>"
        );
    }
}
