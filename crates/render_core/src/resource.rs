//! Resource references in rendered HTML.
//!
//! A small tag tokenizer finds `<link rel="stylesheet">` and `<script src>`
//! tags in document order. It understands quoted attribute values (including
//! ones containing `>`), unquoted and valueless attributes, comments, and the
//! raw-text bodies of `<script>` and `<style>`, so inline content is never
//! mistaken for markup.

use std::ops::Range;

/// Client build directories searched for a referenced file, in priority order.
pub const SEARCH_DIRS: [&str; 3] = ["assets", "entries", "chunks"];

/// Kind of tag a reference was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Stylesheet,
    Script,
}

impl ResourceKind {
    pub fn tag_name(self) -> &'static str {
        match self {
            ResourceKind::Stylesheet => "link",
            ResourceKind::Script => "script",
        }
    }
}

/// One external resource referenced by a tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRef {
    /// Value of `href` or `src`, as written.
    pub path: String,
    pub kind: ResourceKind,
    /// Attributes in source order, names lowercased.
    pub attributes: Vec<(String, String)>,
    /// Byte range of the original tag (through `</script>` for scripts).
    pub span: Range<usize>,
}

impl ResourceRef {
    /// First value of the named attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        find_attribute(&self.attributes, name)
    }

    /// True for URLs that point outside the build output.
    pub fn is_external(&self) -> bool {
        is_external(&self.path)
    }

    pub fn file_name(&self) -> Option<&str> {
        file_name(&self.path)
    }
}

/// A byte range of the source and the text replacing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replacement {
    pub span: Range<usize>,
    pub text: String,
}

/// `http://`, `https://`, protocol-relative and `data:` URLs.
pub fn is_external(path: &str) -> bool {
    let lower = path.trim_start().to_ascii_lowercase();
    ["http://", "https://", "//", "data:"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Final path segment with any query string or fragment removed.
pub fn file_name(path: &str) -> Option<&str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end].rsplit('/').next().filter(|name| !name.is_empty())
}

/// True when `content` would close its own inline element early.
pub fn breaks_inline_element(kind: ResourceKind, content: &str) -> bool {
    let closing = match kind {
        ResourceKind::Stylesheet => "</style",
        ResourceKind::Script => "</script",
    };
    find_ignore_case(content.as_bytes(), 0, closing.as_bytes()).is_some()
}

/// Inline equivalent of a reference.
///
/// Stylesheets keep `media`; scripts keep `type`.
pub fn inline_tag(resource: &ResourceRef, content: &str) -> String {
    let (tag, kept) = match resource.kind {
        ResourceKind::Stylesheet => ("style", "media"),
        ResourceKind::Script => ("script", "type"),
    };

    match resource.attribute(kept) {
        Some(value) => format!(
            "<{tag} {kept}=\"{}\">{content}</{tag}>",
            value.replace('"', "&quot;")
        ),
        None => format!("<{tag}>{content}</{tag}>"),
    }
}

/// Find every qualifying reference in document order.
pub fn scan(html: &str, include_scripts: bool) -> Vec<ResourceRef> {
    let bytes = html.as_bytes();
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'<') {
        let start = pos + offset;
        let rest = &bytes[start..];

        if rest.starts_with(b"<!--") {
            pos = match find_ignore_case(bytes, start + 4, b"-->") {
                Some(end) => end + 3,
                None => break,
            };
            continue;
        }

        match rest.get(1) {
            Some(b) if b.is_ascii_alphabetic() => {}
            Some(b'/' | b'!' | b'?') => {
                pos = match skip_to_tag_end(bytes, start + 1) {
                    Some(end) => end,
                    None => break,
                };
                continue;
            }
            _ => {
                pos = start + 1;
                continue;
            }
        }

        let Some(tag) = parse_tag(html, start) else {
            break;
        };

        match tag.name.as_str() {
            "link" => {
                if let Some(href) = stylesheet_href(&tag.attributes) {
                    found.push(ResourceRef {
                        path: href.to_string(),
                        kind: ResourceKind::Stylesheet,
                        attributes: tag.attributes,
                        span: start..tag.end,
                    });
                }
                pos = tag.end;
            }
            "script" | "style" => {
                let closing: &[u8] = if tag.name == "script" {
                    b"</script"
                } else {
                    b"</style"
                };
                let element_end = find_ignore_case(bytes, tag.end, closing)
                    .and_then(|close| skip_to_tag_end(bytes, close + 1));

                if tag.name == "script" && include_scripts {
                    let src = find_attribute(&tag.attributes, "src").filter(|s| !s.is_empty());
                    if let (Some(src), Some(end)) = (src, element_end) {
                        found.push(ResourceRef {
                            path: src.to_string(),
                            kind: ResourceKind::Script,
                            attributes: tag.attributes.clone(),
                            span: start..end,
                        });
                    }
                }

                match element_end {
                    Some(end) => pos = end,
                    None => break,
                }
            }
            _ => pos = tag.end,
        }
    }

    found
}

/// Apply replacements in span order, building the output once.
///
/// Overlapping replacements after the first are ignored.
pub fn substitute(html: &str, mut replacements: Vec<Replacement>) -> String {
    replacements.sort_by_key(|r| r.span.start);

    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    for replacement in replacements {
        if replacement.span.start < cursor || replacement.span.end > html.len() {
            continue;
        }
        out.push_str(&html[cursor..replacement.span.start]);
        out.push_str(&replacement.text);
        cursor = replacement.span.end;
    }
    out.push_str(&html[cursor..]);
    out
}

struct Tag {
    name: String,
    attributes: Vec<(String, String)>,
    /// Index just past the closing `>`.
    end: usize,
}

fn find_attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn stylesheet_href(attributes: &[(String, String)]) -> Option<&str> {
    let is_stylesheet = find_attribute(attributes, "rel")
        .map(|rel| {
            rel.split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("stylesheet"))
        })
        .unwrap_or(false);

    if !is_stylesheet {
        return None;
    }
    find_attribute(attributes, "href").filter(|href| !href.is_empty())
}

/// Parse the start tag beginning at `start` (which holds `<`).
///
/// Returns `None` when the tag is never closed.
fn parse_tag(html: &str, start: usize) -> Option<Tag> {
    let bytes = html.as_bytes();
    let mut pos = start + 1;

    let name_start = pos;
    while pos < bytes.len() && !is_name_end(bytes[pos]) {
        pos += 1;
    }
    let name = html[name_start..pos].to_ascii_lowercase();

    let mut attributes = Vec::new();
    loop {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'/') {
            pos += 1;
        }
        match bytes.get(pos) {
            None => return None,
            Some(b'>') => {
                return Some(Tag {
                    name,
                    attributes,
                    end: pos + 1,
                })
            }
            Some(_) => {}
        }

        let attr_start = pos;
        while pos < bytes.len() && !is_name_end(bytes[pos]) && bytes[pos] != b'=' {
            pos += 1;
        }
        if pos == attr_start {
            // Stray '=' with no name
            pos += 1;
            continue;
        }
        let attr_name = html[attr_start..pos].to_ascii_lowercase();

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let mut value = String::new();
        if bytes.get(pos) == Some(&b'=') {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            match bytes.get(pos) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let value_start = pos + 1;
                    let len = bytes[value_start..].iter().position(|&b| b == quote)?;
                    value = html[value_start..value_start + len].to_string();
                    pos = value_start + len + 1;
                }
                Some(_) => {
                    let value_start = pos;
                    while pos < bytes.len()
                        && !bytes[pos].is_ascii_whitespace()
                        && bytes[pos] != b'>'
                    {
                        pos += 1;
                    }
                    value = html[value_start..pos].to_string();
                }
                None => return None,
            }
        }

        attributes.push((attr_name, value));
    }
}

fn is_name_end(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'>' || b == b'/'
}

/// Index just past the next `>` at or after `from`, honouring quotes.
fn skip_to_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote = None;
    for (offset, &b) in bytes.get(from..)?.iter().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(from + offset + 1),
            (None, _) => {}
        }
    }
    None
}

fn find_ignore_case(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|offset| from + offset)
}
