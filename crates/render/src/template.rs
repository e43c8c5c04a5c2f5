//! HTML shell template.

use tera::{Context, Tera};

use crate::error::{RenderError, Result};
use crate::fs::BuildFs;

const TEMPLATE_NAME: &str = "template.html";

/// The compiled `server/template.html`, exposing `head` and `body`.
pub struct HtmlTemplate {
    tera: Tera,
}

impl HtmlTemplate {
    /// Read and compile `template.html` from the server build output.
    pub fn load(server_fs: &dyn BuildFs) -> Result<Self> {
        let source = server_fs
            .read_to_string(TEMPLATE_NAME)
            .map_err(|e| RenderError::Io {
                path: format!("server/{TEMPLATE_NAME}"),
                reason: e.to_string(),
            })?;
        Self::parse(&source)
    }

    /// Compile a template source. Fragments are inserted unescaped.
    pub fn parse(source: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(TEMPLATE_NAME, &normalize_placeholders(source))
            .map_err(|e| RenderError::Template(describe(&e)))?;
        Ok(Self { tera })
    }

    pub fn render(&self, head: &str, body: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("head", head);
        context.insert("body", body);

        self.tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| RenderError::Template(describe(&e)))
    }
}

/// Rewrite Go-style `{{.Head}}` / `{{.Body}}` placeholders.
pub fn normalize_placeholders(source: &str) -> String {
    source
        .replace("{{.Head}}", "{{ head }}")
        .replace("{{ .Head }}", "{{ head }}")
        .replace("{{.Body}}", "{{ body }}")
        .replace("{{ .Body }}", "{{ body }}")
}

/// Tera keeps the useful part of a failure in its source chain.
fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
