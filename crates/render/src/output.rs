//! Buffered response written by the renderer.

/// Status, headers and body of one render, converted to an HTTP response by
/// the adapter.
///
/// The status is first-write-wins: once an error path has set it, later
/// writes from the render path are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderOutput {
    status: Option<u16>,
    headers: Vec<(String, String)>,
    body: String,
}

impl RenderOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status unless one was already written. Returns whether it took effect.
    pub fn write_status(&mut self, status: u16) -> bool {
        match self.status {
            Some(existing) => {
                if existing != status {
                    tracing::debug!(existing, ignored = status, "Status already written");
                }
                false
            }
            None => {
                self.status = Some(status);
                true
            }
        }
    }

    /// Written status, or 200.
    pub fn status(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    pub fn status_written(&self) -> bool {
        self.status.is_some()
    }

    /// Set a header, replacing any value under the same (case-insensitive) name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(header) => header.1 = value,
            None => self.headers.push((name.to_ascii_lowercase(), value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn write_body(&mut self, chunk: &str) {
        self.body.push_str(chunk);
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    pub fn into_parts(self) -> (u16, Vec<(String, String)>, String) {
        (self.status(), self.headers, self.body)
    }
}
