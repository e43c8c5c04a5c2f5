//! Request-scoped render context.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use serde::Serialize;
use sveltide_render::{
    sanitize_error, ContextData, Entry, Props, RenderData, RenderError, RenderOutput, Renderer,
    DEFAULT_ERROR_PAGE,
};
use thiserror::Error;

/// Raised when a handler or layer runs without the attach layer in front of it.
#[derive(Error, Debug, Clone, Copy)]
#[error("render context not registered: mount `sveltide::attach` in front of layouts and pages")]
pub struct ContextNotRegistered;

/// Details passed to the render-error hook.
#[derive(Debug, Clone, Serialize)]
pub struct RenderErrorReport {
    pub url: String,
    /// Component ids of the render that failed.
    pub entries: Vec<String>,
    /// Offending entry, when the engine reported one.
    pub index: Option<usize>,
    pub error: String,
}

/// Called before every error-page render and before the plain-text fallback.
pub type RenderErrorHook = Arc<dyn Fn(&RenderErrorReport) + Send + Sync>;

/// Hook used when none is configured: log at error level.
pub fn log_render_error() -> RenderErrorHook {
    Arc::new(|report: &RenderErrorReport| {
        tracing::error!(
            url = %report.url,
            entries = ?report.entries,
            index = ?report.index,
            error = %report.error,
            "Render failed"
        );
    })
}

#[derive(Debug)]
struct State {
    entries: Vec<Entry>,
    error_page: String,
    consumed: bool,
}

struct Shared {
    renderer: Arc<Renderer>,
    on_error: RenderErrorHook,
    context_data: ContextData,
    navigation: bool,
    state: Mutex<State>,
}

/// Per-request accumulator of layout entries and the error page.
///
/// Cheap to clone; clones share the same entries. Stored in request
/// extensions by the attach layer and extracted by handlers.
#[derive(Clone)]
pub struct RenderContext {
    shared: Arc<Shared>,
}

impl RenderContext {
    pub fn new(
        renderer: Arc<Renderer>,
        context_data: ContextData,
        navigation: bool,
        on_error: RenderErrorHook,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                renderer,
                on_error,
                context_data,
                navigation,
                state: Mutex::new(State {
                    entries: Vec::new(),
                    error_page: DEFAULT_ERROR_PAGE.to_string(),
                    consumed: false,
                }),
            }),
        }
    }

    /// Append a layout wrapping everything added after it.
    pub fn add_layout(&self, component: impl Into<String>, props: Option<Props>) {
        self.push(Entry::new(component, props));
    }

    /// Replace the error page for this request.
    pub fn set_error(&self, component: impl Into<String>) {
        self.lock().error_page = component.into();
    }

    pub fn error_page(&self) -> String {
        self.lock().error_page.clone()
    }

    /// Snapshot of the accumulated entries.
    pub fn entries(&self) -> Vec<Entry> {
        self.lock().entries.clone()
    }

    pub fn context_data(&self) -> &ContextData {
        &self.shared.context_data
    }

    /// The request asked for the navigation JSON instead of HTML.
    pub fn is_navigation(&self) -> bool {
        self.shared.navigation
    }

    pub fn renderer(&self) -> &Arc<Renderer> {
        &self.shared.renderer
    }

    /// Append `component` as the page and render.
    pub async fn render_page(&self, component: impl Into<String>, props: Option<Props>) -> Response {
        self.push(Entry::new(component, props));
        self.render().await
    }

    /// Render the accumulated entries as they are.
    pub async fn render(&self) -> Response {
        let data = self.take_data();
        self.run(RenderOutput::new(), data).await
    }

    /// Render the error page with `{message, status}` and answer `status`.
    pub async fn render_error(&self, message: &str, status: StatusCode) -> Response {
        let mut out = RenderOutput::new();
        out.write_status(status.as_u16());

        let error_page = self.error_page();
        self.push(Entry::error(error_page, message, status.as_u16()));
        let data = self.take_data();

        match self.shared.renderer.render(&mut out, &data, self.shared.navigation).await {
            Ok(()) => into_response(out),
            Err(e) => {
                self.report(&data, &e);
                fallback(out, &e)
            }
        }
    }

    pub(crate) fn push(&self, entry: Entry) {
        let mut state = self.lock();
        if state.consumed {
            tracing::warn!(component = %entry.component, "Entry added after the context was rendered");
        }
        state.entries.push(entry);
    }

    /// First failure: truncate at the offending entry and render the error
    /// page once. Anything else ends in the plain-text fallback.
    async fn run(&self, mut out: RenderOutput, data: RenderData) -> Response {
        let renderer = &self.shared.renderer;

        let err = match renderer.render(&mut out, &data, self.shared.navigation).await {
            Ok(()) => return into_response(out),
            Err(e) => e,
        };
        self.report(&data, &err);

        if let RenderError::Overloaded { retry_after_secs } = err {
            return overloaded(out, &err, retry_after_secs);
        }

        let Some(index) = err.entry_index() else {
            return fallback(out, &err);
        };
        if !renderer.manifest().contains(&data.error_page) {
            return fallback(out, &err);
        }

        let status = if out.status_written() {
            out.status()
        } else {
            StatusCode::INTERNAL_SERVER_ERROR.as_u16()
        };
        out.write_status(status);

        let mut entries = data.entries;
        entries.truncate(index);
        entries.push(Entry::error(data.error_page.as_str(), &err.message(), status));
        let retry = RenderData::new(entries, data.error_page, data.context_data);

        match renderer.render(&mut out, &retry, self.shared.navigation).await {
            Ok(()) => into_response(out),
            Err(e) => {
                self.report(&retry, &e);
                fallback(out, &e)
            }
        }
    }

    fn take_data(&self) -> RenderData {
        let mut state = self.lock();
        if state.consumed {
            tracing::warn!("Render context rendered more than once");
        }
        state.consumed = true;

        RenderData::new(
            state.entries.clone(),
            state.error_page.clone(),
            self.shared.context_data.clone(),
        )
    }

    fn report(&self, data: &RenderData, error: &RenderError) {
        let report = RenderErrorReport {
            url: data.context_data.url.clone(),
            entries: data.components().into_iter().map(str::to_string).collect(),
            index: error.entry_index(),
            error: error.to_string(),
        };
        (self.shared.on_error)(&report);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Convert the buffered output into a response.
pub fn into_response(out: RenderOutput) -> Response {
    let (status, headers, body) = out.into_parts();

    let mut response = Response::new(Body::from(body));
    *response.status_mut() =
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in headers {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => tracing::debug!("Dropping invalid render header"),
        }
    }

    response
}

/// Plain-text last resort. Keeps a status already written, otherwise 500.
fn fallback(mut out: RenderOutput, error: &RenderError) -> Response {
    if !out.status_written() {
        out.write_status(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
    }
    out.set_header(header::CONTENT_TYPE.as_str(), "text/plain; charset=utf-8");
    out.clear_body();
    out.write_body(&sanitize_error(error));
    into_response(out)
}

fn overloaded(mut out: RenderOutput, error: &RenderError, retry_after_secs: u32) -> Response {
    out.write_status(StatusCode::SERVICE_UNAVAILABLE.as_u16());
    out.set_header(header::RETRY_AFTER.as_str(), retry_after_secs.to_string());
    fallback(out, error)
}
