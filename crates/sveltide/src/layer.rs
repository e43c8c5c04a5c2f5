//! Tower layers that build the render context as a request passes through.
//!
//! Outer layers run first:
//!
//! ```ignore
//! Router::new()
//!     .route("/", page("page/home"))
//!     .layer(
//!         ServiceBuilder::new()
//!             .layer(attach(renderer))
//!             .layer(error_page("error/main"))
//!             .layer(layout("layout/shell")),
//!     );
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    http::Request,
    routing::{get, MethodRouter},
};
use sveltide_render::{ContextData, Entry, Props, Renderer};
use tower::{Layer, Service};

use crate::context::{
    context_of, is_navigation, log_render_error, request_url, RenderContext, RenderErrorHook,
    RenderErrorReport,
};

#[derive(Clone)]
enum Op {
    Attach {
        renderer: Arc<Renderer>,
        on_error: RenderErrorHook,
    },
    AddLayout(Entry),
    SetError(String),
}

/// Layer created by [`attach`], [`layout`], [`layout_with_props`] or [`error_page`].
#[derive(Clone)]
pub struct RenderLayer {
    op: Op,
}

impl RenderLayer {
    /// Replace the render-error hook. Only meaningful on [`attach`].
    pub fn on_render_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RenderErrorReport) + Send + Sync + 'static,
    {
        if let Op::Attach { on_error, .. } = &mut self.op {
            *on_error = Arc::new(hook);
        }
        self
    }
}

/// Attach a fresh [`RenderContext`] to every request.
pub fn attach(renderer: Arc<Renderer>) -> RenderLayer {
    RenderLayer {
        op: Op::Attach {
            renderer,
            on_error: log_render_error(),
        },
    }
}

/// Append a prop-less layout.
pub fn layout(component: impl Into<String>) -> RenderLayer {
    layout_with_props(component, Props::new())
}

pub fn layout_with_props(component: impl Into<String>, props: Props) -> RenderLayer {
    RenderLayer {
        op: Op::AddLayout(Entry::new(component, Some(props))),
    }
}

/// Set the error page for everything behind this layer.
pub fn error_page(component: impl Into<String>) -> RenderLayer {
    RenderLayer {
        op: Op::SetError(component.into()),
    }
}

/// GET handler rendering `component` as the page.
pub fn page<S>(component: impl Into<String>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    page_with_props(component, Props::new())
}

pub fn page_with_props<S>(component: impl Into<String>, props: Props) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let component = component.into();
    get(move |ctx: RenderContext| {
        let component = component.clone();
        let props = props.clone();
        async move { ctx.render_page(component, Some(props)).await }
    })
}

impl<S> Layer<S> for RenderLayer {
    type Service = RenderService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RenderService {
            inner,
            op: self.op.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RenderService<S> {
    inner: S,
    op: Op,
}

impl<S, B> Service<Request<B>> for RenderService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        match &self.op {
            Op::Attach { renderer, on_error } => {
                let context_data = ContextData {
                    url: request_url(req.uri(), req.headers()),
                };
                let ctx = RenderContext::new(
                    Arc::clone(renderer),
                    context_data,
                    is_navigation(req.headers()),
                    Arc::clone(on_error),
                );
                req.extensions_mut().insert(ctx);
            }
            Op::AddLayout(entry) => context_of(req.extensions()).push(entry.clone()),
            Op::SetError(component) => context_of(req.extensions()).set_error(component.as_str()),
        }

        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::StatusCode,
        response::Response,
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use sveltide_render::testing::{self, EchoEngine};
    use tower::{ServiceBuilder, ServiceExt};

    fn renderer() -> Arc<Renderer> {
        Arc::new(testing::renderer(EchoEngine::default()))
    }

    async fn send(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_service_builder_nests_in_order() {
        let app = Router::new().route("/", page("page/p")).layer(
            ServiceBuilder::new()
                .layer(attach(renderer()))
                .layer(layout("layout/l0"))
                .layer(layout("layout/l1")),
        );

        let (status, html) = send(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<l0-root><l1-root><p-root></p-root></l1-root></l0-root>"));
    }

    #[tokio::test]
    async fn test_layout_props_reach_the_component() {
        let mut props = Props::new();
        props.insert("theme".to_string(), "dark".into());

        let app = Router::new()
            .route("/", page("page/p"))
            .layer(layout_with_props("layout/shell", props))
            .layer(attach(renderer()));

        let (_, html) = send(app, "/").await;
        assert!(html.contains(r#"<shell-root data-theme="dark"><p-root></p-root></shell-root>"#));
    }

    #[tokio::test]
    async fn test_render_error_from_handler() {
        let app = Router::new()
            .route(
                "/secret",
                get(|ctx: RenderContext| async move {
                    ctx.render_error("boom", StatusCode::UNAUTHORIZED).await
                }),
            )
            .layer(
                ServiceBuilder::new()
                    .layer(attach(renderer()))
                    .layer(error_page("error/main"))
                    .layer(layout("layout/shell")),
            );

        let (status, html) = send(app, "/secret").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(html.contains(
            r#"<shell-root><main-root data-message="boom" data-status="401"></main-root></shell-root>"#
        ));
    }

    #[tokio::test]
    async fn test_render_accumulated_layouts_only() {
        let app = Router::new()
            .route(
                "/",
                get(|ctx: RenderContext| async move {
                    ctx.add_layout("layout/l1", None);
                    ctx.render().await
                }),
            )
            .layer(layout("layout/l0"))
            .layer(attach(renderer()));

        let (status, html) = send(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<l0-root><l1-root></l1-root></l0-root>"));
    }

    #[tokio::test]
    async fn test_inner_error_page_wins() {
        let engine = EchoEngine::default().throwing("page/p", "nope");
        let app = Router::new()
            .route("/", page("page/p").layer(error_page("error/main")))
            .layer(error_page(sveltide_render::DEFAULT_ERROR_PAGE))
            .layer(attach(Arc::new(testing::renderer(engine))));

        let (status, html) = send(app, "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(html.contains(r#"<main-root data-message="nope" data-status="500">"#));
    }

    #[tokio::test]
    #[should_panic(expected = "render context not registered")]
    async fn test_layout_without_attach_panics() {
        let app: Router = Router::new()
            .route("/", get(|| async { Response::new(Body::empty()) }))
            .layer(layout("layout/shell"));

        let _ = send(app, "/").await;
    }
}
