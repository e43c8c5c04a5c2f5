use std::sync::Arc;

use axum::{http::StatusCode, response::Response, routing::MethodRouter, Router};
use sveltide_render::Renderer;
use tower_http::trace::TraceLayer;

use crate::{
    context::RenderContext,
    handlers::{assets_router, health_router},
    layer::{attach, error_page, layout_with_props, page_with_props, RenderLayer},
    routes::{RouteSpec, RouteTable},
};

/// Create the application router for a route table.
///
/// Pages render inside the table-wide layouts, then their own. Unmatched
/// paths render the error page with 404. Assets and health endpoints sit
/// outside the render context.
pub fn create_app(renderer: Arc<Renderer>, table: &RouteTable) -> Router {
    let attach = attach(Arc::clone(&renderer));
    create_app_with(renderer, table, attach)
}

/// Like [`create_app`] with a preconfigured attach layer.
pub fn create_app_with(renderer: Arc<Renderer>, table: &RouteTable, attach: RenderLayer) -> Router {
    let mut pages = Router::new();
    for route in &table.routes {
        pages = pages.route(&route.path, route_handler(route));
    }
    pages = pages.fallback(not_found);

    // Router::layer wraps outside-in, so the attach layer goes on last.
    for layout in table.layouts.iter().rev() {
        pages = pages.layer(layout_with_props(layout.component.clone(), layout.props.clone()));
    }
    if let Some(component) = &table.error_page {
        pages = pages.layer(error_page(component.clone()));
    }
    let pages = pages.layer(attach);

    tracing::info!(
        routes = table.routes.len(),
        layouts = table.layouts.len(),
        assets = %renderer.asset_prefix(),
        "Route table mounted"
    );

    pages
        .merge(assets_router(Arc::clone(&renderer)))
        .merge(health_router(renderer))
        .layer(TraceLayer::new_for_http())
}

fn route_handler(route: &RouteSpec) -> MethodRouter {
    let mut handler = page_with_props(route.page.clone(), route.props.clone());
    for layout in route.layouts.iter().rev() {
        handler = handler.layer(layout_with_props(layout.component.clone(), layout.props.clone()));
    }
    if let Some(component) = &route.error_page {
        handler = handler.layer(error_page(component.clone()));
    }
    handler
}

async fn not_found(ctx: RenderContext) -> Response {
    ctx.render_error("Not found", StatusCode::NOT_FOUND).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use http_body_util::BodyExt;
    use sveltide_render::{
        testing::{self, EchoEngine},
        RendererConfig, NAVIGATION_HEADER,
    };
    use tower::ServiceExt;

    use crate::context::RenderErrorReport;

    fn table() -> RouteTable {
        RouteTable::from_json(
            r#"{
                "errorPage": "error/main",
                "layouts": [{ "component": "layout/shell" }],
                "routes": [
                    { "path": "/", "page": "page/home", "props": { "title": "Hi" } },
                    { "path": "/x", "page": "page/x" },
                    {
                        "path": "/p",
                        "page": "page/p",
                        "layouts": [
                            { "component": "layout/l0" },
                            { "component": "layout/l1" },
                            { "component": "layout/bad" }
                        ]
                    },
                    { "path": "/gone", "page": "page/gone" }
                ]
            }"#,
        )
        .unwrap()
    }

    fn app_for(engine: EchoEngine) -> Router {
        create_app(Arc::new(testing::renderer(engine)), &table())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::HOST, "example.com")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_page_renders_inside_layouts() {
        let response = app_for(EchoEngine::default())
            .oneshot(get_request("/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(response.headers().get(header::VARY).unwrap(), NAVIGATION_HEADER);

        let html = body_string(response).await;
        assert!(html.contains(r#"<shell-root><home-root data-title="Hi"></home-root></shell-root>"#));
        // Stylesheets are inlined in entry order
        let shell = html.find("<style>.shell{display:grid}</style>").unwrap();
        let home = html.find("<style>.home{color:red}</style>").unwrap();
        assert!(shell < home);
        assert!(!html.contains("<link"));
    }

    #[tokio::test]
    async fn test_error_truncates_at_offending_layout() {
        let engine = EchoEngine::default().throwing("layout/bad", "boom");
        let response = app_for(engine).oneshot(get_request("/p")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body_string(response).await;
        assert!(html.contains(
            r#"<shell-root><l0-root><l1-root><main-root data-message="boom" data-status="500"></main-root></l1-root></l0-root></shell-root>"#
        ));
        assert!(!html.contains("bad-root"));
        assert!(!html.contains("p-root"));
        assert!(html.contains("<style>.error{color:crimson}</style>"));
    }

    #[tokio::test]
    async fn test_unknown_page_renders_error_page() {
        let response = app_for(EchoEngine::default())
            .oneshot(get_request("/gone"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body_string(response).await;
        assert!(html.contains(
            r#"<shell-root><main-root data-message="&quot;page/gone&quot; is not a component" data-status="500">"#
        ));
        assert!(html.starts_with("<!doctype html>"));
    }

    #[tokio::test]
    async fn test_unmatched_path_is_not_found() {
        let response = app_for(EchoEngine::default())
            .oneshot(get_request("/nowhere"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let html = body_string(response).await;
        assert!(html.contains(
            r#"<shell-root><main-root data-message="Not found" data-status="404"></main-root></shell-root>"#
        ));
    }

    #[tokio::test]
    async fn test_failing_error_page_falls_back_to_text() {
        let engine = EchoEngine::default()
            .throwing("page/x", "first")
            .throwing("error/main", "second");
        let response = app_for(engine).oneshot(get_request("/x")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(response).await, "Render failed");
    }

    #[tokio::test]
    async fn test_missing_error_page_falls_back_to_text() {
        let mut table = table();
        table.error_page = Some("error/nope".to_string());
        let engine = EchoEngine::default().throwing("page/x", "first");
        let app = create_app(Arc::new(testing::renderer(engine)), &table);

        let response = app.oneshot(get_request("/x")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(response).await, "Render failed");
    }

    #[tokio::test]
    async fn test_soft_error_keeps_markup() {
        let engine = EchoEngine::default().soft_error("page/x");
        let response = app_for(engine).oneshot(get_request("/x")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = body_string(response).await;
        assert!(html.contains("<shell-root><x-root></x-root></shell-root>"));
    }

    #[tokio::test]
    async fn test_template_failure_falls_back_to_text() {
        let fs = testing::build_fs().with_file(
            "server/template.html",
            "<html><head>{{.Head}}</head><body>{{.Body}}{{ missing }}</body></html>",
        );
        let renderer = testing::renderer_with(fs, EchoEngine::default(), testing::config());
        let app = create_app(Arc::new(renderer), &table());

        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(response).await, "Render failed");
    }

    #[tokio::test]
    async fn test_navigation_request_answers_json() {
        let request = Request::builder()
            .uri("/")
            .header(NAVIGATION_HEADER, "1")
            .body(Body::empty())
            .unwrap();

        let response = app_for(EchoEngine::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(response.headers().get(header::VARY).unwrap(), NAVIGATION_HEADER);

        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["entries"][0]["file"], "/app_/entries/shell.js");
        assert_eq!(json["entries"][1]["file"], "/app_/entries/home.js");
        assert_eq!(json["entries"][1]["props"]["title"], "Hi");
        assert_eq!(json["entries"][1]["css"][0], "/app_/assets/home.css");
        assert_eq!(json["errPage"]["file"], "/app_/entries/main-error.js");
    }

    #[tokio::test]
    async fn test_assets_and_health_are_mounted() {
        let app = app_for(EchoEngine::default());

        let response = app.clone().oneshot(get_request("/app_/assets/home.css")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, ".home{color:red}");

        let response = app.oneshot(get_request("/livez")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_hook_sees_each_failure() {
        let reports: Arc<Mutex<Vec<RenderErrorReport>>> = Arc::default();
        let sink = Arc::clone(&reports);

        let renderer = Arc::new(testing::renderer(
            EchoEngine::default().throwing("layout/bad", "boom"),
        ));
        let attach = attach(Arc::clone(&renderer))
            .on_render_error(move |report| sink.lock().unwrap().push(report.clone()));
        let app = create_app_with(renderer, &table(), attach);

        let response = app.oneshot(get_request("/p")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].url, "http://example.com/p");
        assert_eq!(
            reports[0].entries,
            vec!["layout/shell", "layout/l0", "layout/l1", "layout/bad", "page/p"]
        );
        assert_eq!(reports[0].index, Some(3));
    }

    #[tokio::test]
    async fn test_overloaded_pool_answers_503() {
        let config = RendererConfig::new(1, 1, None, "test".to_string()).unwrap();
        let engine = EchoEngine::default().with_delay(Duration::from_millis(300));
        let renderer = testing::renderer_with(testing::build_fs(), engine, config);
        let app = create_app(Arc::new(renderer), &table());

        // One request in flight, one queued
        let first = tokio::spawn(app.clone().oneshot(get_request("/")));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = tokio::spawn(app.clone().oneshot(get_request("/")));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "5");
        assert_eq!(body_string(response).await, "Service busy, retry after 5s");

        assert_eq!(first.await.unwrap().unwrap().status(), StatusCode::OK);
        assert_eq!(second.await.unwrap().unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_route_error_page_overrides_table() {
        let mut table = table();
        table.routes[1].error_page = Some(sveltide_render::DEFAULT_ERROR_PAGE.to_string());
        let engine = EchoEngine::default().throwing("page/x", "nope");
        let app = create_app(Arc::new(testing::renderer(engine)), &table);

        let html = body_string(app.oneshot(get_request("/x")).await.unwrap()).await;
        assert!(html.contains(r#"<$$$SVELTIDE_DEFAULT_ERROR$$$-root data-message="nope" data-status="500">"#));
        assert!(!html.contains("main-root"));
    }
}
