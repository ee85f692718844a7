// Router assembly
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    clear_selection, export, get_dashboard, health_check, refresh, select_all, set_auto_refresh, set_label,
    set_sidebar, set_source, set_window, toggle_device, upload,
};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/refresh", post(refresh))
        .route("/source", put(set_source))
        .route("/auto-refresh", put(set_auto_refresh))
        .route("/sidebar", put(set_sidebar))
        .route("/window", put(set_window))
        .route("/selection", delete(clear_selection))
        .route("/selection/all", post(select_all))
        .route("/selection/:id/toggle", post(toggle_device))
        .route("/devices/:id/label", put(set_label))
        .route("/upload", post(upload))
        .route("/export", get(export))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_service::DashboardService;
    use crate::application::preference_store::MemoryStore;
    use crate::application::transport::{Transport, TransportFailure, TransportResolver, TransportStrategy};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const CSV: &str = "시간,TR1,TR2\n2023-06-01 10:00,55,61\n2024-01-01 00:00,58,\n";

    struct OfflineTransport;

    #[async_trait]
    impl Transport for OfflineTransport {
        async fn get_text(&self, _url: &str) -> Result<String, TransportFailure> {
            Err(TransportFailure::Network("offline".to_string()))
        }
    }

    fn make_router() -> Router {
        let resolver = TransportResolver::new(
            Arc::new(OfflineTransport),
            vec![
                TransportStrategy::Direct,
                TransportStrategy::Proxy {
                    name: "corsproxy.io".to_string(),
                    endpoint: "https://corsproxy.io/?".to_string(),
                },
            ],
        );
        let dashboard_service = DashboardService::new(
            resolver,
            Arc::new(MemoryStore::new()),
            "https://example.com/a.csv".to_string(),
            60.0,
        );
        build_router(Arc::new(AppState { dashboard_service }))
    }

    async fn call(router: &Router, req: Request<Body>) -> (StatusCode, bytes::Bytes) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, body)
    }

    fn request(method: &str, uri: &str, body: Body) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(body).unwrap()
    }

    fn json_request(method: &str, uri: &str, value: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap()
    }

    fn parse_json(b: bytes::Bytes) -> serde_json::Value {
        serde_json::from_slice(&b).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let router = make_router();
        let (status, body) = call(&router, request("GET", "/healthz", Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_refresh_reports_unavailable() {
        let router = make_router();
        let (status, body) = call(&router, request("POST", "/refresh", Body::empty())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let json = parse_json(body);
        assert_eq!(json["error"], "could not load data");
        assert!(json["detail"].as_str().unwrap().contains("corsproxy.io"));

        let (_, body) = call(&router, request("GET", "/dashboard", Body::empty())).await;
        let json = parse_json(body);
        assert_eq!(json["error"], "unavailable");
        assert_eq!(json["error_message"], "could not load data");
        assert!(json["kpis"].is_null());
    }

    #[tokio::test]
    async fn test_upload_then_dashboard_and_export() {
        let router = make_router();
        let (status, body) = call(&router, request("POST", "/upload", Body::from(CSV))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse_json(body)["records"], 2);

        let (status, body) = call(&router, request("GET", "/dashboard", Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        let json = parse_json(body);
        assert_eq!(json["source"], "local");
        assert_eq!(json["auto_refresh"], false);
        assert_eq!(json["selected"], serde_json::json!(["TR1", "TR2"]));
        assert_eq!(json["devices"][0]["color"], "#F4A261");
        assert_eq!(json["kpis"]["max_device_id"], "TR1");
        assert_eq!(json["records"][1]["TR2"], serde_json::Value::Null);

        let window = serde_json::json!({ "start_year": 2023, "end_year": 2023 });
        let (status, _) = call(&router, json_request("PUT", "/window", window)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let resp = router
            .clone()
            .oneshot(request("GET", "/export", Body::empty()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"timestamp,TR1,TR2\n2023-06-01T10:00:00Z,55,61\n");
    }

    #[tokio::test]
    async fn test_empty_upload_is_unprocessable() {
        let router = make_router();
        let (status, body) = call(&router, request("POST", "/upload", Body::from("timestamp,TR1\n"))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(parse_json(body)["error"], "data is empty");
    }

    #[tokio::test]
    async fn test_selection_endpoints() {
        let router = make_router();
        call(&router, request("POST", "/upload", Body::from(CSV))).await;

        let (status, body) = call(&router, request("POST", "/selection/TR1/toggle", Body::empty())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse_json(body), serde_json::json!(["TR2"]));

        let (status, _) = call(&router, request("DELETE", "/selection", Body::empty())).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = call(&router, request("POST", "/selection/all", Body::empty())).await;
        assert_eq!(parse_json(body), serde_json::json!(["TR1", "TR2"]));

        let (status, _) = call(&router, request("POST", "/selection/TR9/toggle", Body::empty())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let label = serde_json::json!({ "name": "Substation A" });
        let (status, _) = call(&router, json_request("PUT", "/devices/TR2/label", label)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, body) = call(&router, request("GET", "/dashboard", Body::empty())).await;
        assert_eq!(parse_json(body)["devices"][1]["display_name"], "Substation A");
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let router = make_router();
        let window = serde_json::json!({ "start_month": 13 });
        let (status, _) = call(&router, json_request("PUT", "/window", window)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let source = serde_json::json!({ "url": "not a url" });
        let (status, body) = call(&router, json_request("PUT", "/source", source)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(parse_json(body)["error"], "invalid source url");
    }

    #[tokio::test]
    async fn test_preference_toggles() {
        let router = make_router();
        let (status, _) = call(&router, json_request("PUT", "/auto-refresh", serde_json::json!({ "enabled": true }))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&router, json_request("PUT", "/sidebar", serde_json::json!({ "open": false }))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = call(&router, request("GET", "/dashboard", Body::empty())).await;
        let json = parse_json(body);
        assert_eq!(json["auto_refresh"], true);
        assert_eq!(json["sidebar_open"], false);
    }
}
