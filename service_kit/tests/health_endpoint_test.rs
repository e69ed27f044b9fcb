use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use service_kit::{
    health_routes, logging, Checker, HealthService, HealthServiceConfig, MockClock, StubCheck,
};
use std::sync::Arc;
use tower::ServiceExt;

fn setup_test_app(checks: Vec<Arc<dyn Checker>>) -> Router {
    let service = HealthService::new(HealthServiceConfig {
        name: "test-service".to_string(),
        description: "Test Service".to_string(),
        version: "1.0.0".to_string(),
        commit: "abc123".to_string(),
        checks,
        clock: Some(Arc::new(MockClock::new(
            Utc.with_ymd_and_hms(2024, 6, 6, 13, 5, 10).unwrap(),
        ))),
        check_timeout: None,
    })
    .unwrap();

    health_routes(Arc::new(service))
}

async fn get_health(app: Router) -> (StatusCode, Option<String>, Value) {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, content_type, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_healthy_response() {
    let app = setup_test_app(vec![
        Arc::new(StubCheck::new("check:1", true)),
        Arc::new(StubCheck::new("check:2", true)),
    ]);

    let (status, content_type, body) = get_health(app).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(
        body,
        json!({
            "service": "test-service",
            "description": "Test Service",
            "version": "1.0.0",
            "commit": "abc123",
            "status": "pass",
            "checks": {
                "check:1": {"status": "pass"},
                "check:2": {"status": "pass"}
            },
            "timestamp": 1717679110
        })
    );
}

#[tokio::test]
async fn test_unhealthy_response() {
    let app = setup_test_app(vec![Arc::new(StubCheck::new("check:1", false))]);

    let (status, content_type, body) = get_health(app).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(
        body,
        json!({
            "service": "test-service",
            "description": "Test Service",
            "version": "1.0.0",
            "commit": "abc123",
            "status": "fail",
            "checks": {
                "check:1": {"status": "fail", "message": "Stub check failed"}
            },
            "timestamp": 1717679110
        })
    );
}

#[tokio::test]
async fn test_response_without_checks() {
    let app = setup_test_app(Vec::new());

    let (status, _, body) = get_health(app).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pass");
    assert!(body.get("checks").is_none());
}

#[tokio::test]
async fn test_traced_router_serves_health() {
    let app = logging::trace_http(setup_test_app(vec![Arc::new(StubCheck::new(
        "stub", true,
    ))]));

    let (status, _, body) = get_health(app).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["stub"]["status"], "pass");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = setup_test_app(Vec::new());

    let request = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
