//! The assembled HTTP surface: health, login and forwarding.

use crate::audit::MemoryAuditSink;
use crate::gateway::Gateway;
use crate::handlers::{ApiHandlers, UpstreamProxy};
use crate::router::{create_router, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use billgate_core::audit::AuthStatus;
use billgate_core::auth::{JwtAuthority, TokenVerifier};
use billgate_core::config::{AuthConfig, GatewayConfig, UpstreamConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

struct App {
    router: Router,
    sink: Arc<MemoryAuditSink>,
    authority: Arc<JwtAuthority>,
}

/// Router whose upstream refuses connections.
async fn app() -> App {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_upstream = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let authority = Arc::new(
        JwtAuthority::new(&AuthConfig {
            jwt_secret: "router-test-secret".to_string(),
            token_ttl_seconds: 3600,
        })
        .unwrap(),
    );
    let sink = Arc::new(MemoryAuditSink::new(100));
    let gateway = Arc::new(Gateway::new(
        GatewayConfig::default(),
        authority.clone(),
        sink.clone(),
    ));
    let state = AppState {
        handlers: Arc::new(ApiHandlers::new(authority.clone())),
        upstream: Arc::new(
            UpstreamProxy::new(&UpstreamConfig {
                base_url: dead_upstream,
                timeout_seconds: 2,
            })
            .unwrap(),
        ),
    };

    App {
        router: create_router(state, gateway, Duration::from_secs(5)),
        sink,
        authority,
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn login(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn wait_for(sink: &MemoryAuditSink, n: usize) {
    for _ in 0..400 {
        if sink.len().await >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {} audit records", n);
}

#[tokio::test]
async fn test_health_bypasses_gateway() {
    let app = app().await;
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(app.sink.is_empty().await);
}

#[tokio::test]
async fn test_login_issues_usable_token() {
    let app = app().await;

    let (status, body) = send(&app.router, login(r#"{"username":"alice"}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let token = body["token"].as_str().unwrap();
    let claims = app.authority.verify(token).unwrap();
    assert_eq!(claims.username, "alice");

    wait_for(&app.sink, 1).await;
    let record = &app.sink.get_recent_records(1).await[0];
    assert_eq!(record.endpoint, "/api/v1/auth/login");
    assert_eq!(record.auth_status, AuthStatus::NoAuth);
}

#[tokio::test]
async fn test_login_requires_username() {
    let app = app().await;

    for body in ["{}", r#"{"username":""}"#, "not json"] {
        let (status, response) = send(&app.router, login(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Username is required");
    }
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let app = app().await;
    let (_, body) = send(&app.router, login(r#"{"username":"bob"}"#)).await;
    let token = body["token"].as_str().unwrap().to_string();
    wait_for(&app.sink, 1).await;

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/mobile/query-bill")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"subscriberNo":"555"}"#))
        .unwrap();

    let (status, body) = send(&app.router, req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Upstream unavailable");

    wait_for(&app.sink, 2).await;
    let record = &app.sink.get_recent_records(1).await[0];
    assert_eq!(record.status_code, 502);
    assert_eq!(record.auth_status, AuthStatus::Authenticated);
    assert_eq!(record.subscriber_no.as_deref(), Some("555"));
}
