//! Drives the axum router end to end with an in-memory directory.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use credgate::{
    build_app, clock::SystemClock, AppConfig, AppState, AuthConfig, HashConfig, JwtConfig,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

fn app() -> Router {
    let config = AppConfig {
        database_url: "postgres://unused".into(),
        jwt: JwtConfig {
            secret: "http-test-secret".into(),
            issuer: "credgate".into(),
            ttl_minutes: 5,
        },
        hash: HashConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        auth: AuthConfig {
            timeout: Duration::from_secs(10),
            create_attempts: 3,
            backoff_unit: Duration::from_millis(1),
        },
    };
    let state = AppState::in_memory(config, Arc::new(SystemClock)).expect("state");
    build_app(state)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn ann() -> Value {
    json!({ "name": "Ann", "email": "ann@x.com", "password": "longenough1" })
}

#[tokio::test]
async fn health_returns_ok() {
    let app = app();
    let req = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn register_returns_public_view() {
    let app = app();
    let (status, body) = send(&app, post_json("/api/v1/auth/register", ann())).await;
    assert_eq!(status, StatusCode::CREATED);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["email"], "ann@x.com");
    assert_eq!(json["name"], "Ann");
    assert!(json["id"].is_string());
    assert!(json.get("password_hash").is_none());
    assert!(!body.contains("argon2"));

    let (status, _) = send(&app, post_json("/api/v1/auth/register", ann())).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_rejects_invalid_input() {
    let app = app();
    let short = json!({ "name": "Ann", "email": "ann@x.com", "password": "short" });
    let (status, _) = send(&app, post_json("/api/v1/auth/register", short)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_email = json!({ "name": "Ann", "email": "ann", "password": "longenough1" });
    let (status, _) = send(&app, post_json("/api/v1/auth/register", bad_email)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_then_me() {
    let app = app();
    send(&app, post_json("/api/v1/auth/register", ann())).await;

    let creds = json!({ "email": "ann@x.com", "password": "longenough1" });
    let (status, body) = send(&app, post_json("/api/v1/auth/login", creds)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    let token = json["token"].as_str().expect("token").to_string();
    assert_eq!(json["user"]["email"], "ann@x.com");
    assert!(!body.contains("argon2"));

    let req = Request::builder()
        .uri("/api/v1/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let me: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(me["id"], json["user"]["id"]);
}

#[tokio::test]
async fn me_requires_valid_bearer_token() {
    let app = app();
    let missing = Request::builder()
        .uri("/api/v1/me")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, missing).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = Request::builder()
        .uri("/api/v1/me")
        .header(header::AUTHORIZATION, "Bearer not.a.token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn failed_logins_look_identical() {
    let app = app();
    send(&app, post_json("/api/v1/auth/register", ann())).await;

    let unknown = json!({ "email": "nobody@x.com", "password": "longenough1" });
    let wrong = json!({ "email": "ann@x.com", "password": "wrong-password" });
    let (s1, b1) = send(&app, post_json("/api/v1/auth/login", unknown)).await;
    let (s2, b2) = send(&app, post_json("/api/v1/auth/login", wrong)).await;

    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1, b2);
}
