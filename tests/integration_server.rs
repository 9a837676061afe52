//! End-to-end account lifecycle against the in-process router.
//!
//! The router is wired with the in-memory user and session stores, so the
//! suite exercises routing, the session middleware and the gate exactly as
//! they run in production without external services.

#![allow(clippy::unwrap_used)]

use accountd::{
    api,
    auth::{AuthService, CredentialHasher, PasswordConfig},
    session::{MemorySessionStore, SessionConfig, SessionManager, SESSION_COOKIE_NAME},
    store::MemoryUserStore,
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestContext {
    app: Router,
    sessions: Arc<MemorySessionStore>,
}

impl TestContext {
    fn new() -> Self {
        let hasher = CredentialHasher::new(&PasswordConfig {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        })
        .unwrap();
        let auth = Arc::new(AuthService::new(Arc::new(MemoryUserStore::new()), hasher));
        let sessions = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(sessions.clone(), SessionConfig::default());

        Self {
            app: api::router(auth, manager),
            sessions,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<String>,
        cookie: Option<&str>,
    ) -> (StatusCode, Option<String>, Value) {
        let mut request = axum::http::Request::builder().method(method).uri(uri);
        if body.is_some() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = request
            .body(body.map_or_else(Body::empty, Body::from))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, cookie, json)
    }

    async fn post_json(
        &self,
        uri: &str,
        body: &Value,
        cookie: Option<&str>,
    ) -> (StatusCode, Option<String>, Value) {
        self.send(Method::POST, uri, Some(body.to_string()), cookie)
            .await
    }
}

fn alice_signup() -> Value {
    json!({"username": "alice", "email": "alice@example.com", "password": "secret123"})
}

fn alice_signin() -> Value {
    json!({"email": "alice@example.com", "password": "secret123"})
}

#[tokio::test]
async fn account_lifecycle() {
    let ctx = TestContext::new();

    let (status, _, body) = ctx.post_json("/signup", &alice_signup(), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "user created");

    let duplicate = json!({"username": "bob", "email": "alice@example.com", "password": "other456"});
    let (status, _, body) = ctx.post_json("/signup", &duplicate, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["type"], "conflict");

    let (status, cookie, body) = ctx.post_json("/signin", &alice_signin(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "signed in");
    let cookie = cookie.expect("signin sets a session cookie");
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE_NAME}=")));

    let (status, _, body) = ctx
        .send(Method::GET, "/protected", None, Some(&cookie))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "protected route accessed");
    assert!(!body["user_id"].as_str().unwrap().is_empty());

    let (status, logout_cookie, body) = ctx
        .send(Method::POST, "/logout", None, Some(&cookie))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "logged out");
    let logout_cookie = logout_cookie.expect("logout renews the session cookie");
    assert_ne!(logout_cookie, cookie);

    let (status, _, body) = ctx
        .send(Method::GET, "/protected", None, Some(&cookie))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["type"], "unauthorized");

    let (status, _, _) = ctx
        .send(Method::GET, "/protected", None, Some(&logout_cookie))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signin_rotates_a_pre_login_token() {
    let ctx = TestContext::new();
    ctx.post_json("/signup", &alice_signup(), None).await;

    let (_, first, _) = ctx.post_json("/signin", &alice_signin(), None).await;
    let first = first.unwrap();

    let (status, second, _) = ctx
        .post_json("/signin", &alice_signin(), Some(&first))
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = second.unwrap();
    assert_ne!(first, second);
    assert_eq!(ctx.sessions.len().await, 1);

    let (status, _, _) = ctx.send(Method::GET, "/protected", None, Some(&first)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = ctx
        .send(Method::GET, "/protected", None, Some(&second))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signin_failures_map_to_status_codes() {
    let ctx = TestContext::new();
    ctx.post_json("/signup", &alice_signup(), None).await;

    let wrong_password = json!({"email": "alice@example.com", "password": "wrong123"});
    let (status, cookie, body) = ctx.post_json("/signin", &wrong_password, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["type"], "unauthorized");
    assert!(cookie.is_none());

    let unknown = json!({"email": "nobody@example.com", "password": "secret123"});
    let (status, _, body) = ctx.post_json("/signin", &unknown, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["type"], "not_found");

    let too_long = json!({"email": "alice@example.com", "password": "a".repeat(21)});
    let (status, _, body) = ctx.post_json("/signin", &too_long, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "password must be at most 20 characters");

    assert!(ctx.sessions.is_empty().await);
}

#[tokio::test]
async fn signin_normalizes_email() {
    let ctx = TestContext::new();
    ctx.post_json("/signup", &alice_signup(), None).await;

    let shouting = json!({"email": "  ALICE@Example.com ", "password": "secret123"});
    let (status, cookie, _) = ctx.post_json("/signin", &shouting, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cookie.is_some());
}

#[tokio::test]
async fn signup_validation_errors() {
    let ctx = TestContext::new();

    let cases = [
        (
            json!({"username": "al", "email": "al@example.com", "password": "secret123"}),
            "username must be at least 3 characters",
        ),
        (
            json!({"username": "alice", "email": "not-an-email", "password": "secret123"}),
            "invalid email format",
        ),
        (
            json!({"username": "alice", "email": "alice@example.com", "password": "short"}),
            "password must be at least 6 characters",
        ),
    ];

    for (payload, message) in cases {
        let (status, _, body) = ctx.post_json("/signup", &payload, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body["type"], "bad_request");
        assert_eq!(body["message"], message);
    }
}

#[tokio::test]
async fn malformed_and_mistyped_bodies() {
    let ctx = TestContext::new();

    let (status, _, body) = ctx
        .send(Method::POST, "/signup", Some("{not json".to_string()), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "bad_request");

    let (status, _, body) = ctx
        .post_json("/signup", &json!({"username": 42}), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["type"], "unprocessable_entity");
}

#[tokio::test]
async fn responses_never_leak_password_hashes() {
    let ctx = TestContext::new();
    let (_, _, body) = ctx.post_json("/signup", &alice_signup(), None).await;
    assert!(!body.to_string().contains("argon2"));

    let (_, _, body) = ctx.post_json("/signup", &alice_signup(), None).await;
    assert!(!body.to_string().contains("argon2"));
}
