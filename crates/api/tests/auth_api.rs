//! HTTP-level integration tests for login, logout and the auth filter.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, build_test_app, get, get_auth, post_auth, post_json, send};

/// Successful login returns 200 with a token and a formatted expiry.
#[tokio::test]
async fn test_login_success() {
    let t = build_test_app();
    t.create_user("alice", "secret").await;

    let body = serde_json::json!({ "login": "alice", "password": "secret" });
    let response = post_json(t.app(), "/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["token"].is_string(), "response must contain token");
    let expires_at = json["expires_at"].as_str().expect("expires_at string");
    assert!(
        chrono::NaiveDateTime::parse_from_str(expires_at, "%Y-%m-%d %H:%M:%S").is_ok(),
        "unexpected expires_at format: {expires_at}"
    );
}

/// Wrong password and unknown login are indistinguishable.
#[tokio::test]
async fn test_login_failures_share_one_message() {
    let t = build_test_app();
    t.create_user("alice", "secret").await;

    let wrong = post_json(
        t.app(),
        "/login",
        serde_json::json!({ "login": "alice", "password": "nope" }),
    )
    .await;
    let unknown = post_json(
        t.app(),
        "/login",
        serde_json::json!({ "login": "nobody", "password": "secret" }),
    )
    .await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong).await, body_json(unknown).await);
}

/// Missing fields are a 400, not a 401.
#[tokio::test]
async fn test_login_missing_fields() {
    let t = build_test_app();

    let response = post_json(t.app(), "/login", serde_json::json!({ "login": "alice" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");

    let response = post_json(t.app(), "/login", serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// A body that is not JSON at all is a 400.
#[tokio::test]
async fn test_login_malformed_body() {
    let t = build_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = send(t.app(), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Protected routes need a token.
#[tokio::test]
async fn test_storage_requires_token() {
    let t = build_test_app();

    let response = get(t.app(), "/storage/").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert!(json["error"].is_string());
}

/// A token that was never issued is rejected.
#[tokio::test]
async fn test_unknown_token_rejected() {
    let t = build_test_app();
    let response = get_auth(t.app(), "/storage/", "made.up.token").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// `Authorization: Bearer` works when the `auth` header is absent.
#[tokio::test]
async fn test_bearer_header_fallback() {
    let t = build_test_app();
    t.create_user("alice", "secret").await;
    let token = t.login("alice", "secret").await;

    let request = Request::builder()
        .uri("/storage/")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = send(t.app(), request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// After logout the same token no longer authorizes anything.
#[tokio::test]
async fn test_logout_revokes_token() {
    let t = build_test_app();
    t.create_user("alice", "secret").await;
    let token = t.login("alice", "secret").await;

    assert_eq!(get_auth(t.app(), "/storage/", &token).await.status(), StatusCode::OK);

    let response = post_auth(t.app(), "/logout", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["result"], "ok");

    let response = get_auth(t.app(), "/storage/", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        post_auth(t.app(), "/logout", &token).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

/// Two logins give two independent sessions.
#[tokio::test]
async fn test_sessions_are_independent() {
    let t = build_test_app();
    t.create_user("alice", "secret").await;
    t.create_user("bob", "hunter2").await;
    let alice = t.login("alice", "secret").await;
    let bob = t.login("bob", "hunter2").await;

    post_auth(t.app(), "/logout", &alice).await;

    assert_eq!(get_auth(t.app(), "/storage/", &alice).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(get_auth(t.app(), "/storage/", &bob).await.status(), StatusCode::OK);
}
