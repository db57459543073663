//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{body_json, build_test_app, get, test_config};
use locker_api::router::build_app_router;
use locker_api::state::AppState;
use locker_core::sandbox::Sandbox;
use locker_core::types::{DbId, Timestamp};
use locker_db::models::session::{CreateSession, Session};
use locker_db::models::user::{CreateUser, User};
use locker_db::{CredentialStore, StoreError};

/// A store whose backend is unreachable.
struct OfflineStore;

fn offline<T>() -> Result<T, StoreError> {
    Err(StoreError::Database(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl CredentialStore for OfflineStore {
    async fn ping(&self) -> Result<(), StoreError> {
        offline()
    }
    async fn create_user(&self, _: CreateUser) -> Result<User, StoreError> {
        offline()
    }
    async fn find_user_by_login(&self, _: &str) -> Result<Option<User>, StoreError> {
        offline()
    }
    async fn find_user_by_id(&self, _: DbId) -> Result<Option<User>, StoreError> {
        offline()
    }
    async fn update_password(&self, _: DbId, _: &str) -> Result<bool, StoreError> {
        offline()
    }
    async fn delete_user(&self, _: DbId) -> Result<bool, StoreError> {
        offline()
    }
    async fn create_session(&self, _: CreateSession) -> Result<Session, StoreError> {
        offline()
    }
    async fn find_session_by_token(&self, _: &str) -> Result<Option<Session>, StoreError> {
        offline()
    }
    async fn list_sessions_for_user(&self, _: DbId) -> Result<Vec<Session>, StoreError> {
        offline()
    }
    async fn delete_session(&self, _: DbId) -> Result<bool, StoreError> {
        offline()
    }
    async fn delete_sessions_for_user(&self, _: DbId) -> Result<u64, StoreError> {
        offline()
    }
    async fn delete_expired_sessions(&self, _: Timestamp) -> Result<u64, StoreError> {
        offline()
    }
}

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let t = build_test_app();
    let response = get(t.app(), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store_healthy"], true);
}

#[tokio::test]
async fn unreachable_store_reports_degraded() {
    let storage = tempfile::tempdir().unwrap();
    let config = test_config(storage.path().to_path_buf());
    let sandbox = Sandbox::new(storage.path()).unwrap();
    let state = AppState::new(Arc::new(OfflineStore), &config.jwt, sandbox);
    let app = build_app_router(state, &config);

    let response = get(app.clone(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["store_healthy"], false);

    // Login surfaces the outage as a sanitized 500.
    let response = common::post_json(
        app,
        "/login",
        serde_json::json!({ "login": "alice", "password": "secret" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "An internal error occurred");
}

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let t = build_test_app();
    let response = get(t.app(), "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Not Found");
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let t = build_test_app();
    let response = get(t.app(), "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}
