#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use locker_api::auth::jwt::JwtConfig;
use locker_api::auth::password::hash_password;
use locker_api::config::{ServerConfig, StorageConfig};
use locker_api::router::build_app_router;
use locker_api::state::AppState;
use locker_core::sandbox::Sandbox;
use locker_core::storage::ensure_user_root;
use locker_core::types::DbId;
use locker_db::models::user::CreateUser;
use locker_db::{CredentialStore, MemoryCredentialStore};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const MULTIPART_BOUNDARY: &str = "locker-test-boundary";

/// Build a test `ServerConfig` with safe defaults rooted at `storage_root`.
pub fn test_config(storage_root: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            token_lifetime_secs: 3600,
        },
        storage: StorageConfig { root: storage_root },
    }
}

/// A router plus the in-memory store and temporary storage root behind it.
///
/// The temporary directory is removed when the value is dropped.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryCredentialStore>,
    pub sandbox: Sandbox,
    _storage: tempfile::TempDir,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Create a user, hash its password and give it a storage directory.
    pub async fn create_user(&self, login: &str, password: &str) -> DbId {
        let user = self
            .store
            .create_user(CreateUser {
                login: login.to_string(),
                password_hash: hash_password(password).expect("hashing should succeed"),
            })
            .await
            .expect("user creation should succeed");
        ensure_user_root(&self.sandbox, user.id)
            .await
            .expect("user root should be created");
        user.id
    }

    /// Absolute path of `relative` inside the directory of `user_id`.
    pub fn user_path(&self, user_id: DbId, relative: &str) -> PathBuf {
        self.sandbox
            .resolve(user_id, relative)
            .expect("path inside sandbox")
            .as_path()
            .to_path_buf()
    }

    /// Log in through the API and return the token.
    pub async fn login(&self, login: &str, password: &str) -> String {
        let body = serde_json::json!({ "login": login, "password": password });
        let response = post_json(self.app(), "/login", body).await;
        assert_eq!(response.status(), axum::http::StatusCode::OK, "login should succeed");
        let json = body_json(response).await;
        json["token"].as_str().expect("token in response").to_string()
    }
}

/// Build the full application router with all middleware layers, backed by
/// a fresh in-memory store and a temporary storage root.
pub fn build_test_app() -> TestApp {
    let storage = tempfile::tempdir().expect("tempdir");
    let config = test_config(storage.path().to_path_buf());
    let sandbox = Sandbox::new(&config.storage.root).expect("sandbox");
    let store = Arc::new(MemoryCredentialStore::new());

    let state = AppState::new(store.clone(), &config.jwt, sandbox.clone());
    let router = build_app_router(state, &config);

    TestApp {
        router,
        store,
        sandbox,
        _storage: storage,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

/// GET with the token in the `auth` header.
pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("auth", token)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST with no body.
pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("auth", token)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// POST a `multipart/form-data` body with one part per `(file name, bytes)`.
pub async fn post_files_auth(
    app: Router,
    uri: &str,
    token: &str,
    files: &[(&str, &[u8])],
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("auth", token)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(multipart_body(files)))
        .unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("auth", token)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files[]\"; filename=\"{name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body should be JSON")
}
