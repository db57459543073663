pub mod auth;
pub mod health;
pub mod storage;

use axum::Router;

use crate::state::AppState;

/// Build the route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                      GET     service health
/// /login                       POST    open a session
/// /logout                      POST    revoke the presented session
/// /storage[/{*path}]           GET     list a directory or download a file
///                              POST    create a directory, upload files
///                              DELETE  delete a file or directory
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(storage::router())
}
