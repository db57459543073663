//! Route definitions for the `/storage` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::storage;
use crate::state::AppState;

/// The bare prefix and `/storage/` both address the caller's own directory.
///
/// ```text
/// GET|POST|DELETE /storage           -> *_root
/// GET|POST|DELETE /storage/          -> *_root
/// GET|POST|DELETE /storage/{*path}   -> *_entry
/// ```
pub fn router() -> Router<AppState> {
    let root = get(storage::get_root)
        .post(storage::post_root)
        .delete(storage::delete_root);

    Router::new()
        .route("/storage", root.clone())
        .route("/storage/", root)
        .route(
            "/storage/{*path}",
            get(storage::get_entry)
                .post(storage::post_entry)
                .delete(storage::delete_entry),
        )
}
