//! Handlers for `/storage/{path}`: list, download, upload, delete.
//!
//! Every path is resolved inside the caller's own directory before any
//! filesystem access. Error messages leave with both the user's directory
//! and the storage root stripped out.

use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use locker_core::error::CoreError;
use locker_core::sandbox::SandboxedPath;
use locker_core::storage::{self, EntryKind, Upload};
use locker_core::types::DbId;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ResultResponse;
use crate::state::AppState;

/// Resolve the requested path for `user_id`, logging escape attempts.
fn resolve(state: &AppState, user_id: DbId, relative: &str) -> AppResult<SandboxedPath> {
    state.sandbox.resolve(user_id, relative).map_err(|e| {
        if matches!(e, CoreError::Forbidden(_)) {
            tracing::warn!(user_id, path = %relative, "Sandbox escape attempt");
        }
        AppError::Core(e)
    })
}

/// Strip absolute locations from a storage error.
fn redact(state: &AppState, target: &SandboxedPath, err: CoreError) -> AppError {
    AppError::Core(
        err.redact(target.user_root())
            .redact(state.sandbox.storage_root()),
    )
}

fn attachment(name: &str) -> HeaderValue {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_bytes(format!("attachment; filename=\"{escaped}\"").as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// GET /storage
pub async fn get_root(State(state): State<AppState>, auth: AuthUser) -> AppResult<Response> {
    fetch(&state, &auth, "").await
}

/// GET /storage/{path}
///
/// A directory answers with its entry names joined by spaces; a file is
/// streamed as an attachment.
pub async fn get_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<String>,
) -> AppResult<Response> {
    fetch(&state, &auth, &path).await
}

async fn fetch(state: &AppState, auth: &AuthUser, relative: &str) -> AppResult<Response> {
    let target = resolve(state, auth.user_id, relative)?;

    if storage::entry_kind(&target).await == Some(EntryKind::Directory) {
        let names = storage::list(&target)
            .await
            .map_err(|e| redact(state, &target, e))?;
        return Ok(Json(ResultResponse {
            result: names.join(" "),
        })
        .into_response());
    }

    let file = storage::read(&target)
        .await
        .map_err(|e| redact(state, &target, e))?;

    tracing::debug!(
        user_id = auth.user_id,
        path = %target.display_path(),
        size = file.size,
        "Serving file"
    );

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(file.mime_type)),
            (CONTENT_DISPOSITION, attachment(&file.name)),
            (CONTENT_LENGTH, HeaderValue::from(file.size)),
        ],
        Body::from_stream(ReaderStream::new(file.file)),
    )
        .into_response())
}

/// POST /storage
pub async fn post_root(
    State(state): State<AppState>,
    auth: AuthUser,
    request: Request,
) -> AppResult<Json<ResultResponse<&'static str>>> {
    store(&state, &auth, "", request).await
}

/// POST /storage/{path}
///
/// Creates the directory at `path`. Files in a `multipart/form-data` body
/// are written into it; with files present an existing directory is fine.
pub async fn post_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<String>,
    request: Request,
) -> AppResult<Json<ResultResponse<&'static str>>> {
    store(&state, &auth, &path, request).await
}

async fn store(
    state: &AppState,
    auth: &AuthUser,
    relative: &str,
    request: Request,
) -> AppResult<Json<ResultResponse<&'static str>>> {
    let target = resolve(state, auth.user_id, relative)?;
    let uploads = collect_uploads(state, request).await?;

    let written = storage::store(&target, &uploads)
        .await
        .map_err(|e| redact(state, &target, e))?;

    tracing::info!(
        user_id = auth.user_id,
        path = %target.display_path(),
        files = written,
        "Stored entry"
    );
    Ok(Json(ResultResponse::ok()))
}

/// DELETE /storage
///
/// Always refused: the caller's own directory cannot be deleted.
pub async fn delete_root(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ResultResponse<&'static str>>> {
    remove(&state, &auth, "").await
}

/// DELETE /storage/{path}
pub async fn delete_entry(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(path): Path<String>,
) -> AppResult<Json<ResultResponse<&'static str>>> {
    remove(&state, &auth, &path).await
}

async fn remove(
    state: &AppState,
    auth: &AuthUser,
    relative: &str,
) -> AppResult<Json<ResultResponse<&'static str>>> {
    let target = resolve(state, auth.user_id, relative)?;

    storage::remove(&target)
        .await
        .map_err(|e| redact(state, &target, e))?;

    tracing::info!(user_id = auth.user_id, path = %target.display_path(), "Deleted entry");
    Ok(Json(ResultResponse::ok()))
}

/// Read every file part of a multipart body. Other bodies carry no uploads.
async fn collect_uploads(state: &AppState, request: Request) -> AppResult<Vec<Upload>> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));
    if !is_multipart {
        return Ok(Vec::new());
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        // Plain form fields are not files.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        uploads.push(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
    Ok(uploads)
}
