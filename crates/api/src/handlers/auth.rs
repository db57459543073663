//! Handlers for login and logout.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::session::format_expiry;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ResultResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /login`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub expires_at: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /login
///
/// Authenticate with login + password. Returns the session token and its
/// expiry.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(input) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if input.login.is_empty() || input.password.is_empty() {
        return Err(AppError::BadRequest(
            "Login and password are required".into(),
        ));
    }

    let session = state.sessions.login(&input.login, &input.password).await?;

    Ok(Json(LoginResponse {
        expires_at: format_expiry(session.expires_at),
        token: session.token,
    }))
}

/// POST /logout
///
/// Revoke the session behind the presented token.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<ResultResponse<&'static str>>> {
    state.sessions.logout(&auth.token).await?;
    Ok(Json(ResultResponse::ok()))
}
