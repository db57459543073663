//! Session-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use locker_core::error::CoreError;
use locker_core::types::DbId;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the raw session token.
pub const AUTH_HEADER: &str = "auth";

/// Authenticated user resolved from a live session.
///
/// The token is read from the `auth` header, or failing that from
/// `Authorization: Bearer <token>`.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    /// The token as presented, for logout.
    pub token: String,
}

fn presented_token(parts: &Parts) -> Option<&str> {
    if let Some(raw) = parts.headers.get(AUTH_HEADER) {
        return raw.to_str().ok().map(str::trim);
    }
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = presented_token(parts)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing auth token".into()))
            })?;

        let user_id = state.sessions.authorize(token).await?;

        Ok(AuthUser {
            user_id,
            token: token.to_string(),
        })
    }
}
