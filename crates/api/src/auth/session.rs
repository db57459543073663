//! Session lifecycle: login, authorization, expiry sweep and logout.
//!
//! A session is live while its row exists *and* its token verifies. Deleting
//! the row revokes the token even though the signature is still valid.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use locker_core::error::CoreError;
use locker_core::types::{DbId, Timestamp};
use locker_db::models::session::{CreateSession, Session};
use locker_db::CredentialStore;

use crate::auth::jwt::{TokenService, MAX_TOKEN_LEN};
use crate::auth::password::{burn_verification, verify_password};
use crate::error::{AppError, AppResult};

const BAD_CREDENTIALS: &str = "Invalid login or password";
const NO_SESSION: &str = "Session not found";
const BAD_TOKEN: &str = "Invalid or expired token";

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

/// Creates, checks and revokes sessions over a [`CredentialStore`].
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    tokens: TokenService,
    lifetime_secs: i64,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenService, lifetime_secs: i64) -> Self {
        Self {
            store,
            tokens,
            lifetime_secs,
        }
    }

    /// Check credentials and open a new session.
    pub async fn login(&self, login: &str, password: &str) -> AppResult<Session> {
        self.login_at(login, password, Utc::now()).await
    }

    /// [`Self::login`] with an explicit clock.
    ///
    /// An unknown login and a wrong password fail with the same message.
    pub async fn login_at(&self, login: &str, password: &str, now: Timestamp) -> AppResult<Session> {
        let Some(user) = self.store.find_user_by_login(login).await? else {
            burn_verification(password);
            tracing::info!("Login rejected");
            return Err(unauthorized(BAD_CREDENTIALS));
        };

        if !verify_password(password, &user.password_hash) {
            tracing::info!("Login rejected");
            return Err(unauthorized(BAD_CREDENTIALS));
        }

        // Sweep failures must not lock everyone out.
        if let Err(e) = self.sweep_expired(now).await {
            tracing::warn!(error = %e, "Expired session sweep failed");
        }

        let expires_at = expiry_for(now, self.lifetime_secs).ok_or_else(|| {
            AppError::InternalError(format!(
                "Session lifetime of {}s is out of range",
                self.lifetime_secs
            ))
        })?;
        let token = self
            .tokens
            .issue_at(user.id, self.lifetime_secs, now.timestamp())
            .map_err(|e| AppError::InternalError(format!("Token issuance failed: {e}")))?;

        let session = self
            .store
            .create_session(CreateSession {
                user_id: user.id,
                token,
                created_at: now,
                expires_at,
            })
            .await?;

        tracing::info!(user_id = user.id, session_id = session.id, "User logged in");
        Ok(session)
    }

    /// Resolve a presented token to the user it was issued for.
    pub async fn authorize(&self, token: &str) -> AppResult<DbId> {
        self.authorize_at(token, Utc::now().timestamp()).await
    }

    /// [`Self::authorize`] as of `now` (Unix seconds).
    ///
    /// The session row is looked up first, then the token itself is
    /// verified. The row must belong to the user named inside the token.
    pub async fn authorize_at(&self, token: &str, now: i64) -> AppResult<DbId> {
        if token.is_empty() || token.len() > MAX_TOKEN_LEN {
            return Err(unauthorized(BAD_TOKEN));
        }

        let session = self
            .store
            .find_session_by_token(token)
            .await?
            .ok_or_else(|| unauthorized(NO_SESSION))?;

        let verified = self.tokens.verify_at(token, now).map_err(|e| {
            tracing::debug!(session_id = session.id, error = %e, "Token rejected");
            unauthorized(BAD_TOKEN)
        })?;

        if verified.user_id != session.user_id {
            tracing::warn!(
                session_id = session.id,
                session_user = session.user_id,
                token_user = verified.user_id,
                "Token does not match its session owner"
            );
            return Err(unauthorized(BAD_TOKEN));
        }

        Ok(verified.user_id)
    }

    /// Delete every session that expired before `now`. Returns how many.
    pub async fn sweep_expired(&self, now: Timestamp) -> AppResult<u64> {
        let removed = self.store.delete_expired_sessions(now).await?;
        if removed > 0 {
            tracing::debug!(removed, "Swept expired sessions");
        }
        Ok(removed)
    }

    /// Revoke the session holding `token`. Returns `false` if there was none.
    pub async fn logout(&self, token: &str) -> AppResult<bool> {
        let Some(session) = self.store.find_session_by_token(token).await? else {
            return Ok(false);
        };
        let removed = self.store.delete_session(session.id).await?;
        if removed {
            tracing::info!(user_id = session.user_id, session_id = session.id, "User logged out");
        }
        Ok(removed)
    }
}

/// `None` when the lifetime does not fit a timestamp.
fn expiry_for(now: DateTime<Utc>, lifetime_secs: i64) -> Option<DateTime<Utc>> {
    now.checked_add_signed(Duration::try_seconds(lifetime_secs)?)
}

/// Render an expiry the way login responses carry it (`YYYY-MM-DD HH:MM:SS`, UTC).
pub fn format_expiry(expires_at: Timestamp) -> String {
    expires_at.format("%Y-%m-%d %H:%M:%S").to_string()
}
