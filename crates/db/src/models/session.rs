//! Session model and DTOs.

use locker_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `sessions` table.
///
/// `expires_at` is fixed at creation and never updated.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    /// Owner; a plain back-reference; the user row owns the session.
    pub user_id: DbId,
    /// Signed token handed to the client, at most 500 characters.
    pub token: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl Session {
    /// True once `now` has passed `expires_at`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at < now
    }
}

/// DTO for creating a new session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub token: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}
