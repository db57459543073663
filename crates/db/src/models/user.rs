//! User entity model and DTO.

use locker_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash; never returned over HTTP.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    /// Unique, case-sensitive, immutable after creation.
    pub login: String,
    pub password_hash: String,
    pub created_at: Timestamp,
}

/// DTO for creating a new user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub login: String,
    pub password_hash: String,
}
