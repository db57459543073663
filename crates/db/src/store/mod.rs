//! The credential store seam.
//!
//! The API only talks to users and sessions through [`CredentialStore`], so
//! the server can run against Postgres or, in tests, against
//! [`MemoryCredentialStore`].

mod memory;
mod postgres;

use async_trait::async_trait;
use locker_core::types::{DbId, Timestamp};

use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, User};

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Errors raised by credential store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The login is already registered.
    #[error("Login '{0}' is already taken")]
    DuplicateLogin(String),

    /// A session was created for a user that does not exist.
    #[error("User {0} does not exist")]
    UnknownUser(DbId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for users and their sessions.
///
/// A user owns its sessions: [`CredentialStore::delete_user`] removes them
/// before removing the user.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Check that the backend can serve requests.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create_user(&self, input: CreateUser) -> Result<User, StoreError>;

    /// Case-sensitive exact match on `login`.
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError>;

    /// Returns `false` if the user does not exist.
    async fn update_password(&self, id: DbId, password_hash: &str) -> Result<bool, StoreError>;

    /// Delete the user's sessions, then the user. Returns `false` if the
    /// user did not exist.
    async fn delete_user(&self, id: DbId) -> Result<bool, StoreError>;

    async fn create_session(&self, input: CreateSession) -> Result<Session, StoreError>;

    /// Exact match on the token string. Expired rows are still returned.
    async fn find_session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError>;

    async fn list_sessions_for_user(&self, user_id: DbId) -> Result<Vec<Session>, StoreError>;

    async fn delete_session(&self, id: DbId) -> Result<bool, StoreError>;

    async fn delete_sessions_for_user(&self, user_id: DbId) -> Result<u64, StoreError>;

    /// Delete every session with `expires_at < now`. Safe to repeat.
    async fn delete_expired_sessions(&self, now: Timestamp) -> Result<u64, StoreError>;
}
