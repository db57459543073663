use async_trait::async_trait;
use locker_core::types::{DbId, Timestamp};

use super::{CredentialStore, StoreError};
use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, User};
use crate::repositories::{SessionRepo, UserRepo};
use crate::DbPool;

/// PostgreSQL unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// [`CredentialStore`] backed by the `users` and `sessions` tables.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: DbPool,
}

impl PgCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION))
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }

    async fn create_user(&self, input: CreateUser) -> Result<User, StoreError> {
        UserRepo::create(&self.pool, &input).await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateLogin(input.login.clone())
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_login(&self.pool, login).await?)
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn update_password(&self, id: DbId, password_hash: &str) -> Result<bool, StoreError> {
        Ok(UserRepo::update_password(&self.pool, id, password_hash).await?)
    }

    async fn delete_user(&self, id: DbId) -> Result<bool, StoreError> {
        let sessions = SessionRepo::delete_for_user(&self.pool, id).await?;
        let deleted = UserRepo::delete(&self.pool, id).await?;
        tracing::debug!(user_id = id, sessions, deleted, "Deleted user");
        Ok(deleted)
    }

    async fn create_session(&self, input: CreateSession) -> Result<Session, StoreError> {
        SessionRepo::create(&self.pool, &input).await.map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::UnknownUser(input.user_id)
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn find_session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::find_by_token(&self.pool, token).await?)
    }

    async fn list_sessions_for_user(&self, user_id: DbId) -> Result<Vec<Session>, StoreError> {
        Ok(SessionRepo::list_for_user(&self.pool, user_id).await?)
    }

    async fn delete_session(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(SessionRepo::delete(&self.pool, id).await?)
    }

    async fn delete_sessions_for_user(&self, user_id: DbId) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_for_user(&self.pool, user_id).await?)
    }

    async fn delete_expired_sessions(&self, now: Timestamp) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_expired(&self.pool, now).await?)
    }
}
