use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use locker_core::types::{DbId, Timestamp};
use tokio::sync::RwLock;

use super::{CredentialStore, StoreError};
use crate::models::session::{CreateSession, Session};
use crate::models::user::{CreateUser, User};

/// A user together with the ids of the sessions it owns.
struct UserRecord {
    user: User,
    session_ids: BTreeSet<DbId>,
}

#[derive(Default)]
struct Tables {
    last_user_id: DbId,
    last_session_id: DbId,
    users: HashMap<DbId, UserRecord>,
    sessions: HashMap<DbId, Session>,
}

impl Tables {
    fn drop_session(&mut self, id: DbId) -> bool {
        let Some(session) = self.sessions.remove(&id) else {
            return false;
        };
        if let Some(owner) = self.users.get_mut(&session.user_id) {
            owner.session_ids.remove(&id);
        }
        true
    }
}

/// Process-local [`CredentialStore`].
///
/// Thread-safe via interior `RwLock`; share it behind an `Arc`. Contents are
/// lost on restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, input: CreateUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|r| r.user.login == input.login) {
            return Err(StoreError::DuplicateLogin(input.login));
        }

        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            login: input.login,
            password_hash: input.password_hash,
            created_at: chrono::Utc::now(),
        };
        tables.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                session_ids: BTreeSet::new(),
            },
        );
        Ok(user)
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|r| r.user.login == login)
            .map(|r| r.user.clone()))
    }

    async fn find_user_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|r| r.user.clone()))
    }

    async fn update_password(&self, id: DbId, password_hash: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(record) => {
                record.user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: DbId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(record) = tables.users.remove(&id) else {
            return Ok(false);
        };
        for session_id in record.session_ids {
            tables.sessions.remove(&session_id);
        }
        Ok(true)
    }

    async fn create_session(&self, input: CreateSession) -> Result<Session, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&input.user_id) {
            return Err(StoreError::UnknownUser(input.user_id));
        }

        tables.last_session_id += 1;
        let session = Session {
            id: tables.last_session_id,
            user_id: input.user_id,
            token: input.token,
            created_at: input.created_at,
            expires_at: input.expires_at,
        };
        if let Some(owner) = tables.users.get_mut(&session.user_id) {
            owner.session_ids.insert(session.id);
        }
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn list_sessions_for_user(&self, user_id: DbId) -> Result<Vec<Session>, StoreError> {
        let tables = self.tables.read().await;
        let Some(record) = tables.users.get(&user_id) else {
            return Ok(Vec::new());
        };
        let mut sessions: Vec<Session> = record
            .session_ids
            .iter()
            .filter_map(|id| tables.sessions.get(id).cloned())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn delete_session(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.drop_session(id))
    }

    async fn delete_sessions_for_user(&self, user_id: DbId) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let ids: Vec<DbId> = match tables.users.get(&user_id) {
            Some(record) => record.session_ids.iter().copied().collect(),
            None => return Ok(0),
        };
        let removed = ids.into_iter().filter(|id| tables.drop_session(*id)).count();
        Ok(removed as u64)
    }

    async fn delete_expired_sessions(&self, now: Timestamp) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let expired: Vec<DbId> = tables
            .sessions
            .values()
            .filter(|s| s.is_expired_at(now))
            .map(|s| s.id)
            .collect();
        let removed = expired.into_iter().filter(|id| tables.drop_session(*id)).count();
        Ok(removed as u64)
    }
}
