use std::sync::Arc;

use locker_core::sandbox::Sandbox;
use locker_db::CredentialStore;

use crate::auth::jwt::{JwtConfig, TokenService};
use crate::auth::session::SessionManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Users and sessions; pinged by the health route.
    pub store: Arc<dyn CredentialStore>,
    /// Login, authorization and logout over `store`.
    pub sessions: Arc<SessionManager>,
    /// Per-user path resolution under the storage root.
    pub sandbox: Arc<Sandbox>,
}

impl AppState {
    /// Wire the session manager to `store` using the token settings in `jwt`.
    pub fn new(store: Arc<dyn CredentialStore>, jwt: &JwtConfig, sandbox: Sandbox) -> Self {
        let sessions = SessionManager::new(
            Arc::clone(&store),
            TokenService::new(&jwt.secret),
            jwt.token_lifetime_secs,
        );
        Self {
            store,
            sessions: Arc::new(sessions),
            sandbox: Arc::new(sandbox),
        }
    }
}
