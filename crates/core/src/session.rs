//! Session store
//!
//! Owns the authenticated user's identity and bearer token. The session
//! is persisted so a reload stays logged in; logout purges every
//! session- and connection-scoped key in one sweep.

use std::collections::HashSet;
use std::sync::Arc;

use ledgerlink_common::storage::{JsonStoreExt, KeyValueStore};
use ledgerlink_domain::{
    constants, LinkError, LoginRequest, MessageResponse, Result, Session, SignupRequest,
};
use parking_lot::RwLock;
use tracing::{info, instrument, warn};

use crate::ports::{ConnectionGateway, TokenSource};

/// Holds the current [`Session`] and drives login/logout through the
/// gateway.
pub struct SessionStore {
    gateway: Arc<dyn ConnectionGateway>,
    store: Arc<dyn KeyValueStore>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Create a session store, hydrating any persisted session.
    ///
    /// A corrupt persisted entry is discarded rather than failing startup.
    #[must_use]
    pub fn new(gateway: Arc<dyn ConnectionGateway>, store: Arc<dyn KeyValueStore>) -> Self {
        let current = match store.get_json::<Session>(constants::KEY_SESSION) {
            Ok(session) => session.filter(Session::is_valid),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted session");
                None
            }
        };

        Self { gateway, store, current: RwLock::new(current) }
    }

    /// Authenticate and establish a session.
    ///
    /// # Errors
    /// Returns the gateway error on rejection, or `LinkError::Storage` if
    /// the session cannot be persisted.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: &LoginRequest) -> Result<Session> {
        let response = self.gateway.login(request).await?;

        let session = Session {
            subject_id: response.id.to_string(),
            username: response.username,
            token: response.token,
            roles: response.roles.into_iter().collect::<HashSet<_>>(),
            expires_at: None,
        };

        self.store
            .set_json(constants::KEY_SESSION, &session)
            .map_err(|e| LinkError::Storage(e.to_string()))?;
        *self.current.write() = Some(session.clone());

        info!(username = %session.username, "Logged in");
        Ok(session)
    }

    /// Register a new account. Does not establish a session; the caller
    /// follows up with [`login`](Self::login).
    pub async fn signup(&self, request: &SignupRequest) -> Result<MessageResponse> {
        self.gateway.signup(request).await
    }

    /// Destroy the session and purge all session- and connection-scoped
    /// persisted data.
    ///
    /// Purging is best-effort per key: a failing removal is logged and the
    /// remaining keys are still cleared.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        *self.current.write() = None;

        for key in constants::SESSION_SCOPED_KEYS {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to remove key during logout");
            }
        }

        info!("Logged out; session-scoped data purged");
    }

    /// Whether a valid session exists. Token presence is the sole
    /// definition of "logged in".
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.current.read().as_ref().is_some_and(Session::is_valid)
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }
}

impl TokenSource for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.current.read().as_ref().filter(|s| s.is_valid()).map(|s| s.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use ledgerlink_common::storage::MemoryStore;

    use super::*;
    use crate::testing::MockGateway;

    fn login_request() -> LoginRequest {
        LoginRequest { username: "finance".to_string(), password: "hunter2".to_string() }
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(MemoryStore::new());
        let sessions = SessionStore::new(gateway, store.clone());

        assert!(!sessions.is_logged_in());

        let session = sessions.login(&login_request()).await.unwrap();
        assert!(session.is_valid());
        assert!(sessions.is_logged_in());
        assert_eq!(sessions.bearer_token(), Some(session.token.clone()));

        let persisted: Option<Session> = store.get_json(constants::KEY_SESSION).unwrap();
        assert_eq!(persisted, Some(session));
    }

    #[tokio::test]
    async fn test_logout_purges_all_scoped_keys() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(MemoryStore::new());
        let sessions = SessionStore::new(gateway, store.clone());

        sessions.login(&login_request()).await.unwrap();
        for key in constants::SESSION_SCOPED_KEYS {
            store.set_raw(key, "{}").unwrap();
        }

        sessions.logout();

        assert!(!sessions.is_logged_in());
        assert!(sessions.bearer_token().is_none());
        for key in constants::SESSION_SCOPED_KEYS {
            assert!(!store.contains(key).unwrap(), "{key} should be purged");
        }
    }

    #[tokio::test]
    async fn test_hydrates_persisted_session() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(MemoryStore::new());

        {
            let sessions = SessionStore::new(gateway.clone(), store.clone());
            sessions.login(&login_request()).await.unwrap();
        }

        let reloaded = SessionStore::new(gateway, store);
        assert!(reloaded.is_logged_in());
        assert_eq!(reloaded.current().map(|s| s.username), Some("finance".to_string()));
    }

    #[tokio::test]
    async fn test_corrupt_persisted_session_is_discarded() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(MemoryStore::new());
        store.set_raw(constants::KEY_SESSION, "not json").unwrap();

        let sessions = SessionStore::new(gateway, store);
        assert!(!sessions.is_logged_in());
    }

    #[tokio::test]
    async fn test_login_failure_leaves_no_session() {
        let gateway = Arc::new(MockGateway::new());
        gateway.fail_login("bad credentials");
        let sessions = SessionStore::new(gateway, Arc::new(MemoryStore::new()));

        let result = sessions.login(&login_request()).await;
        assert!(result.is_err());
        assert!(!sessions.is_logged_in());
    }
}
