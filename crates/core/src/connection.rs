//! Connection state cache
//!
//! Single source of truth for "is the provider linked". Consumers read
//! through a watch channel or ask for an on-demand (optionally forced)
//! fetch; the cache persists every published state so a reload starts
//! from the last known answer instead of "disconnected".

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ledgerlink_common::storage::{JsonStoreExt, KeyValueStore};
use ledgerlink_domain::{constants, ConnectionState, LinkError, Result};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::ports::ConnectionGateway;
use crate::session::SessionStore;

/// Cached, observable provider connection state.
///
/// Publishes are last-write-wins; a failed remote fetch leaves the prior
/// cached value untouched.
pub struct ConnectionStateCache {
    gateway: Arc<dyn ConnectionGateway>,
    store: Arc<dyn KeyValueStore>,
    session: Arc<SessionStore>,
    tx: watch::Sender<Option<ConnectionState>>,
}

impl ConnectionStateCache {
    /// Create the cache, hydrating any persisted state.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ConnectionGateway>,
        store: Arc<dyn KeyValueStore>,
        session: Arc<SessionStore>,
    ) -> Self {
        let initial = match store.get_json::<ConnectionState>(constants::KEY_CONNECTION_STATE) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted connection state");
                None
            }
        };

        let (tx, _) = watch::channel(initial);
        Self { gateway, store, session, tx }
    }

    /// Current connection state.
    ///
    /// Without `force`, a cached value is returned as-is; with `force` (or
    /// on a cache miss) the backend is consulted and the derived state
    /// published. Without a session the answer is always disconnected and
    /// no remote call is made.
    ///
    /// # Errors
    /// `LinkError::RemoteUnavailable` when the backend cannot be reached;
    /// `LinkError::Unauthenticated` passes through untouched. The cached
    /// state is not modified on failure.
    #[instrument(skip(self))]
    pub async fn get(&self, force: bool) -> Result<ConnectionState> {
        if !self.session.is_logged_in() {
            return Ok(ConnectionState::disconnected());
        }

        if !force {
            if let Some(state) = self.tx.borrow().clone() {
                debug!(connected = state.connected, "Serving cached connection state");
                return Ok(state);
            }
        }

        let state = self.fetch_remote().await?;
        self.publish(state.clone());
        Ok(state)
    }

    /// Fetch summary and profile concurrently and derive the state.
    ///
    /// Connectivity requires both signals: the dashboard must report the
    /// provider linked AND the profile must carry a provider token. Either
    /// one alone is a half-connected backend we treat as not linked.
    async fn fetch_remote(&self) -> Result<ConnectionState> {
        let (summary, profile) = tokio::try_join!(
            self.gateway.fetch_dashboard_summary(),
            self.gateway.fetch_user_profile(),
        )
        .map_err(|e| match e {
            LinkError::Unauthenticated => LinkError::Unauthenticated,
            other => LinkError::RemoteUnavailable(other.to_string()),
        })?;

        Ok(ConnectionState {
            connected: summary.xero_connected && profile.has_provider_token(),
            tenant_id: profile.xero_tenant_id.or(summary.tenant_id),
            last_sync_time: summary.last_sync_time,
            token_expires_at: profile.token_expiry,
        })
    }

    /// Publish a new state: persist it and notify all observers.
    pub fn publish(&self, state: ConnectionState) {
        if let Err(e) = self.store.set_json(constants::KEY_CONNECTION_STATE, &state) {
            warn!(error = %e, "Failed to persist connection state");
        }
        debug!(connected = state.connected, "Publishing connection state");
        self.tx.send_replace(Some(state));
    }

    /// Drop the cached state entirely; the next `get` consults the
    /// backend. Observers see `None` until then.
    pub fn invalidate(&self) {
        if let Err(e) = self.store.remove(constants::KEY_CONNECTION_STATE) {
            warn!(error = %e, "Failed to remove persisted connection state");
        }
        self.tx.send_replace(None);
    }

    /// Observe state changes. The receiver immediately holds the current
    /// value.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<ConnectionState>> {
        self.tx.subscribe()
    }

    /// Snapshot of the cached state without touching the backend.
    #[must_use]
    pub fn current(&self) -> Option<ConnectionState> {
        self.tx.borrow().clone()
    }

    /// Token expiry from the cached state, if known.
    #[must_use]
    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.tx.borrow().as_ref().and_then(|s| s.token_expires_at)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use ledgerlink_common::storage::MemoryStore;
    use ledgerlink_domain::LoginRequest;

    use super::*;
    use crate::testing::MockGateway;

    async fn logged_in_fixture() -> (Arc<MockGateway>, Arc<MemoryStore>, ConnectionStateCache) {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(SessionStore::new(gateway.clone(), store.clone()));
        session
            .login(&LoginRequest { username: "finance".into(), password: "pw".into() })
            .await
            .unwrap();
        let cache = ConnectionStateCache::new(gateway.clone(), store.clone(), session);
        (gateway, store, cache)
    }

    #[tokio::test]
    async fn test_disconnected_without_session() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(SessionStore::new(gateway.clone(), store.clone()));
        let cache = ConnectionStateCache::new(gateway.clone(), store, session);

        let state = cache.get(true).await.unwrap();
        assert!(!state.connected);
        assert_eq!(gateway.summary_calls(), 0, "no remote call without a session");
    }

    #[tokio::test]
    async fn test_connected_requires_both_signals() {
        let (gateway, _store, cache) = logged_in_fixture().await;

        gateway.set_linked(true, Some("T1"), Some(Utc::now() + Duration::hours(1)));
        assert!(cache.get(true).await.unwrap().connected);

        // Dashboard says linked but the profile lost its token.
        gateway.clear_provider_token();
        assert!(!cache.get(true).await.unwrap().connected);
    }

    #[tokio::test]
    async fn test_cached_value_served_without_force() {
        let (gateway, _store, cache) = logged_in_fixture().await;
        gateway.set_linked(true, Some("T1"), None);

        cache.get(true).await.unwrap();
        let calls = gateway.summary_calls();

        cache.get(false).await.unwrap();
        cache.get(false).await.unwrap();
        assert_eq!(gateway.summary_calls(), calls, "non-forced reads stay local");

        cache.get(true).await.unwrap();
        assert_eq!(gateway.summary_calls(), calls + 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_preserves_cache() {
        let (gateway, _store, cache) = logged_in_fixture().await;
        gateway.set_linked(true, Some("T1"), None);
        cache.get(true).await.unwrap();

        gateway.fail_remote(true);
        let err = cache.get(true).await.unwrap_err();
        assert!(matches!(err, LinkError::RemoteUnavailable(_)));
        assert!(cache.current().unwrap().connected, "prior state survives the failure");
    }

    #[tokio::test]
    async fn test_invalidate_forces_next_fetch() {
        let (gateway, store, cache) = logged_in_fixture().await;
        gateway.set_linked(true, Some("T1"), None);
        cache.get(true).await.unwrap();
        let calls = gateway.summary_calls();

        cache.invalidate();
        assert!(cache.current().is_none());
        assert!(!store.contains(constants::KEY_CONNECTION_STATE).unwrap());

        cache.get(false).await.unwrap();
        assert_eq!(gateway.summary_calls(), calls + 1, "miss falls through to the backend");
    }

    #[tokio::test]
    async fn test_publish_notifies_subscribers() {
        let (_gateway, _store, cache) = logged_in_fixture().await;
        let mut rx = cache.subscribe();
        rx.borrow_and_update();

        cache.publish(ConnectionState {
            connected: true,
            tenant_id: Some("T1".into()),
            last_sync_time: None,
            token_expires_at: None,
        });

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().as_ref().unwrap().connected);
    }

    #[tokio::test]
    async fn test_hydrates_persisted_state() {
        let (gateway, store, cache) = logged_in_fixture().await;
        gateway.set_linked(true, Some("T1"), None);
        cache.get(true).await.unwrap();
        drop(cache);

        let session = Arc::new(SessionStore::new(gateway.clone(), store.clone()));
        let reloaded = ConnectionStateCache::new(gateway, store, session);
        assert!(reloaded.current().unwrap().connected);
    }
}
