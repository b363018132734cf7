//! Runtime facade
//!
//! Wires the lifecycle components together over one gateway, one
//! persistent store, and one popup driver, and exposes the handful of
//! whole-system operations (startup, disconnect, shutdown) that span
//! more than one component.

use std::sync::Arc;

use ledgerlink_common::storage::KeyValueStore;
use ledgerlink_domain::{constants, ConnectionState, Result, SyncResource, SyncStatusResponse};
use tracing::{info, instrument, warn};

use crate::connection::ConnectionStateCache;
use crate::expiry::{ExpirySupervisor, ExpirySupervisorConfig};
use crate::handshake::{HandshakeConfig, HandshakeOrchestrator};
use crate::notices::Notifier;
use crate::ports::{ConnectionGateway, PopupDriver};
use crate::session::SessionStore;
use crate::sync::SyncCoordinator;

/// Configuration for the assembled runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub handshake: HandshakeConfig,
    pub expiry: ExpirySupervisorConfig,
}

impl RuntimeConfig {
    /// Production timings with the given host origin.
    #[must_use]
    pub fn new(host_origin: impl Into<String>) -> Self {
        Self {
            handshake: HandshakeConfig::new(host_origin),
            expiry: ExpirySupervisorConfig::default(),
        }
    }
}

/// The assembled connection lifecycle.
pub struct ConnectionRuntime {
    gateway: Arc<dyn ConnectionGateway>,
    store: Arc<dyn KeyValueStore>,
    session: Arc<SessionStore>,
    cache: Arc<ConnectionStateCache>,
    handshake: HandshakeOrchestrator,
    supervisor: ExpirySupervisor,
    sync: SyncCoordinator,
    notices: Notifier,
}

impl ConnectionRuntime {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ConnectionGateway>,
        store: Arc<dyn KeyValueStore>,
        popups: Arc<dyn PopupDriver>,
        config: RuntimeConfig,
    ) -> Self {
        let notices = Notifier::default();
        let session = Arc::new(SessionStore::new(gateway.clone(), store.clone()));
        let cache =
            Arc::new(ConnectionStateCache::new(gateway.clone(), store.clone(), session.clone()));
        let handshake = HandshakeOrchestrator::new(
            gateway.clone(),
            cache.clone(),
            popups,
            notices.clone(),
            config.handshake,
        );
        let supervisor = ExpirySupervisor::new(
            gateway.clone(),
            session.clone(),
            cache.clone(),
            notices.clone(),
            config.expiry,
        );
        let sync = SyncCoordinator::new(gateway.clone(), store.clone(), cache.clone());

        Self { gateway, store, session, cache, handshake, supervisor, sync, notices }
    }

    /// Bring the background machinery up. Idempotence is the caller's
    /// concern; a second start while running is an error.
    pub fn start(&self) -> std::result::Result<(), crate::expiry::SupervisorError> {
        self.supervisor.start()
    }

    /// End the session. Background machinery comes down first, then the
    /// session and its persisted keys are purged and the observable
    /// connection state dropped, so every subscriber immediately stops
    /// reading as connected.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.handshake.shutdown().await;
        if self.supervisor.is_running() {
            if let Err(e) = self.supervisor.stop().await {
                warn!(error = %e, "Failed to stop expiry supervisor during logout");
            }
        }
        self.session.logout();
        self.cache.invalidate();
        info!("Logged out; runtime reset");
    }

    /// React to an authentication failure detected at the network
    /// boundary: the session is gone server-side, so drop it locally too.
    pub async fn handle_unauthorized(&self) {
        warn!("Backend rejected credentials; forcing logout");
        self.logout().await;
    }

    /// Current provider link status as the backend reports it, for
    /// direct display. The connection state cache, not this call, stays
    /// the canonical connectivity source.
    pub async fn provider_status(&self) -> Result<SyncStatusResponse> {
        self.gateway.fetch_status().await
    }

    /// Sever the provider link: tell the backend to discard its tokens,
    /// then drop everything connection-scoped locally. The session itself
    /// survives.
    ///
    /// # Errors
    /// The gateway error if the backend call fails; local state is left
    /// untouched in that case.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<()> {
        self.gateway.disconnect().await?;

        self.cache.publish(ConnectionState::disconnected());
        if let Err(e) = self.store.remove(constants::KEY_SYNC_TIMESTAMPS) {
            warn!(error = %e, "Failed to remove sync timestamps on disconnect");
        }
        for resource in SyncResource::ALL {
            if let Err(e) = self.store.remove(resource.listing_cache_key()) {
                warn!(%resource, error = %e, "Failed to remove listing cache on disconnect");
            }
        }

        info!("Provider link severed");
        Ok(())
    }

    /// Stop background tasks and abandon any handshake in flight.
    pub async fn shutdown(&self) {
        self.handshake.shutdown().await;
        if self.supervisor.is_running() {
            if let Err(e) = self.supervisor.stop().await {
                warn!(error = %e, "Failed to stop expiry supervisor");
            }
        }
        info!("Connection runtime shut down");
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn connection(&self) -> &Arc<ConnectionStateCache> {
        &self.cache
    }

    #[must_use]
    pub fn handshake(&self) -> &HandshakeOrchestrator {
        &self.handshake
    }

    #[must_use]
    pub fn supervisor(&self) -> &ExpirySupervisor {
        &self.supervisor
    }

    #[must_use]
    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    #[must_use]
    pub fn notices(&self) -> &Notifier {
        &self.notices
    }
}
