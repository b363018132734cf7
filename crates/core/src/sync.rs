//! Sync coordinator
//!
//! Invokes backend syncs per resource or for all resources at once,
//! keeps the per-resource last-sync timestamps, and maintains the
//! persisted listing caches that back the resource tables.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ledgerlink_common::storage::{JsonStoreExt, KeyValueStore};
use ledgerlink_domain::{
    constants, Account, BankTransaction, Invoice, LinkError, Result, SyncAllReport, SyncOutcome,
    SyncResource, SyncResult, SyncTimestamps,
};
use tracing::{debug, info, instrument, warn};

use crate::connection::ConnectionStateCache;
use crate::ports::ConnectionGateway;

/// Drives resource syncs and the bookkeeping around them.
pub struct SyncCoordinator {
    gateway: Arc<dyn ConnectionGateway>,
    store: Arc<dyn KeyValueStore>,
    cache: Arc<ConnectionStateCache>,
}

impl SyncCoordinator {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ConnectionGateway>,
        store: Arc<dyn KeyValueStore>,
        cache: Arc<ConnectionStateCache>,
    ) -> Self {
        Self { gateway, store, cache }
    }

    /// Sync one resource.
    ///
    /// On success the resource's listing cache is dropped, its timestamp
    /// recorded, and a connection state refresh kicked off in the
    /// background (the backend's `lastSyncTime` moved).
    ///
    /// # Errors
    /// `LinkError::SyncFailed` carrying the backend's message verbatim
    /// when the backend reports failure; transport errors pass through.
    #[instrument(skip(self))]
    pub async fn sync_resource(&self, resource: SyncResource) -> SyncResult {
        let outcome = self.sync_inner(resource).await?;
        self.spawn_state_refresh();
        Ok(outcome)
    }

    /// Sync all resources concurrently.
    ///
    /// Each resource succeeds or fails on its own; timestamps are
    /// recorded independently. At most one state refresh is kicked off,
    /// and only when at least one resource succeeded.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> SyncAllReport {
        let (invoices, accounts, transactions) = tokio::join!(
            self.sync_inner(SyncResource::Invoices),
            self.sync_inner(SyncResource::Accounts),
            self.sync_inner(SyncResource::Transactions),
        );

        let report = SyncAllReport { invoices, accounts, transactions };
        let any_succeeded =
            [&report.invoices, &report.accounts, &report.transactions].iter().any(|r| r.is_ok());
        if any_succeeded {
            self.spawn_state_refresh();
        }
        info!(status = ?report.status(), "Sync-all finished");
        report
    }

    /// Last successful sync of one resource, if any.
    #[must_use]
    pub fn last_synced(&self, resource: SyncResource) -> Option<DateTime<Utc>> {
        self.timestamps().get(resource)
    }

    /// Invoice listing, from the persisted cache unless `force` or empty.
    pub async fn invoices(&self, force: bool) -> Result<Vec<Invoice>> {
        self.listing(SyncResource::Invoices, force, || self.gateway.fetch_invoices()).await
    }

    /// Account listing, from the persisted cache unless `force` or empty.
    pub async fn accounts(&self, force: bool) -> Result<Vec<Account>> {
        self.listing(SyncResource::Accounts, force, || self.gateway.fetch_accounts()).await
    }

    /// Bank transaction listing, from the persisted cache unless `force`
    /// or empty.
    pub async fn transactions(&self, force: bool) -> Result<Vec<BankTransaction>> {
        self.listing(SyncResource::Transactions, force, || self.gateway.fetch_transactions()).await
    }

    async fn sync_inner(&self, resource: SyncResource) -> SyncResult {
        let response = self.gateway.sync_resource(resource).await?;
        if !response.is_success() {
            warn!(%resource, message = %response.message, "Backend reported sync failure");
            return Err(LinkError::SyncFailed(response.message));
        }

        // The cached listing predates this sync; drop it so the next read
        // refetches.
        if let Err(e) = self.store.remove(resource.listing_cache_key()) {
            warn!(%resource, error = %e, "Failed to drop stale listing cache");
        }

        let synced_at = Utc::now();
        let mut stamps = self.timestamps();
        stamps.record(resource, synced_at);
        if let Err(e) = self.store.set_json(constants::KEY_SYNC_TIMESTAMPS, &stamps) {
            warn!(%resource, error = %e, "Failed to persist sync timestamps");
        }

        info!(%resource, "Resource synced");
        Ok(SyncOutcome { resource, message: response.message, synced_at })
    }

    async fn listing<T, F, Fut>(&self, resource: SyncResource, force: bool, fetch: F) -> Result<Vec<T>>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<T>>>,
    {
        let key = resource.listing_cache_key();
        if !force {
            match self.store.get_json::<Vec<T>>(key) {
                Ok(Some(rows)) => {
                    debug!(%resource, rows = rows.len(), "Serving cached listing");
                    return Ok(rows);
                }
                Ok(None) => {}
                Err(e) => warn!(%resource, error = %e, "Discarding unreadable listing cache"),
            }
        }

        let rows = fetch().await?;
        if let Err(e) = self.store.set_json(key, &rows) {
            warn!(%resource, error = %e, "Failed to persist listing cache");
        }
        Ok(rows)
    }

    fn timestamps(&self) -> SyncTimestamps {
        match self.store.get_json::<SyncTimestamps>(constants::KEY_SYNC_TIMESTAMPS) {
            Ok(stamps) => stamps.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable sync timestamps");
                SyncTimestamps::default()
            }
        }
    }

    fn spawn_state_refresh(&self) {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.get(true).await {
                warn!(error = %e, "Post-sync connection state refresh failed");
            }
        });
    }
}
