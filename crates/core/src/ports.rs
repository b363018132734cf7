//! Port interfaces for external collaborators
//!
//! These traits abstract the backend gateway and the browser popup so the
//! lifecycle components can be exercised against test doubles and so the
//! hosting shell (Tauri, web view, CLI) supplies its own window handling.

use std::sync::Arc;

use async_trait::async_trait;
use ledgerlink_domain::{
    Account, AuthUrlResponse, BankTransaction, DashboardSummary, Invoice, JwtResponse,
    LoginRequest, MessageResponse, Result, SignupRequest, SyncResource, SyncResponse,
    SyncStatusResponse, UserProfile,
};

/// Request/response boundary to the backend.
///
/// Implementations map transport failures to
/// `LinkError::RemoteUnavailable` and authentication rejections to
/// `LinkError::Unauthenticated`; callers branch on those variants rather
/// than transport details.
#[async_trait]
pub trait ConnectionGateway: Send + Sync {
    /// Authenticate with username/password credentials.
    async fn login(&self, request: &LoginRequest) -> Result<JwtResponse>;

    /// Register a new account.
    async fn signup(&self, request: &SignupRequest) -> Result<MessageResponse>;

    /// Current provider link status.
    async fn fetch_status(&self) -> Result<SyncStatusResponse>;

    /// Authorization URL for the popup handshake.
    async fn fetch_auth_url(&self) -> Result<AuthUrlResponse>;

    /// Ask the backend to refresh the provider token it holds.
    async fn refresh_token(&self) -> Result<MessageResponse>;

    /// Sever the provider link.
    async fn disconnect(&self) -> Result<()>;

    /// Trigger a backend sync of one resource.
    async fn sync_resource(&self, resource: SyncResource) -> Result<SyncResponse>;

    /// Dashboard summary (link flag, tenant, totals, resource lists).
    async fn fetch_dashboard_summary(&self) -> Result<DashboardSummary>;

    /// The authenticated user's profile, including provider token state.
    async fn fetch_user_profile(&self) -> Result<UserProfile>;

    /// Synced invoice listing.
    async fn fetch_invoices(&self) -> Result<Vec<Invoice>>;

    /// Synced account listing.
    async fn fetch_accounts(&self) -> Result<Vec<Account>>;

    /// Synced bank transaction listing.
    async fn fetch_transactions(&self) -> Result<Vec<BankTransaction>>;
}

/// Supplier of the bearer token attached to gateway requests.
///
/// The session store implements this; gateway implementations fetch the
/// token per request so a re-login is picked up without rebuilding the
/// client.
pub trait TokenSource: Send + Sync {
    /// Current bearer token, if a session exists.
    fn bearer_token(&self) -> Option<String>;
}

/// A browser window opened for the authorization handshake.
///
/// The window is under the user's control: it can be closed, navigated,
/// or killed at any moment, so both methods must tolerate a dead handle.
pub trait PopupWindow: Send + Sync {
    /// Whether the window has been closed (by the user or by us).
    fn is_closed(&self) -> bool;

    /// Close the window. Closing an already-closed window is a no-op.
    fn close(&self);
}

/// Opens popup windows on behalf of the orchestrator.
pub trait PopupDriver: Send + Sync {
    /// Open a popup at `url` with a fixed viewport.
    ///
    /// # Errors
    /// Returns `LinkError::PopupBlocked` when the browser refuses to open
    /// the window.
    fn open(&self, url: &str, width: u32, height: u32) -> Result<Arc<dyn PopupWindow>>;
}
