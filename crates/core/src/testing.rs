//! Programmable test doubles for the port traits
//!
//! Compiled unconditionally so integration tests and downstream crates
//! can drive the lifecycle components without a backend or a browser.
//! Production code never constructs these.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgerlink_domain::{
    Account, AuthUrlResponse, BankTransaction, DashboardSummary, Invoice, JwtResponse, LinkError,
    LoginRequest, MessageResponse, Result, SignupRequest, SyncResource, SyncResponse,
    SyncStatusResponse, UserProfile,
};
use parking_lot::Mutex;

use crate::ports::{ConnectionGateway, PopupDriver, PopupWindow};

#[derive(Default)]
struct GatewayState {
    linked: bool,
    tenant: Option<String>,
    token_expiry: Option<DateTime<Utc>>,
    provider_token: Option<String>,
    last_sync_time: Option<DateTime<Utc>>,
    login_failure: Option<String>,
    remote_down: bool,
    refresh_rejected: bool,
    sync_failures: HashMap<SyncResource, String>,
}

/// In-memory [`ConnectionGateway`] with programmable link state and
/// failure injection, plus call counters for asserting interaction
/// counts.
#[derive(Default)]
pub struct MockGateway {
    state: Mutex<GatewayState>,
    summary_calls: AtomicUsize,
    profile_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    invoice_fetches: AtomicUsize,
    account_fetches: AtomicUsize,
    transaction_fetches: AtomicUsize,
}

impl MockGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Program the backend-side link state: dashboard flag, tenant, and
    /// token expiry. Linking also grants a provider token.
    pub fn set_linked(&self, linked: bool, tenant: Option<&str>, expiry: Option<DateTime<Utc>>) {
        let mut state = self.state.lock();
        state.linked = linked;
        state.tenant = tenant.map(str::to_string);
        state.token_expiry = expiry;
        state.provider_token = linked.then(|| "provider-token".to_string());
    }

    /// Drop the provider token while leaving the dashboard flag as-is,
    /// modelling a half-connected backend.
    pub fn clear_provider_token(&self) {
        self.state.lock().provider_token = None;
    }

    pub fn set_last_sync_time(&self, at: Option<DateTime<Utc>>) {
        self.state.lock().last_sync_time = at;
    }

    /// Make login attempts fail with the given message.
    pub fn fail_login(&self, message: &str) {
        self.state.lock().login_failure = Some(message.to_string());
    }

    /// Toggle transport failure on the state-reading and sync endpoints.
    pub fn fail_remote(&self, down: bool) {
        self.state.lock().remote_down = down;
    }

    /// Toggle rejection of token refresh requests.
    pub fn fail_refresh(&self, rejected: bool) {
        self.state.lock().refresh_rejected = rejected;
    }

    /// Make the backend report a failed sync for one resource.
    pub fn fail_sync(&self, resource: SyncResource, message: &str) {
        self.state.lock().sync_failures.insert(resource, message.to_string());
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn invoice_fetches(&self) -> usize {
        self.invoice_fetches.load(Ordering::SeqCst)
    }

    pub fn account_fetches(&self) -> usize {
        self.account_fetches.load(Ordering::SeqCst)
    }

    pub fn transaction_fetches(&self) -> usize {
        self.transaction_fetches.load(Ordering::SeqCst)
    }

    fn check_remote(&self) -> Result<()> {
        if self.state.lock().remote_down {
            Err(LinkError::RemoteUnavailable("backend offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ConnectionGateway for MockGateway {
    async fn login(&self, request: &LoginRequest) -> Result<JwtResponse> {
        if let Some(message) = self.state.lock().login_failure.clone() {
            return Err(LinkError::RemoteUnavailable(message));
        }
        Ok(JwtResponse {
            token: "test-jwt".to_string(),
            token_type: "Bearer".to_string(),
            id: 1,
            username: request.username.clone(),
            email: format!("{}@example.com", request.username),
            roles: vec!["ROLE_USER".to_string()],
        })
    }

    async fn signup(&self, _request: &SignupRequest) -> Result<MessageResponse> {
        Ok(MessageResponse { message: "User registered successfully".to_string(), last_sync_time: None })
    }

    async fn fetch_status(&self) -> Result<SyncStatusResponse> {
        self.check_remote()?;
        let state = self.state.lock();
        Ok(SyncStatusResponse {
            connected: state.linked,
            has_tenant_id: state.tenant.is_some(),
            token_expiry: state.token_expiry,
            message: if state.linked { "Connected to Xero" } else { "Not connected" }.to_string(),
        })
    }

    async fn fetch_auth_url(&self) -> Result<AuthUrlResponse> {
        self.check_remote()?;
        Ok(AuthUrlResponse {
            authorization_url: "https://provider.example/authorize?client_id=test".to_string(),
            message: "Authorization URL generated".to_string(),
        })
    }

    async fn refresh_token(&self) -> Result<MessageResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.lock().refresh_rejected {
            return Err(LinkError::TokenRefreshFailed("invalid_grant".to_string()));
        }
        Ok(MessageResponse { message: "Token refreshed".to_string(), last_sync_time: None })
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.linked = false;
        state.provider_token = None;
        state.tenant = None;
        state.token_expiry = None;
        Ok(())
    }

    async fn sync_resource(&self, resource: SyncResource) -> Result<SyncResponse> {
        self.check_remote()?;
        if let Some(message) = self.state.lock().sync_failures.get(&resource).cloned() {
            return Ok(SyncResponse { status: "error".to_string(), message });
        }
        Ok(SyncResponse {
            status: "success".to_string(),
            message: format!("{resource} synced successfully"),
        })
    }

    async fn fetch_dashboard_summary(&self) -> Result<DashboardSummary> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        self.check_remote()?;
        let state = self.state.lock();
        Ok(DashboardSummary {
            xero_connected: state.linked,
            tenant_id: state.tenant.clone(),
            last_sync_time: state.last_sync_time,
            total_invoices: 2,
            total_accounts: 1,
            total_transactions: 1,
            invoices: Vec::new(),
            accounts: Vec::new(),
            transactions: Vec::new(),
        })
    }

    async fn fetch_user_profile(&self) -> Result<UserProfile> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.check_remote()?;
        let state = self.state.lock();
        Ok(UserProfile {
            username: "finance".to_string(),
            roles: vec!["ROLE_USER".to_string()],
            xero_access_token: state.provider_token.clone(),
            xero_tenant_id: state.tenant.clone(),
            token_expiry: state.token_expiry,
        })
    }

    async fn fetch_invoices(&self) -> Result<Vec<Invoice>> {
        self.invoice_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_remote()?;
        Ok(vec![
            Invoice {
                invoice_number: "INV-0001".to_string(),
                contact_name: "Acme Ltd".to_string(),
                invoice_date: "2026-08-01".to_string(),
                due_date: "2026-08-31".to_string(),
                status: "AUTHORISED".to_string(),
                total: 1200.0,
                amount_due: 1200.0,
            },
            Invoice {
                invoice_number: "INV-0002".to_string(),
                contact_name: "Globex".to_string(),
                invoice_date: "2026-08-05".to_string(),
                due_date: "2026-09-04".to_string(),
                status: "PAID".to_string(),
                total: 450.5,
                amount_due: 0.0,
            },
        ])
    }

    async fn fetch_accounts(&self) -> Result<Vec<Account>> {
        self.account_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_remote()?;
        Ok(vec![Account {
            account_code: "200".to_string(),
            account_name: "Sales".to_string(),
            account_type: "REVENUE".to_string(),
            status: "ACTIVE".to_string(),
        }])
    }

    async fn fetch_transactions(&self) -> Result<Vec<BankTransaction>> {
        self.transaction_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_remote()?;
        Ok(vec![BankTransaction {
            transaction_type: "SPEND".to_string(),
            contact_name: "Stationery Co".to_string(),
            transaction_date: "2026-08-10".to_string(),
            amount: 89.95,
            account_code: "400".to_string(),
            description: "Office supplies".to_string(),
            status: "AUTHORISED".to_string(),
        }])
    }
}

/// Popup window whose closed flag tests flip to simulate the user.
#[derive(Default)]
pub struct MockPopupWindow {
    closed: AtomicBool,
}

impl MockPopupWindow {
    /// Simulate the user closing the window.
    pub fn user_close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl PopupWindow for MockPopupWindow {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Popup driver that records every open and can simulate a blocking
/// browser.
#[derive(Default)]
pub struct MockPopupDriver {
    blocked: AtomicBool,
    opened: Mutex<Vec<(String, Arc<MockPopupWindow>)>>,
}

impl MockPopupDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent opens fail as if blocked by the browser.
    pub fn block(&self) {
        self.blocked.store(true, Ordering::SeqCst);
    }

    /// The most recently opened window.
    #[must_use]
    pub fn last_window(&self) -> Option<Arc<MockPopupWindow>> {
        self.opened.lock().last().map(|(_, w)| w.clone())
    }

    /// URL of the most recent open.
    #[must_use]
    pub fn last_url(&self) -> Option<String> {
        self.opened.lock().last().map(|(url, _)| url.clone())
    }

    /// How many windows have been opened.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }
}

impl PopupDriver for MockPopupDriver {
    fn open(&self, url: &str, _width: u32, _height: u32) -> Result<Arc<dyn PopupWindow>> {
        if self.blocked.load(Ordering::SeqCst) {
            return Err(LinkError::PopupBlocked);
        }
        let window = Arc::new(MockPopupWindow::default());
        self.opened.lock().push((url.to_string(), window.clone()));
        Ok(window)
    }
}
