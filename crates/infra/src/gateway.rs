//! HTTP implementation of the connection gateway
//!
//! Thin `reqwest` adapter over the backend's REST surface. Error mapping
//! is the contract here: transport failures become `RemoteUnavailable`,
//! 401/403 becomes `Unauthenticated`, and failed syncs carry the
//! backend's message verbatim.

use std::sync::Arc;

use async_trait::async_trait;
use ledgerlink_core::ports::{ConnectionGateway, TokenSource};
use ledgerlink_domain::{
    Account, AuthUrlResponse, BankTransaction, DashboardSummary, Invoice, JwtResponse, LinkError,
    LoginRequest, MessageResponse, Result, SignupRequest, SyncResource, SyncResponse,
    SyncStatusResponse, UserProfile,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::GatewayConfig;

/// `reqwest`-backed [`ConnectionGateway`].
pub struct HttpConnectionGateway {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl HttpConnectionGateway {
    /// Build a gateway from config. The bearer token is pulled from
    /// `tokens` per request, so a re-login needs no rebuild.
    ///
    /// # Errors
    /// `LinkError::Config` when the HTTP client cannot be constructed.
    pub fn new(config: &GatewayConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LinkError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url: config.base_url.clone(), tokens })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.tokens.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| LinkError::RemoteUnavailable(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(status = %response.status(), "Backend rejected credentials");
                Err(LinkError::Unauthenticated)
            }
            _ => Ok(response),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LinkError::RemoteUnavailable(error_message(response).await));
        }
        response.json::<T>().await.map_err(|e| {
            LinkError::RemoteUnavailable(format!("malformed response body: {e}"))
        })
    }
}

/// Best-effort extraction of the backend's `{ "message": ... }` body;
/// falls back to the HTTP status line.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[async_trait]
impl ConnectionGateway for HttpConnectionGateway {
    async fn login(&self, request: &LoginRequest) -> Result<JwtResponse> {
        debug!(username = %request.username, "POST /auth/login");
        self.send_json(self.client.post(self.url("/auth/login")).json(request)).await
    }

    async fn signup(&self, request: &SignupRequest) -> Result<MessageResponse> {
        self.send_json(self.client.post(self.url("/auth/signup")).json(request)).await
    }

    async fn fetch_status(&self) -> Result<SyncStatusResponse> {
        self.send_json(self.client.get(self.url("/xero/status"))).await
    }

    async fn fetch_auth_url(&self) -> Result<AuthUrlResponse> {
        self.send_json(self.client.get(self.url("/xero/auth"))).await
    }

    async fn refresh_token(&self) -> Result<MessageResponse> {
        let response = self.send(self.client.post(self.url("/xero/refresh-token"))).await?;
        if !response.status().is_success() {
            // Refresh rejections are terminal for the link, not transient.
            return Err(LinkError::TokenRefreshFailed(error_message(response).await));
        }
        response
            .json()
            .await
            .map_err(|e| LinkError::RemoteUnavailable(format!("malformed response body: {e}")))
    }

    async fn disconnect(&self) -> Result<()> {
        let response = self.send(self.client.post(self.url("/xero/disconnect"))).await?;
        if !response.status().is_success() {
            return Err(LinkError::RemoteUnavailable(error_message(response).await));
        }
        Ok(())
    }

    async fn sync_resource(&self, resource: SyncResource) -> Result<SyncResponse> {
        let path = format!("/xero/{resource}/sync");
        debug!(%resource, "POST {path}");
        let response = self.send(self.client.post(self.url(&path))).await?;
        if !response.status().is_success() {
            // The coordinator surfaces backend sync failures verbatim.
            return Err(LinkError::SyncFailed(error_message(response).await));
        }
        response
            .json()
            .await
            .map_err(|e| LinkError::RemoteUnavailable(format!("malformed response body: {e}")))
    }

    async fn fetch_dashboard_summary(&self) -> Result<DashboardSummary> {
        self.send_json(self.client.get(self.url("/dashboard/stats"))).await
    }

    async fn fetch_user_profile(&self) -> Result<UserProfile> {
        self.send_json(self.client.get(self.url("/user/profile"))).await
    }

    async fn fetch_invoices(&self) -> Result<Vec<Invoice>> {
        self.send_json(self.client.get(self.url("/xero/invoices"))).await
    }

    async fn fetch_accounts(&self) -> Result<Vec<Account>> {
        self.send_json(self.client.get(self.url("/xero/accounts"))).await
    }

    async fn fetch_transactions(&self) -> Result<Vec<BankTransaction>> {
        self.send_json(self.client.get(self.url("/xero/transactions"))).await
    }
}
