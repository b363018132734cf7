//! Wire DTOs exchanged with the backend
//!
//! Field names mirror the backend's JSON (camelCase). These shapes are the
//! gateway contract; everything else in the workspace works with the domain
//! types derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `GET xero/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub connected: bool,
    pub has_tenant_id: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expiry: Option<DateTime<Utc>>,
    pub message: String,
}

/// `GET xero/auth`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUrlResponse {
    pub authorization_url: String,
    pub message: String,
}

/// Generic `{ message }` response, optionally carrying a sync time
/// (`POST xero/refresh-token`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,
}

/// `POST xero/{resource}/sync`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub status: String,
    pub message: String,
}

impl SyncResponse {
    /// Whether the backend reported the sync as successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success") || self.status.eq_ignore_ascii_case("ok")
    }
}

/// Invoice listing row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_number: String,
    pub contact_name: String,
    pub invoice_date: String,
    pub due_date: String,
    pub status: String,
    pub total: f64,
    pub amount_due: f64,
}

/// Account listing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_code: String,
    pub account_name: String,
    pub account_type: String,
    pub status: String,
}

/// Bank transaction listing row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransaction {
    pub transaction_type: String,
    pub contact_name: String,
    pub transaction_date: String,
    pub amount: f64,
    pub account_code: String,
    pub description: String,
    pub status: String,
}

/// `GET dashboard/stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub xero_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_invoices: u64,
    #[serde(default)]
    pub total_accounts: u64,
    #[serde(default)]
    pub total_transactions: u64,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<BankTransaction>,
}

/// `GET user/profile`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xero_access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xero_tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expiry: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Whether the backend holds a provider access token for this user.
    #[must_use]
    pub fn has_provider_token(&self) -> bool {
        self.xero_access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// `POST auth/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `POST auth/signup`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

/// `POST auth/login` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Completion signal posted by the popup's callback page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthCallbackType {
    AuthSuccess,
    AuthFailed,
}

/// Structured message from the callback page to its opener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCallbackMessage {
    #[serde(rename = "type")]
    pub kind: AuthCallbackType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A callback message together with the origin it was posted from.
///
/// The handshake orchestrator acts only on envelopes whose origin matches
/// the host page's own origin; everything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackEnvelope {
    pub origin: String,
    pub message: AuthCallbackMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_camel_case() {
        let json = r#"{
            "connected": true,
            "hasTenantId": true,
            "tokenExpiry": "2026-01-01T00:00:00Z",
            "message": "Connected to Xero"
        }"#;
        let status: SyncStatusResponse = serde_json::from_str(json).unwrap();
        assert!(status.connected);
        assert!(status.has_tenant_id);
        assert!(status.token_expiry.is_some());
    }

    #[test]
    fn test_dashboard_summary_defaults_lists() {
        let json = r#"{ "xeroConnected": false }"#;
        let summary: DashboardSummary = serde_json::from_str(json).unwrap();
        assert!(!summary.xero_connected);
        assert!(summary.invoices.is_empty());
        assert_eq!(summary.total_invoices, 0);
    }

    #[test]
    fn test_profile_provider_token_presence() {
        let with_token: UserProfile = serde_json::from_str(
            r#"{ "username": "finance", "xeroAccessToken": "tok", "xeroTenantId": "T1" }"#,
        )
        .unwrap();
        assert!(with_token.has_provider_token());

        let empty_token: UserProfile =
            serde_json::from_str(r#"{ "username": "finance", "xeroAccessToken": "" }"#).unwrap();
        assert!(!empty_token.has_provider_token());

        let without: UserProfile = serde_json::from_str(r#"{ "username": "finance" }"#).unwrap();
        assert!(!without.has_provider_token());
    }

    #[test]
    fn test_callback_message_wire_format() {
        let json = r#"{ "type": "AUTH_SUCCESS", "code": "abc123" }"#;
        let msg: AuthCallbackMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, AuthCallbackType::AuthSuccess);
        assert_eq!(msg.code.as_deref(), Some("abc123"));

        let json = r#"{ "type": "AUTH_FAILED" }"#;
        let msg: AuthCallbackMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.kind, AuthCallbackType::AuthFailed);
        assert!(msg.code.is_none());
    }

    #[test]
    fn test_sync_response_success_detection() {
        let ok = SyncResponse { status: "SUCCESS".to_string(), message: "done".to_string() };
        assert!(ok.is_success());

        let err = SyncResponse { status: "error".to_string(), message: "boom".to_string() };
        assert!(!err.is_success());
    }

    #[test]
    fn test_jwt_response_type_field() {
        let json = r#"{
            "token": "jwt",
            "type": "Bearer",
            "id": 7,
            "username": "finance",
            "email": "finance@example.com",
            "roles": ["ROLE_USER"]
        }"#;
        let resp: JwtResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.token_type, "Bearer");
        assert_eq!(resp.id, 7);
    }
}
