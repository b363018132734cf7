//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for LedgerLink
///
/// Every asynchronous operation in the core resolves to either a success
/// value or one of these variants; errors are never thrown across
/// suspension boundaries uncaught. Variants carry the short, user-facing
/// message the UI surfaces directly.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum LinkError {
    /// No or invalid session token. The UI boundary reacts with a forced
    /// logout; all other errors preserve the last-known-good cached state.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Network or backend failure on a gateway call. Transient; prior
    /// cached state is left intact.
    #[error("Backend unavailable: {0}")]
    RemoteUnavailable(String),

    /// The browser refused to open the authorization popup. Terminal for
    /// that connect attempt; requires an explicit user retry.
    #[error("Popup was blocked by the browser")]
    PopupBlocked,

    /// No completion signal arrived within the handshake's bounded poll
    /// window. Informational; connection state is unchanged.
    #[error("Authorization timed out; no completion signal received")]
    HandshakeTimeout,

    /// The provider rejected the token refresh. Connection state is
    /// invalidated and the user must re-link; never retried automatically.
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Locally detected token expiry. Downgrades connectivity without
    /// destroying tenant history.
    #[error("Provider token has expired")]
    TokenExpired,

    /// A resource sync failed. Isolated per resource; the backend message
    /// is carried verbatim when available.
    #[error("Sync failed: {0}")]
    SyncFailed(String),

    /// Persistent store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bug or invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for LedgerLink operations
pub type Result<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_message() {
        let err = LinkError::SyncFailed("Xero rate limit reached".to_string());
        assert_eq!(err.to_string(), "Sync failed: Xero rate limit reached");

        let err = LinkError::RemoteUnavailable("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_serialization_is_tagged() {
        let err = LinkError::TokenRefreshFailed("invalid_grant".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "TokenRefreshFailed");
        assert_eq!(json["message"], "invalid_grant");

        let back: LinkError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_unit_variant_roundtrip() {
        let err = LinkError::PopupBlocked;
        let json = serde_json::to_string(&err).unwrap();
        let back: LinkError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
