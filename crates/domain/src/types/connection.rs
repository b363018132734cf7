//! Provider connection state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the third-party accounting account is linked, and with what
/// tenant, since when, expiring when.
///
/// Owned by the connection state cache and mirrored into the persistent
/// store so it survives reloads until explicitly invalidated. The state
/// never self-expires; the expiry supervisor is responsible for flipping
/// `connected` once the token expiry passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    /// Provider account is linked and usable
    pub connected: bool,

    /// Provider's identifier for the connected organisation
    pub tenant_id: Option<String>,

    /// When any resource was last synchronized
    pub last_sync_time: Option<DateTime<Utc>>,

    /// Provider token expiry. `None` while connected means the expiry is
    /// unknown and the token is treated as non-expiring.
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl ConnectionState {
    /// A state representing "not linked".
    #[must_use]
    pub fn disconnected() -> Self {
        Self { connected: false, tenant_id: None, last_sync_time: None, token_expires_at: None }
    }

    /// Seconds until the provider token expires.
    ///
    /// Negative once expiry has passed; `None` when no expiry is known.
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.token_expires_at.map(|at| (at - now).num_seconds())
    }

    /// Copy of this state with connectivity downgraded but tenant history
    /// preserved. Used when expiry is detected locally; the linked identity
    /// may still be valid pending reconnection.
    #[must_use]
    pub fn with_connectivity_lost(&self) -> Self {
        Self { connected: false, ..self.clone() }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::disconnected()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_disconnected_baseline() {
        let state = ConnectionState::disconnected();
        assert!(!state.connected);
        assert!(state.tenant_id.is_none());
        assert!(state.seconds_until_expiry(Utc::now()).is_none());
    }

    #[test]
    fn test_seconds_until_expiry_signed() {
        let now = Utc::now();
        let mut state = ConnectionState::disconnected();

        state.token_expires_at = Some(now + Duration::seconds(120));
        assert_eq!(state.seconds_until_expiry(now), Some(120));

        state.token_expires_at = Some(now - Duration::seconds(30));
        assert_eq!(state.seconds_until_expiry(now), Some(-30));
    }

    #[test]
    fn test_connectivity_lost_preserves_tenant() {
        let state = ConnectionState {
            connected: true,
            tenant_id: Some("T1".to_string()),
            last_sync_time: Some(Utc::now()),
            token_expires_at: Some(Utc::now()),
        };

        let lost = state.with_connectivity_lost();
        assert!(!lost.connected);
        assert_eq!(lost.tenant_id, state.tenant_id);
        assert_eq!(lost.last_sync_time, state.last_sync_time);
    }
}
