//! Authenticated session model

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user's identity and bearer token.
///
/// Owned exclusively by the session store. Token presence is the sole
/// definition of "logged in": a valid session always carries a non-empty
/// token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Backend subject identifier
    pub subject_id: String,

    /// Display username
    pub username: String,

    /// Bearer token attached to every gateway request
    pub token: String,

    /// Granted roles
    pub roles: HashSet<String>,

    /// Session expiry, when the backend communicates one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether this session still counts as logged in.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str) -> Session {
        Session {
            subject_id: "42".to_string(),
            username: "finance".to_string(),
            token: token.to_string(),
            roles: HashSet::from(["ROLE_USER".to_string()]),
            expires_at: None,
        }
    }

    #[test]
    fn test_token_presence_defines_logged_in() {
        assert!(session("jwt-abc").is_valid());
        assert!(!session("").is_valid());
    }

    #[test]
    fn test_session_roundtrips_through_json() {
        let original = session("jwt-abc");
        let json = serde_json::to_string(&original).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }
}
