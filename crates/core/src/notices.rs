//! User-facing notices from background tasks
//!
//! The handshake poller and expiry supervisor run detached from any
//! caller, so their outcomes are surfaced through a broadcast channel the
//! UI subscribes to. Foreground operations report through their return
//! values instead.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Short, actionable event for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum Notice {
    /// Handshake finished and the connection state was refreshed.
    HandshakeCompleted,

    /// Handshake reported failure, or the post-handshake refresh failed.
    HandshakeFailed(String),

    /// No completion signal within the poll window; state unchanged.
    HandshakeTimedOut,

    /// Proactive token refresh was rejected; the user must reconnect.
    TokenRefreshFailed(String),

    /// Token expiry passed; connectivity downgraded locally.
    TokenExpired,
}

/// Fan-out sender for [`Notice`] values.
///
/// Cheap to clone; subscribers that lag simply miss older notices.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    /// Create a notifier with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to subsequent notices.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish a notice. Dropped silently when nobody is listening.
    pub fn publish(&self, notice: Notice) {
        debug!(?notice, "Publishing notice");
        let _ = self.tx.send(notice);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_notices() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.publish(Notice::TokenExpired);
        assert_eq!(rx.recv().await.unwrap(), Notice::TokenExpired);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let notifier = Notifier::default();
        notifier.publish(Notice::HandshakeTimedOut);
    }

    #[tokio::test]
    async fn test_each_subscriber_sees_every_notice() {
        let notifier = Notifier::default();
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        notifier.publish(Notice::HandshakeCompleted);
        notifier.publish(Notice::TokenRefreshFailed("invalid_grant".to_string()));

        assert_eq!(a.recv().await.unwrap(), Notice::HandshakeCompleted);
        assert_eq!(b.recv().await.unwrap(), Notice::HandshakeCompleted);
        assert!(matches!(a.recv().await.unwrap(), Notice::TokenRefreshFailed(_)));
        assert!(matches!(b.recv().await.unwrap(), Notice::TokenRefreshFailed(_)));
    }
}
