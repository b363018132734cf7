//! Popup handshake orchestrator
//!
//! Drives the authorization handshake: open the provider's consent page
//! in a popup, then watch for either an explicit completion message from
//! the callback page or the user closing the window. Both paths converge
//! on a single forced refresh of the connection state cache; the refresh
//! outcome, not the handshake itself, decides whether the link is up.

use std::sync::Arc;
use std::time::Duration;

use ledgerlink_domain::{constants, AuthCallbackType, CallbackEnvelope, LinkError, Result};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::connection::ConnectionStateCache;
use crate::notices::{Notice, Notifier};
use crate::ports::{ConnectionGateway, PopupDriver, PopupWindow};

/// Timing and viewport parameters for the handshake.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Interval between popup-closure checks.
    pub poll_interval: Duration,

    /// Checks before the handshake is abandoned (~30 minutes at the
    /// default interval).
    pub max_poll_cycles: u32,

    /// Delay between detecting completion and the forced state refresh,
    /// giving the backend time to finish the provider-side token exchange.
    pub grace_period: Duration,

    /// Origin the host page is served from. Callback messages posted from
    /// any other origin are ignored.
    pub host_origin: String,

    /// Popup viewport.
    pub popup_width: u32,
    pub popup_height: u32,
}

impl HandshakeConfig {
    /// Production timings with the given host origin.
    #[must_use]
    pub fn new(host_origin: impl Into<String>) -> Self {
        Self {
            poll_interval: Duration::from_secs(constants::HANDSHAKE_POLL_INTERVAL_SECS),
            max_poll_cycles: constants::HANDSHAKE_MAX_POLL_CYCLES,
            grace_period: Duration::from_millis(constants::HANDSHAKE_GRACE_PERIOD_MS),
            host_origin: host_origin.into(),
            popup_width: constants::POPUP_WIDTH,
            popup_height: constants::POPUP_HEIGHT,
        }
    }
}

/// Observable position in the handshake lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    /// No handshake in flight.
    Idle,

    /// Authorization URL requested, popup about to open.
    AwaitingPopup,

    /// Popup open; watching for completion.
    Polling,

    /// Completion detected; grace period and state refresh in progress.
    Completing,

    /// Poll budget exhausted with no completion signal.
    TimedOut,

    /// The popup could not be opened.
    PopupBlocked,
}

struct ActiveHandshake {
    cancel: CancellationToken,
    popup: Arc<dyn PopupWindow>,
    callback_tx: mpsc::UnboundedSender<CallbackEnvelope>,
    task: JoinHandle<()>,
}

/// Owns at most one handshake at a time; starting a new one supersedes
/// (cancels and cleans up) any predecessor.
pub struct HandshakeOrchestrator {
    gateway: Arc<dyn ConnectionGateway>,
    cache: Arc<ConnectionStateCache>,
    popups: Arc<dyn PopupDriver>,
    notices: Notifier,
    config: HandshakeConfig,
    active: Mutex<Option<ActiveHandshake>>,
    phase: Arc<watch::Sender<HandshakePhase>>,
}

impl HandshakeOrchestrator {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ConnectionGateway>,
        cache: Arc<ConnectionStateCache>,
        popups: Arc<dyn PopupDriver>,
        notices: Notifier,
        config: HandshakeConfig,
    ) -> Self {
        let (phase, _) = watch::channel(HandshakePhase::Idle);
        Self { gateway, cache, popups, notices, config, active: Mutex::new(None), phase: Arc::new(phase) }
    }

    /// Start a handshake: fetch the authorization URL, open the popup,
    /// and spawn the poll loop.
    ///
    /// Any handshake already in flight is superseded first.
    ///
    /// # Errors
    /// `LinkError::PopupBlocked` when the popup cannot be opened (the
    /// phase then stays `PopupBlocked` until the next attempt), or the
    /// gateway error if the authorization URL cannot be fetched.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<()> {
        self.teardown_active().await;
        self.phase.send_replace(HandshakePhase::AwaitingPopup);

        let auth = match self.gateway.fetch_auth_url().await {
            Ok(auth) => auth,
            Err(e) => {
                self.phase.send_replace(HandshakePhase::Idle);
                return Err(e);
            }
        };

        let popup = match self.popups.open(
            &auth.authorization_url,
            self.config.popup_width,
            self.config.popup_height,
        ) {
            Ok(popup) => popup,
            Err(e) => {
                warn!("Authorization popup was blocked");
                self.phase.send_replace(HandshakePhase::PopupBlocked);
                return Err(e);
            }
        };

        let (callback_tx, callback_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_poll_loop(PollLoop {
            cancel: cancel.clone(),
            popup: popup.clone(),
            callback_rx,
            cache: self.cache.clone(),
            notices: self.notices.clone(),
            phase: self.phase.clone(),
            config: self.config.clone(),
        }));

        *self.active.lock() = Some(ActiveHandshake { cancel, popup, callback_tx, task });
        self.phase.send_replace(HandshakePhase::Polling);
        info!("Handshake started; polling for completion");
        Ok(())
    }

    /// Start a handshake and await its outcome.
    ///
    /// Convenience over [`connect`](Self::connect) for callers that want
    /// one awaited result instead of subscribing to notices; the bounded
    /// poll window keeps this from waiting forever on the popup.
    ///
    /// # Errors
    /// `LinkError::HandshakeTimeout` when the poll budget lapses with no
    /// completion signal, `LinkError::RemoteUnavailable` carrying the
    /// failure message when the handshake fails, or the `connect` error.
    pub async fn connect_and_wait(&self) -> Result<()> {
        let mut notices = self.notices.subscribe();
        self.connect().await?;

        loop {
            match notices.recv().await {
                Ok(Notice::HandshakeCompleted) => return Ok(()),
                Ok(Notice::HandshakeTimedOut) => return Err(LinkError::HandshakeTimeout),
                Ok(Notice::HandshakeFailed(message)) => {
                    return Err(LinkError::RemoteUnavailable(message));
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(LinkError::Internal("notice channel closed".to_string()));
                }
            }
        }
    }

    /// Route a cross-window callback message to the handshake in flight.
    /// Messages arriving with no handshake active are dropped.
    pub fn deliver_callback(&self, envelope: CallbackEnvelope) {
        let guard = self.active.lock();
        match guard.as_ref() {
            Some(active) => {
                let _ = active.callback_tx.send(envelope);
            }
            None => debug!("Dropping callback message; no handshake in flight"),
        }
    }

    /// Cancel any handshake in flight and close its popup.
    pub async fn shutdown(&self) {
        self.teardown_active().await;
        self.phase.send_replace(HandshakePhase::Idle);
    }

    /// Current phase snapshot.
    #[must_use]
    pub fn phase(&self) -> HandshakePhase {
        *self.phase.borrow()
    }

    /// Observe phase transitions.
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<HandshakePhase> {
        self.phase.subscribe()
    }

    async fn teardown_active(&self) {
        let previous = self.active.lock().take();
        if let Some(active) = previous {
            debug!("Superseding handshake in flight");
            active.cancel.cancel();
            active.popup.close();
            if tokio::time::timeout(Duration::from_secs(5), active.task).await.is_err() {
                warn!("Handshake poll task did not stop within 5s");
            }
        }
    }
}

impl Drop for HandshakeOrchestrator {
    fn drop(&mut self) {
        if let Some(active) = self.active.lock().take() {
            active.cancel.cancel();
            active.popup.close();
        }
    }
}

struct PollLoop {
    cancel: CancellationToken,
    popup: Arc<dyn PopupWindow>,
    callback_rx: mpsc::UnboundedReceiver<CallbackEnvelope>,
    cache: Arc<ConnectionStateCache>,
    notices: Notifier,
    phase: Arc<watch::Sender<HandshakePhase>>,
    config: HandshakeConfig,
}

async fn run_poll_loop(mut ctx: PollLoop) {
    let mut cycles: u32 = 0;

    loop {
        tokio::select! {
            () = ctx.cancel.cancelled() => {
                ctx.popup.close();
                break;
            }

            envelope = ctx.callback_rx.recv() => {
                let Some(envelope) = envelope else {
                    ctx.popup.close();
                    break;
                };
                if envelope.origin != ctx.config.host_origin {
                    warn!(origin = %envelope.origin, "Ignoring callback message from foreign origin");
                    continue;
                }
                match envelope.message.kind {
                    AuthCallbackType::AuthSuccess => {
                        info!("Callback page reported success");
                        complete(&ctx).await;
                        break;
                    }
                    AuthCallbackType::AuthFailed => {
                        warn!("Callback page reported failure");
                        ctx.popup.close();
                        ctx.notices.publish(Notice::HandshakeFailed(
                            "Authorization was rejected by the provider".to_string(),
                        ));
                        ctx.phase.send_replace(HandshakePhase::Idle);
                        break;
                    }
                }
            }

            () = tokio::time::sleep(ctx.config.poll_interval) => {
                if ctx.popup.is_closed() {
                    info!("Popup closed; treating handshake as complete");
                    complete(&ctx).await;
                    break;
                }
                cycles += 1;
                if cycles >= ctx.config.max_poll_cycles {
                    warn!(cycles, "Handshake poll budget exhausted");
                    ctx.popup.close();
                    ctx.phase.send_replace(HandshakePhase::TimedOut);
                    ctx.notices.publish(Notice::HandshakeTimedOut);
                    break;
                }
            }
        }
    }
}

/// Converge on completion: wait out the grace period, then force exactly
/// one state refresh. The refresh result is the handshake verdict.
async fn complete(ctx: &PollLoop) {
    ctx.phase.send_replace(HandshakePhase::Completing);
    tokio::time::sleep(ctx.config.grace_period).await;

    match ctx.cache.get(true).await {
        Ok(state) => {
            info!(connected = state.connected, "Post-handshake state refresh done");
            ctx.notices.publish(Notice::HandshakeCompleted);
        }
        Err(e) => {
            warn!(error = %e, "Post-handshake state refresh failed");
            ctx.notices.publish(Notice::HandshakeFailed(e.to_string()));
        }
    }

    ctx.popup.close();
    ctx.phase.send_replace(HandshakePhase::Idle);
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use ledgerlink_common::storage::MemoryStore;
    use ledgerlink_domain::{AuthCallbackMessage, LinkError, LoginRequest};

    use super::*;
    use crate::session::SessionStore;
    use crate::testing::{MockGateway, MockPopupDriver};

    const ORIGIN: &str = "https://app.ledgerlink.test";

    fn fast_config() -> HandshakeConfig {
        HandshakeConfig {
            poll_interval: Duration::from_millis(10),
            max_poll_cycles: 20,
            grace_period: Duration::from_millis(5),
            host_origin: ORIGIN.to_string(),
            popup_width: 600,
            popup_height: 700,
        }
    }

    struct Fixture {
        gateway: Arc<MockGateway>,
        popups: Arc<MockPopupDriver>,
        notices: Notifier,
        orchestrator: HandshakeOrchestrator,
    }

    async fn fixture() -> Fixture {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(SessionStore::new(gateway.clone(), store.clone()));
        session
            .login(&LoginRequest { username: "finance".into(), password: "pw".into() })
            .await
            .unwrap();
        gateway.set_linked(true, Some("T1"), Some(Utc::now() + ChronoDuration::hours(1)));

        let cache = Arc::new(ConnectionStateCache::new(gateway.clone(), store, session));
        let popups = Arc::new(MockPopupDriver::new());
        let notices = Notifier::default();
        let orchestrator = HandshakeOrchestrator::new(
            gateway.clone(),
            cache,
            popups.clone(),
            notices.clone(),
            fast_config(),
        );

        Fixture { gateway, popups, notices, orchestrator }
    }

    fn success_envelope(origin: &str) -> CallbackEnvelope {
        CallbackEnvelope {
            origin: origin.to_string(),
            message: AuthCallbackMessage { kind: AuthCallbackType::AuthSuccess, code: Some("c".into()) },
        }
    }

    #[tokio::test]
    async fn test_blocked_popup_reports_and_parks() {
        let fx = fixture().await;
        fx.popups.block();

        let err = fx.orchestrator.connect().await.unwrap_err();
        assert!(matches!(err, LinkError::PopupBlocked));
        assert_eq!(fx.orchestrator.phase(), HandshakePhase::PopupBlocked);
        assert_eq!(fx.gateway.summary_calls(), 0, "no refresh on a blocked popup");
    }

    #[tokio::test]
    async fn test_user_closing_popup_completes_handshake() {
        let fx = fixture().await;
        let mut notices = fx.notices.subscribe();

        fx.orchestrator.connect().await.unwrap();
        assert_eq!(fx.orchestrator.phase(), HandshakePhase::Polling);

        fx.popups.last_window().unwrap().user_close();

        assert_eq!(notices.recv().await.unwrap(), Notice::HandshakeCompleted);
        assert_eq!(fx.gateway.summary_calls(), 1, "exactly one forced refresh");
        assert_eq!(fx.orchestrator.phase(), HandshakePhase::Idle);
    }

    #[tokio::test]
    async fn test_success_callback_completes_before_popup_close() {
        let fx = fixture().await;
        let mut notices = fx.notices.subscribe();

        fx.orchestrator.connect().await.unwrap();
        fx.orchestrator.deliver_callback(success_envelope(ORIGIN));

        assert_eq!(notices.recv().await.unwrap(), Notice::HandshakeCompleted);
        assert_eq!(fx.gateway.summary_calls(), 1);
        assert!(fx.popups.last_window().unwrap().is_closed(), "popup closed on completion");
    }

    #[tokio::test]
    async fn test_failed_callback_skips_refresh() {
        let fx = fixture().await;
        let mut notices = fx.notices.subscribe();

        fx.orchestrator.connect().await.unwrap();
        fx.orchestrator.deliver_callback(CallbackEnvelope {
            origin: ORIGIN.to_string(),
            message: AuthCallbackMessage { kind: AuthCallbackType::AuthFailed, code: None },
        });

        assert!(matches!(notices.recv().await.unwrap(), Notice::HandshakeFailed(_)));
        assert_eq!(fx.gateway.summary_calls(), 0, "no refresh after an explicit failure");
        assert_eq!(fx.orchestrator.phase(), HandshakePhase::Idle);
    }

    #[tokio::test]
    async fn test_foreign_origin_messages_are_ignored() {
        let fx = fixture().await;
        let mut notices = fx.notices.subscribe();

        fx.orchestrator.connect().await.unwrap();
        fx.orchestrator.deliver_callback(success_envelope("https://evil.example"));

        // The forged message must not complete the handshake; the genuine
        // one still does.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(fx.orchestrator.phase(), HandshakePhase::Polling);

        fx.orchestrator.deliver_callback(success_envelope(ORIGIN));
        assert_eq!(notices.recv().await.unwrap(), Notice::HandshakeCompleted);
    }

    #[tokio::test]
    async fn test_poll_budget_exhaustion_times_out() {
        let fx = fixture().await;
        let mut notices = fx.notices.subscribe();

        fx.orchestrator.connect().await.unwrap();

        assert_eq!(notices.recv().await.unwrap(), Notice::HandshakeTimedOut);
        assert_eq!(fx.orchestrator.phase(), HandshakePhase::TimedOut);
        assert!(fx.popups.last_window().unwrap().is_closed());
        assert_eq!(fx.gateway.summary_calls(), 0, "timeout leaves state untouched");
    }

    #[tokio::test]
    async fn test_connect_and_wait_times_out_as_error() {
        let fx = fixture().await;

        let err = fx.orchestrator.connect_and_wait().await.unwrap_err();
        assert!(matches!(err, LinkError::HandshakeTimeout));
        assert_eq!(fx.orchestrator.phase(), HandshakePhase::TimedOut);
    }

    #[tokio::test]
    async fn test_connect_and_wait_resolves_on_popup_close() {
        let fx = fixture().await;

        let popups = fx.popups.clone();
        tokio::spawn(async move {
            loop {
                if let Some(window) = popups.last_window() {
                    window.user_close();
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        fx.orchestrator.connect_and_wait().await.unwrap();
        assert_eq!(fx.orchestrator.phase(), HandshakePhase::Idle);
        assert_eq!(fx.gateway.summary_calls(), 1);
    }

    #[tokio::test]
    async fn test_new_connect_supersedes_previous() {
        let fx = fixture().await;

        fx.orchestrator.connect().await.unwrap();
        let first = fx.popups.last_window().unwrap();

        fx.orchestrator.connect().await.unwrap();
        let second = fx.popups.last_window().unwrap();

        assert!(first.is_closed(), "superseded popup is closed");
        assert!(!second.is_closed());
        assert_eq!(fx.popups.open_count(), 2);
        assert_eq!(fx.orchestrator.phase(), HandshakePhase::Polling);

        fx.orchestrator.shutdown().await;
        assert!(second.is_closed());
        assert_eq!(fx.orchestrator.phase(), HandshakePhase::Idle);
    }

    #[tokio::test]
    async fn test_refresh_failure_surfaces_as_handshake_failure() {
        let fx = fixture().await;
        let mut notices = fx.notices.subscribe();

        fx.orchestrator.connect().await.unwrap();
        fx.gateway.fail_remote(true);
        fx.popups.last_window().unwrap().user_close();

        assert!(matches!(notices.recv().await.unwrap(), Notice::HandshakeFailed(_)));
        assert_eq!(fx.orchestrator.phase(), HandshakePhase::Idle);
    }
}
