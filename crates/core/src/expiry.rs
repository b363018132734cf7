//! Token expiry supervisor
//!
//! A recurring background check over the cached connection state. Inside
//! the refresh window it asks the backend to refresh the provider token
//! (once per window crossing); past expiry it downgrades connectivity
//! locally (once per expired period). The supervisor never calls the
//! provider directly; the backend owns the tokens.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ledgerlink_common::time::format_countdown;
use ledgerlink_domain::constants;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::connection::ConnectionStateCache;
use crate::notices::{Notice, Notifier};
use crate::ports::ConnectionGateway;
use crate::session::SessionStore;

/// Supervisor lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Expiry supervisor is already running")]
    AlreadyRunning,

    #[error("Expiry supervisor is not running")]
    NotRunning,
}

/// Timing parameters for the supervisor.
#[derive(Debug, Clone)]
pub struct ExpirySupervisorConfig {
    /// Interval between checks.
    pub tick: Duration,

    /// A refresh is attempted once the token is within this many seconds
    /// of expiry.
    pub refresh_window_secs: i64,
}

impl Default for ExpirySupervisorConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(constants::EXPIRY_TICK_SECS),
            refresh_window_secs: constants::TOKEN_REFRESH_WINDOW_SECS,
        }
    }
}

/// Watches the cached token expiry and keeps the link alive.
pub struct ExpirySupervisor {
    gateway: Arc<dyn ConnectionGateway>,
    session: Arc<SessionStore>,
    cache: Arc<ConnectionStateCache>,
    notices: Notifier,
    config: ExpirySupervisorConfig,
    cancel: Mutex<Option<CancellationToken>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ExpirySupervisor {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ConnectionGateway>,
        session: Arc<SessionStore>,
        cache: Arc<ConnectionStateCache>,
        notices: Notifier,
        config: ExpirySupervisorConfig,
    ) -> Self {
        Self {
            gateway,
            session,
            cache,
            notices,
            config,
            cancel: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    /// Start the recurring check.
    ///
    /// # Errors
    /// `SupervisorError::AlreadyRunning` when already started.
    #[instrument(skip(self))]
    pub fn start(&self) -> Result<(), SupervisorError> {
        let mut cancel_guard = self.cancel.lock();
        if cancel_guard.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        let task = SupervisorLoop {
            gateway: self.gateway.clone(),
            session: self.session.clone(),
            cache: self.cache.clone(),
            notices: self.notices.clone(),
            config: self.config.clone(),
            cancel: token.clone(),
        };
        *self.handle.lock() = Some(tokio::spawn(task.run()));
        *cancel_guard = Some(token);

        info!(tick = ?self.config.tick, "Expiry supervisor started");
        Ok(())
    }

    /// Stop the recurring check and wait for the loop to exit.
    ///
    /// # Errors
    /// `SupervisorError::NotRunning` when not started.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<(), SupervisorError> {
        let token = self.cancel.lock().take().ok_or(SupervisorError::NotRunning)?;
        token.cancel();

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
                warn!("Expiry supervisor loop did not stop within 5s");
            }
        }

        info!("Expiry supervisor stopped");
        Ok(())
    }

    /// Whether the recurring check is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.cancel.lock().is_some()
    }

    /// Human-readable countdown to token expiry ("04m32s", "Expired", or
    /// empty when no expiry is known).
    #[must_use]
    pub fn time_until_expiry(&self) -> String {
        format_countdown(self.cache.token_expires_at(), Utc::now())
    }
}

struct SupervisorLoop {
    gateway: Arc<dyn ConnectionGateway>,
    session: Arc<SessionStore>,
    cache: Arc<ConnectionStateCache>,
    notices: Notifier,
    config: ExpirySupervisorConfig,
    cancel: CancellationToken,
}

impl SupervisorLoop {
    async fn run(mut self) {
        // Edge latches: one refresh attempt per window crossing, one
        // downgrade per expired period. Both reset when the state turns
        // healthy again.
        let mut refresh_attempted = false;
        let mut expiry_handled = false;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.tick) => {}
            }

            if !self.session.is_logged_in() {
                refresh_attempted = false;
                expiry_handled = false;
                continue;
            }

            let Some(state) = self.cache.current() else { continue };
            if !state.connected {
                // Nothing to keep alive; a stale expiry on a severed link
                // must not trigger refreshes or expiry notices.
                refresh_attempted = false;
                expiry_handled = false;
                continue;
            }
            let Some(remaining) = state.seconds_until_expiry(Utc::now()) else {
                // No known expiry: non-expiring token, nothing to supervise.
                refresh_attempted = false;
                expiry_handled = false;
                continue;
            };

            if remaining <= 0 {
                if !expiry_handled {
                    expiry_handled = true;
                    warn!(remaining, "Provider token expired; downgrading connectivity");
                    self.cache.publish(state.with_connectivity_lost());
                    self.notices.publish(Notice::TokenExpired);
                }
            } else if remaining < self.config.refresh_window_secs {
                expiry_handled = false;
                if !refresh_attempted {
                    refresh_attempted = true;
                    self.attempt_refresh(remaining).await;
                }
            } else {
                refresh_attempted = false;
                expiry_handled = false;
            }
        }
    }

    async fn attempt_refresh(&mut self, remaining: i64) {
        info!(remaining, "Token inside refresh window; requesting refresh");
        match self.gateway.refresh_token().await {
            Ok(_) => {
                // Forced fetch picks up the new expiry; a healthy expiry
                // then resets the latch on the next tick.
                if let Err(e) = self.cache.get(true).await {
                    warn!(error = %e, "State refresh after token refresh failed");
                } else {
                    debug!("Token refreshed and state re-fetched");
                }
            }
            Err(e) => {
                warn!(error = %e, "Token refresh rejected; invalidating cached state");
                self.cache.invalidate();
                self.notices.publish(Notice::TokenRefreshFailed(e.to_string()));
            }
        }
    }
}
