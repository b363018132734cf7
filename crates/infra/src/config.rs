//! Environment-driven configuration
//!
//! Everything is read from `LEDGERLINK_*` variables with local-dev
//! defaults; a `.env` file is honored when present. Invalid values fail
//! loudly as `LinkError::Config` rather than silently falling back.

use std::str::FromStr;
use std::time::Duration;

use ledgerlink_core::{ExpirySupervisorConfig, HandshakeConfig, RuntimeConfig};
use ledgerlink_domain::{constants, LinkError, Result};
use tracing::debug;
use url::Url;

const ENV_API_URL: &str = "LEDGERLINK_API_URL";
const ENV_HTTP_TIMEOUT_SECS: &str = "LEDGERLINK_HTTP_TIMEOUT_SECS";
const ENV_HOST_ORIGIN: &str = "LEDGERLINK_HOST_ORIGIN";
const ENV_POLL_INTERVAL_SECS: &str = "LEDGERLINK_POLL_INTERVAL_SECS";
const ENV_MAX_POLL_CYCLES: &str = "LEDGERLINK_MAX_POLL_CYCLES";
const ENV_GRACE_PERIOD_MS: &str = "LEDGERLINK_GRACE_PERIOD_MS";
const ENV_EXPIRY_TICK_SECS: &str = "LEDGERLINK_EXPIRY_TICK_SECS";
const ENV_REFRESH_WINDOW_SECS: &str = "LEDGERLINK_REFRESH_WINDOW_SECS";

const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HOST_ORIGIN: &str = "http://localhost:4200";

/// HTTP gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Backend base URL, without a trailing slash.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Load from the environment (and `.env`, when present).
    ///
    /// # Errors
    /// `LinkError::Config` when the base URL does not parse or the
    /// timeout is not a number.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let base_url = env_or(ENV_API_URL, DEFAULT_API_URL);
        Url::parse(&base_url)
            .map_err(|e| LinkError::Config(format!("{ENV_API_URL} is not a valid URL: {e}")))?;

        let timeout_secs = match std::env::var(ENV_HTTP_TIMEOUT_SECS) {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                LinkError::Config(format!("{ENV_HTTP_TIMEOUT_SECS} must be an integer, got {raw:?}"))
            })?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        };
        debug!(base_url = %config.base_url, timeout = ?config.timeout, "Gateway config loaded");
        Ok(config)
    }
}

/// Host-page origin accepted for handshake callback messages.
///
/// # Errors
/// `LinkError::Config` when the configured origin is not a valid URL.
pub fn host_origin_from_env() -> Result<String> {
    let _ = dotenvy::dotenv();

    let origin = env_or(ENV_HOST_ORIGIN, DEFAULT_HOST_ORIGIN);
    let parsed = Url::parse(&origin)
        .map_err(|e| LinkError::Config(format!("{ENV_HOST_ORIGIN} is not a valid URL: {e}")))?;

    // Normalize to scheme://host[:port], the form window origins take.
    Ok(parsed.origin().ascii_serialization())
}

/// Handshake and expiry timings, overridable from the environment.
///
/// # Errors
/// `LinkError::Config` when any override is not a number, or the host
/// origin is not a valid URL.
pub fn runtime_config_from_env() -> Result<RuntimeConfig> {
    let host_origin = host_origin_from_env()?;

    let handshake = HandshakeConfig {
        poll_interval: Duration::from_secs(parse_env(
            ENV_POLL_INTERVAL_SECS,
            constants::HANDSHAKE_POLL_INTERVAL_SECS,
        )?),
        max_poll_cycles: parse_env(ENV_MAX_POLL_CYCLES, constants::HANDSHAKE_MAX_POLL_CYCLES)?,
        grace_period: Duration::from_millis(parse_env(
            ENV_GRACE_PERIOD_MS,
            constants::HANDSHAKE_GRACE_PERIOD_MS,
        )?),
        host_origin,
        popup_width: constants::POPUP_WIDTH,
        popup_height: constants::POPUP_HEIGHT,
    };

    let expiry = ExpirySupervisorConfig {
        tick: Duration::from_secs(parse_env(ENV_EXPIRY_TICK_SECS, constants::EXPIRY_TICK_SECS)?),
        refresh_window_secs: parse_env(
            ENV_REFRESH_WINDOW_SECS,
            constants::TOKEN_REFRESH_WINDOW_SECS,
        )?,
    };

    Ok(RuntimeConfig { handshake, expiry })
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| LinkError::Config(format!("{key} must be a number, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}
