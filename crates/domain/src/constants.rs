//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Persistent store keys. Everything session- or connection-scoped lives
// under the `ledgerlink.` namespace and is removed together on logout.
pub const KEY_SESSION: &str = "ledgerlink.session";
pub const KEY_CONNECTION_STATE: &str = "ledgerlink.connection.state";
pub const KEY_SYNC_TIMESTAMPS: &str = "ledgerlink.sync.timestamps";
pub const KEY_INVOICES_CACHE: &str = "ledgerlink.cache.invoices";
pub const KEY_ACCOUNTS_CACHE: &str = "ledgerlink.cache.accounts";
pub const KEY_TRANSACTIONS_CACHE: &str = "ledgerlink.cache.transactions";

// Handshake timing. The poller checks popup closure every
// `HANDSHAKE_POLL_INTERVAL_SECS` and gives up after `HANDSHAKE_MAX_POLL_CYCLES`
// checks (~30 minutes). The grace period lets the backend finish the
// provider-side token exchange before the forced state refresh.
pub const HANDSHAKE_POLL_INTERVAL_SECS: u64 = 3;
pub const HANDSHAKE_MAX_POLL_CYCLES: u32 = 600;
pub const HANDSHAKE_GRACE_PERIOD_MS: u64 = 2500;

// Authorization popup viewport
pub const POPUP_WIDTH: u32 = 600;
pub const POPUP_HEIGHT: u32 = 700;

// Expiry supervision. One tick per minute; a refresh is attempted once the
// token is within `TOKEN_REFRESH_WINDOW_SECS` of expiry.
pub const EXPIRY_TICK_SECS: u64 = 60;
pub const TOKEN_REFRESH_WINDOW_SECS: i64 = 300;

/// All keys purged together on logout or disconnect.
pub const SESSION_SCOPED_KEYS: &[&str] = &[
    KEY_SESSION,
    KEY_CONNECTION_STATE,
    KEY_SYNC_TIMESTAMPS,
    KEY_INVOICES_CACHE,
    KEY_ACCOUNTS_CACHE,
    KEY_TRANSACTIONS_CACHE,
];
