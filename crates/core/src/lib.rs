//! Connection and session lifecycle core for LedgerLink.
//!
//! Coordinates the popup-based OAuth handshake with the accounting
//! provider, the cached view of connection state shared across the UI,
//! proactive token refresh, and the resource sync pipeline. External
//! effects (HTTP, popup windows) enter through the port traits in
//! [`ports`]; persistence goes through `ledgerlink_common::storage`.
//!
//! Component map:
//! - [`session::SessionStore`] — authenticated user identity and bearer
//!   token; logout purges every session-scoped key.
//! - [`connection::ConnectionStateCache`] — single source of truth for
//!   "is the provider linked", persisted and observable.
//! - [`handshake::HandshakeOrchestrator`] — drives the popup handshake
//!   state machine.
//! - [`expiry::ExpirySupervisor`] — recurring expiry watch and proactive
//!   token refresh.
//! - [`sync::SyncCoordinator`] — invokes resource syncs and maintains
//!   per-resource timestamps and listing caches.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod connection;
pub mod expiry;
pub mod handshake;
pub mod notices;
pub mod ports;
pub mod runtime;
pub mod session;
pub mod sync;
pub mod testing;

pub use connection::ConnectionStateCache;
pub use expiry::{ExpirySupervisor, ExpirySupervisorConfig, SupervisorError};
pub use handshake::{HandshakeConfig, HandshakeOrchestrator, HandshakePhase};
pub use notices::{Notice, Notifier};
pub use ports::{ConnectionGateway, PopupDriver, PopupWindow, TokenSource};
pub use runtime::{ConnectionRuntime, RuntimeConfig};
pub use session::SessionStore;
pub use sync::SyncCoordinator;
