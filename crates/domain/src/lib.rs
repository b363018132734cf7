//! Shared domain types for LedgerLink crates.
//!
//! Holds the data model owned by the connection lifecycle (sessions,
//! connection state, sync bookkeeping), the wire DTOs exchanged with the
//! backend, the error taxonomy, and application constants. No I/O lives
//! here; higher crates depend on these types without pulling in runtime
//! dependencies.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod constants;
pub mod errors;
pub mod types;

pub use errors::{LinkError, Result};
pub use types::connection::ConnectionState;
pub use types::session::Session;
pub use types::sync::{
    SyncAllReport, SyncAllStatus, SyncOutcome, SyncResource, SyncResult, SyncTimestamps,
};
pub use types::wire::{
    Account, AuthCallbackMessage, AuthCallbackType, AuthUrlResponse, BankTransaction,
    CallbackEnvelope, DashboardSummary, Invoice, JwtResponse, LoginRequest, MessageResponse,
    SignupRequest, SyncResponse, SyncStatusResponse, UserProfile,
};
