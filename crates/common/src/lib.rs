//! Foundation utilities shared across LedgerLink crates.
//!
//! Deliberately small: the synchronous key-value storage abstraction the
//! whole application persists through, countdown formatting for token
//! expiry display, and tracing initialization.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod observability;
pub mod storage;
pub mod time;

pub use storage::{FileStore, JsonStoreExt, KeyValueStore, MemoryStore, StorageError};
pub use time::format_countdown;
