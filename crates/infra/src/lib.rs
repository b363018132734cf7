//! Infrastructure adapters for LedgerLink.
//!
//! Concrete implementations of the core's port traits: the `reqwest`
//! HTTP gateway and the environment-driven configuration that feeds it.
//! Popup drivers are host-shell specific and live with the embedding
//! application.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod config;
pub mod gateway;

pub use config::{host_origin_from_env, runtime_config_from_env, GatewayConfig};
pub use gateway::HttpConnectionGateway;
