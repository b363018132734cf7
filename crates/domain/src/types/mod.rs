//! Domain data model
//!
//! Split by ownership: [`session`] types belong to the session store,
//! [`connection`] to the connection state cache, [`sync`] to the sync
//! coordinator, and [`wire`] mirrors the backend's JSON shapes.

pub mod connection;
pub mod session;
pub mod sync;
pub mod wire;
