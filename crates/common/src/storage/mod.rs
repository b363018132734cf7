//! Persistent key-value storage
//!
//! A narrow repository interface over durable, synchronous, string-keyed
//! storage. Values are stored as strings (JSON for structured data via
//! [`JsonStoreExt`]), so alternate backing stores can be substituted
//! without touching the code that persists through them: [`FileStore`] for
//! production, [`MemoryStore`] for tests.

mod file;
mod memory;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded or decoded
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Durable, synchronous, string-keyed storage.
///
/// Implementations must be thread-safe; every write is visible to
/// subsequent reads from any thread.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw string stored under `key`.
    fn get_raw(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_raw(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Whether `key` currently holds a value.
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get_raw(key)?.is_some())
    }
}

/// JSON encode/decode helpers over any [`KeyValueStore`].
pub trait JsonStoreExt {
    /// Read and decode the JSON value stored under `key`.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>>;

    /// Encode `value` as JSON and store it under `key`.
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()>;
}

impl<S: KeyValueStore + ?Sized> JsonStoreExt for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw)
    }
}
