//! Persisted-session storage.
//!
//! Provides the [`StorageMedium`] trait (a synchronous key/value medium, the
//! native stand-in for browser local storage) and:
//! - [`FileStorage`] - one JSON file per key with 0600 permissions
//! - [`MemoryStorage`] - in-memory, with write-failure injection for tests
//! - [`UserStorage`] - the validating layer that loads, saves, and clears the
//!   [`StoredUser`](crate::models::StoredUser) blob

mod file;
mod memory;
mod user;

use std::sync::Arc;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use user::{UserStorage, DEFAULT_USER_KEY};

use crate::error::StorageError;

/// Trait for persisted-storage media.
///
/// All operations are synchronous and must not touch the network.
/// Implementations must be thread-safe (`Send + Sync`).
pub trait StorageMedium: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// On failure the previous value must be left untouched.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value under `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Name of this storage medium.
    fn name(&self) -> &str {
        "unknown"
    }
}

// Blanket implementation for Arc<T>
impl<T: StorageMedium + ?Sized> StorageMedium for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

// Blanket implementation for Box<T>
impl<T: StorageMedium + ?Sized> StorageMedium for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}
