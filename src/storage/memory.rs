//! In-memory storage medium.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::instrument;

use super::StorageMedium;
use crate::error::StorageError;

/// In-memory storage medium.
///
/// Clone shares the underlying map. Writes can be made to fail on demand to
/// simulate a full or disabled medium.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    /// Create a new empty MemoryStorage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a MemoryStorage holding `value` under `key`.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let storage = Self::new();
        storage.inner.write().insert(key.into(), value.into());
        storage
    }

    /// Make every subsequent `set` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw value under `key`, bypassing the trait.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl StorageMedium for MemoryStorage {
    #[instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.read().get(key).cloned())
    }

    #[instrument(skip(self, value))]
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed {
                message: "quota exceeded".to_string(),
            });
        }
        self.inner.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.write().remove(key);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_new_is_empty() {
        let storage = MemoryStorage::new();
        assert!(storage.get("buddy_user").unwrap().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_memory_failed_write_keeps_previous_value() {
        let storage = MemoryStorage::with_value("buddy_user", "old");
        storage.set_fail_writes(true);
        assert!(matches!(
            storage.set("buddy_user", "new"),
            Err(StorageError::WriteFailed { .. })
        ));
        assert_eq!(storage.raw("buddy_user").as_deref(), Some("old"));

        storage.set_fail_writes(false);
        storage.set("buddy_user", "new").unwrap();
        assert_eq!(storage.raw("buddy_user").as_deref(), Some("new"));
    }

    #[test]
    fn test_memory_clone_shares_state() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.set("k", "v").unwrap();
        assert_eq!(other.raw("k").as_deref(), Some("v"));
        other.remove("k").unwrap();
        assert_eq!(storage.len(), 0);
    }
}
