//! Validating storage for the persisted [`StoredUser`].

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::StorageMedium;
use crate::error::StorageError;
use crate::models::StoredUser;

/// Key the user blob is stored under.
pub const DEFAULT_USER_KEY: &str = "buddy_user";

/// Loads, saves, and clears the persisted user, validating on every load.
///
/// Anything that fails to parse or validate is erased on the spot and
/// reported as a [`StorageError`]; a corrupt blob never survives a load.
/// Without a medium (headless use, storage disabled) loads report nothing
/// stored and saves fail with [`StorageError::Unavailable`].
#[derive(Clone)]
pub struct UserStorage {
    medium: Option<Arc<dyn StorageMedium>>,
    key: String,
}

impl UserStorage {
    pub fn new(medium: Arc<dyn StorageMedium>) -> Self {
        Self {
            medium: Some(medium),
            key: DEFAULT_USER_KEY.to_string(),
        }
    }

    /// Storage with no medium behind it.
    pub fn unavailable() -> Self {
        Self {
            medium: None,
            key: DEFAULT_USER_KEY.to_string(),
        }
    }

    /// Use a different storage key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn is_available(&self) -> bool {
        self.medium.is_some()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the persisted user.
    ///
    /// `Ok(None)` when nothing is stored or no medium is available.
    pub fn load(&self) -> Result<Option<StoredUser>, StorageError> {
        let Some(medium) = &self.medium else {
            return Ok(None);
        };

        let raw = match medium.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read stored user, clearing");
                self.erase(medium.as_ref());
                return Err(e);
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Stored user is not valid JSON, clearing");
                self.erase(medium.as_ref());
                return Err(StorageError::Unreadable);
            }
        };

        match validate_blob(value) {
            Ok(user) => Ok(Some(user)),
            Err(reason) => {
                warn!(key = %self.key, %reason, "Stored user failed validation, clearing");
                self.erase(medium.as_ref());
                Err(StorageError::Invalid { reason })
            }
        }
    }

    /// Persist the user. On failure the previously stored blob is untouched.
    pub fn save(&self, user: &StoredUser) -> Result<(), StorageError> {
        let medium = self.medium.as_ref().ok_or(StorageError::Unavailable)?;
        let content = serde_json::to_string(user).map_err(|e| StorageError::WriteFailed {
            message: e.to_string(),
        })?;
        medium.set(&self.key, &content).map_err(|e| match e {
            StorageError::WriteFailed { .. } => e,
            other => StorageError::WriteFailed {
                message: other.to_string(),
            },
        })?;
        debug!(key = %self.key, medium = medium.name(), "Stored user saved");
        Ok(())
    }

    /// Remove the persisted user. Failures are logged and swallowed.
    pub fn clear(&self) {
        if let Some(medium) = &self.medium {
            self.erase(medium.as_ref());
        }
    }

    fn erase(&self, medium: &dyn StorageMedium) {
        if let Err(e) = medium.remove(&self.key) {
            debug!(key = %self.key, error = %e, "Failed to remove stored user");
        }
    }
}

impl std::fmt::Debug for UserStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStorage")
            .field("medium", &self.medium.as_ref().map(|m| m.name().to_string()))
            .field("key", &self.key)
            .finish()
    }
}

/// Check the blob's shape and convert it.
///
/// serde alone would accept sequence-encoded structs (`[[...]]`), so the
/// object shape is checked explicitly before deserializing.
fn validate_blob(value: Value) -> Result<StoredUser, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "stored user is not an object".to_string())?;
    let profiles = obj
        .get("profiles")
        .ok_or_else(|| "missing profiles".to_string())?
        .as_array()
        .ok_or_else(|| "profiles is not an array".to_string())?;
    if let Some(index) = profiles.iter().position(|p| !p.is_object()) {
        return Err(format!("profiles[{index}] is not an object"));
    }

    let user: StoredUser = serde_json::from_value(value).map_err(|e| e.to_string())?;
    user.validate()?;
    Ok(user)
}
