//! File-based storage medium.

use std::path::{Path, PathBuf};
use tracing::instrument;

use super::StorageMedium;
use crate::error::StorageError;

/// File permissions for stored values (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Directory permissions (Unix only): owner read/write/execute.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// File-based storage medium.
///
/// Stores each key as its own file in a configurable directory:
/// `{dir}/{key}.json`. Writes go to a temp file that is renamed over the
/// target, so a failed write never clobbers the previous value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create storage at the default path: `{data_local_dir}/buddy`.
    pub fn default_dir() -> Option<Self> {
        dirs::data_local_dir().map(|d| Self::new(d.join("buddy")))
    }

    /// Get the directory where values are stored.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::Io("Storage key cannot be empty".to_string()));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StorageError::Io(format!(
                "Invalid storage key '{}': contains invalid characters",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if self.dir.exists() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| StorageError::WriteFailed {
            message: format!(
                "Failed to create storage directory '{}': {}",
                self.dir.display(),
                e
            ),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(DIR_MODE);
            std::fs::set_permissions(&self.dir, perms).map_err(|e| {
                StorageError::WriteFailed {
                    message: format!(
                        "Failed to set directory permissions on '{}': {}",
                        self.dir.display(),
                        e
                    ),
                }
            })?;
        }
        Ok(())
    }

    fn write_temp(&self, temp_path: &Path, value: &str) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(FILE_MODE)
                .open(temp_path)?;
            file.write_all(value.as_bytes())?;
            return file.sync_all();
        }

        #[cfg(not(unix))]
        {
            return std::fs::write(temp_path, value);
        }
    }
}

impl StorageMedium for FileStorage {
    #[instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(format!(
                "Failed to read '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    #[instrument(skip(self, value))]
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        self.ensure_dir()?;

        let temp_path = path.with_extension("tmp");
        if let Err(e) = self.write_temp(&temp_path, value) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(StorageError::WriteFailed {
                message: format!("Failed to write '{}': {}", temp_path.display(), e),
            });
        }

        if let Err(e) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(StorageError::WriteFailed {
                message: format!(
                    "Failed to rename '{}' to '{}': {}",
                    temp_path.display(),
                    path.display(),
                    e
                ),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(format!(
                "Failed to remove '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert!(storage.get("buddy_user").unwrap().is_none());

        storage.set("buddy_user", r#"{"profiles":[]}"#).unwrap();
        assert_eq!(
            storage.get("buddy_user").unwrap().as_deref(),
            Some(r#"{"profiles":[]}"#)
        );

        storage.remove("buddy_user").unwrap();
        assert!(storage.get("buddy_user").unwrap().is_none());
        // Removing twice is fine.
        storage.remove("buddy_user").unwrap();
    }

    #[test]
    fn test_file_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.get("../etc/passwd").is_err());
        assert!(storage.set("a/b", "x").is_err());
        assert!(storage.get("").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.set("buddy_user", "{}").unwrap();

        let meta = std::fs::metadata(dir.path().join("buddy_user.json")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_blank_file_reads_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("buddy_user.json"), "  \n").unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.get("buddy_user").unwrap().is_none());
    }
}
