//! Durable storage for uploaded and derived media files

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Cannot create storage root {path}: {source}")]
    CreateRoot {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot persist {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Flat directory of artifacts named by fresh UUIDs
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StorageError::CreateRoot {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Move a file into the store under a new `<uuid>.<ext>` name
    ///
    /// The source is removed whether or not persisting succeeds; a failed
    /// removal is logged and does not fail the call.
    pub async fn persist(&self, source: &Path) -> Result<PathBuf, StorageError> {
        let name = match source.extension() {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_string_lossy()),
            None => Uuid::new_v4().to_string(),
        };
        let destination = self.root.join(name);

        let result = match tokio::fs::rename(source, &destination).await {
            Ok(()) => Ok(destination),
            Err(rename_err) => {
                // Scratch and storage may sit on different filesystems
                debug!(error = %rename_err, "Rename failed, falling back to copy");
                match copy_or_clean(source, &destination).await {
                    Ok(()) => Ok(destination),
                    Err(source_err) => Err(StorageError::Persist {
                        path: source.display().to_string(),
                        source: source_err,
                    }),
                }
            }
        };

        if tokio::fs::try_exists(source).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::remove_file(source).await {
                warn!(path = %source.display(), error = %e, "Failed to delete scratch file");
            }
        }

        result
    }
}

/// Copy `source` to `destination`, removing any partial destination on failure
async fn copy_or_clean(source: &Path, destination: &Path) -> std::io::Result<()> {
    match tokio::fs::copy(source, destination).await {
        Ok(_) => Ok(()),
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(destination).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        path = %destination.display(),
                        error = %remove_err,
                        "Failed to delete partial copy"
                    );
                }
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_persist_moves_file_and_keeps_extension() {
        let scratch = tempfile::tempdir().unwrap();
        let storage = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(storage.path().join("videos")).unwrap();

        let source = scratch.path().join("converted.mp4");
        std::fs::write(&source, b"mp4 bytes").unwrap();

        let stored = store.persist(&source).await.unwrap();

        assert!(!source.exists());
        assert_eq!(stored.extension().unwrap(), "mp4");
        assert!(stored.starts_with(store.root()));
        assert_eq!(std::fs::read(&stored).unwrap(), b"mp4 bytes");
    }

    #[tokio::test]
    async fn test_persist_missing_source_fails() {
        let storage = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(storage.path()).unwrap();

        let result = store.persist(&storage.path().join("absent.mp4")).await;
        assert!(matches!(result, Err(StorageError::Persist { .. })));
    }

    #[tokio::test]
    async fn test_two_persists_get_distinct_names() {
        let scratch = tempfile::tempdir().unwrap();
        let storage = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(storage.path()).unwrap();

        let a = scratch.path().join("a.mp4");
        let b = scratch.path().join("b.mp4");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let first = store.persist(&a).await.unwrap();
        let second = store.persist(&b).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_no_destination() {
        let storage = tempfile::tempdir().unwrap();
        let destination = storage.path().join("partial.mp4");
        std::fs::write(&destination, b"half written").unwrap();

        let result = copy_or_clean(&storage.path().join("absent.mp4"), &destination).await;

        assert!(result.is_err());
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_copy_writes_destination() {
        let scratch = tempfile::tempdir().unwrap();
        let source = scratch.path().join("converted.mp4");
        let destination = scratch.path().join("stored.mp4");
        std::fs::write(&source, b"mp4 bytes").unwrap();

        copy_or_clean(&source, &destination).await.unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"mp4 bytes");
    }
}
