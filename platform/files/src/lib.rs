//! Avatar file storage.
//!
//! The roster service only ever sees opaque references (for the local store,
//! `/uploads/<file>` paths that the HTTP layer serves back verbatim).

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

/// Public URL prefix under which stored files are served.
pub const DEFAULT_PUBLIC_PREFIX: &str = "/uploads";

const NAME_ATTEMPTS: usize = 5;
const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid file extension {0:?}")]
    InvalidExtension(String),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not allocate a unique file name")]
    NameCollision,
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persists `bytes` under a fresh unique name and returns its reference.
    async fn store(&self, bytes: &[u8], extension: &str) -> StorageResult<String>;

    /// Removes the file behind `reference`. Returns `false` when there was
    /// nothing to delete.
    async fn delete(&self, reference: &str) -> StorageResult<bool>;
}

/// Stores files in a single local directory.
#[derive(Clone, Debug)]
pub struct LocalFileStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_prefix(root, DEFAULT_PUBLIC_PREFIX)
    }

    pub fn with_prefix(root: impl Into<PathBuf>, public_prefix: &str) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Creates the backing directory if it does not exist yet.
    pub async fn ensure_ready(&self) -> StorageResult<()> {
        if fs::try_exists(&self.root).await.unwrap_or(false) {
            return Ok(());
        }
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::Io {
                path: self.root.clone(),
                source,
            })?;
        info!(path = %self.root.display(), "created uploads directory");
        Ok(())
    }

    /// Maps a reference back to a path inside the root, or `None` when the
    /// reference does not belong to this store.
    pub fn path_for(&self, reference: &str) -> Option<PathBuf> {
        let name = reference
            .split('?')
            .next()?
            .strip_prefix(&self.public_prefix)?
            .strip_prefix('/')?;
        if !is_plain_file_name(name) {
            return None;
        }
        Some(self.root.join(name))
    }

    fn reference_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix, file_name)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, bytes: &[u8], extension: &str) -> StorageResult<String> {
        let extension = normalize_extension(extension)?;
        for _ in 0..NAME_ATTEMPTS {
            let file_name = unique_file_name(&extension);
            let path = self.root.join(&file_name);
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(StorageError::Io { path, source }),
            };
            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;
            if let Err(source) = written {
                let _ = fs::remove_file(&path).await;
                return Err(StorageError::Io { path, source });
            }
            debug!(file = %file_name, size = bytes.len(), "stored file");
            return Ok(self.reference_for(&file_name));
        }
        Err(StorageError::NameCollision)
    }

    async fn delete(&self, reference: &str) -> StorageResult<bool> {
        let Some(path) = self.path_for(reference) else {
            debug!(reference, "reference is not managed by this store");
            return Ok(false);
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "deleted file");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

fn normalize_extension(raw: &str) -> StorageResult<String> {
    let ext = raw.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(StorageError::InvalidExtension(raw.to_string()));
    }
    Ok(ext)
}

fn unique_file_name(extension: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("avatar-{millis}-{suffix}.{extension}")
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> LocalFileStore {
        let dir = std::env::temp_dir().join(format!("roster-files-{}", uuid::Uuid::new_v4()));
        LocalFileStore::new(dir)
    }

    #[tokio::test]
    async fn ensure_ready_creates_missing_directory() {
        let store = temp_store();
        assert!(!store.root().exists());
        store.ensure_ready().await.unwrap();
        assert!(store.root().is_dir());
        store.ensure_ready().await.unwrap();
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn store_writes_unique_files_under_prefix() {
        let store = temp_store();
        store.ensure_ready().await.unwrap();

        let first = store.store(b"one", ".PNG").await.unwrap();
        let second = store.store(b"two", "png").await.unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("/uploads/avatar-"));
        assert!(first.ends_with(".png"));

        let path = store.path_for(&first).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"one");
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_file_was_removed() {
        let store = temp_store();
        store.ensure_ready().await.unwrap();
        let reference = store.store(b"img", "gif").await.unwrap();

        assert!(store.delete(&reference).await.unwrap());
        assert!(!store.path_for(&reference).unwrap().exists());
        assert!(!store.delete(&reference).await.unwrap());
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn foreign_and_traversal_references_are_ignored() {
        let store = temp_store();
        store.ensure_ready().await.unwrap();
        assert!(!store.delete("/elsewhere/a.png").await.unwrap());
        assert!(!store.delete("/uploads/../Cargo.toml").await.unwrap());
        assert!(store.path_for("/uploads/a/b.png").is_none());
        assert_eq!(
            store.path_for("/uploads/a.png?t=1"),
            Some(store.root().join("a.png"))
        );
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn rejects_unusable_extensions() {
        let store = temp_store();
        store.ensure_ready().await.unwrap();
        for ext in ["", ".", "p/ng", "averyveryverylongext"] {
            assert!(matches!(
                store.store(b"x", ext).await,
                Err(StorageError::InvalidExtension(_))
            ));
        }
        let _ = std::fs::remove_dir_all(store.root());
    }
}
