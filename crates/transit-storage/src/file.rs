//! File-based storage implementation
//!
//! Each key maps to one file below the root directory: `policy/orders-key`
//! is stored at `<root>/policy/orders-key`. Writes go to a temporary sibling
//! first and are renamed into place, so a reader never sees a partial value.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, trace};

use transit_core::{Storage, StorageError};

/// Prefix for in-flight temporary files; such entries are never listed
const TEMP_PREFIX: &str = ".tmp-";

/// Persistent implementation of [`Storage`] on the local filesystem
#[derive(Debug)]
pub struct FileStorage {
    /// Root directory for all stored keys
    root: PathBuf,
    /// Whether to fsync each write before renaming it into place
    sync_writes: bool,
    /// Counter for unique temporary file names
    temp_counter: AtomicU64,
}

impl FileStorage {
    /// Open (creating if needed) file storage rooted at `root`
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::with_options(root, true).await
    }

    /// Open with explicit sync behaviour (durability vs performance)
    pub async fn with_options(
        root: impl AsRef<Path>,
        sync_writes: bool,
    ) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;

        info!(path = ?root, sync_writes, "Opened file storage");

        Ok(Self {
            root,
            sync_writes,
            temp_counter: AtomicU64::new(0),
        })
    }

    /// Root directory of this storage
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a storage key onto a path below the root
    ///
    /// Every segment must be a plain file name: no empty, `.`, or `..`
    /// segments and no backslashes, so a key can never escape the root.
    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for segment in key.trim_end_matches('/').split('/') {
            if segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.starts_with(TEMP_PREFIX)
                || segment.contains('\\')
                || segment.contains('\0')
            {
                return Err(StorageError::InvalidKey(key.to_string()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    fn temp_path_for(&self, path: &Path) -> PathBuf {
        let id = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!("{}{}-{}", TEMP_PREFIX, name, id))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let dir = if prefix.trim_end_matches('/').is_empty() {
            self.root.clone()
        } else {
            self.path_for(prefix)?
        };

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            if entry.file_type().await?.is_dir() {
                names.push(format!("{}/", name));
            } else {
                names.push(name);
            }
        }

        // Directory iteration order is unspecified
        names.sort();
        Ok(names)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path_for(&path);
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(value).await?;
        if self.sync_writes {
            file.sync_all().await?;
        }
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &path).await {
            // Best effort: the temp file is already orphaned
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        trace!(key, len = value.len(), "Stored value");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "Deleted value");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
