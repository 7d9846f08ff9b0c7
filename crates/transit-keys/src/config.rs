//! Configuration for a Transit keys backend

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use transit_core::{KeyType, Storage, StorageError};
use transit_logging::{LogConfig, TransitSubscriberBuilder, WorkerGuard};
use transit_storage::{FileStorage, InMemoryStorage};

use crate::error::ConfigError;

/// Which storage backend holds the policies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Process-local storage; policies are lost on exit
    #[default]
    Memory,
    /// One file per policy below `path`
    File {
        path: PathBuf,
        /// fsync each write before it is renamed into place
        #[serde(default = "default_sync_writes")]
        sync_writes: bool,
    },
}

fn default_sync_writes() -> bool {
    true
}

impl StorageConfig {
    /// File storage rooted at `path`, with synced writes
    pub fn file(path: impl Into<PathBuf>) -> Self {
        StorageConfig::File {
            path: path.into(),
            sync_writes: true,
        }
    }
}

/// Configuration for a keys backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitConfig {
    /// Storage backend configuration
    pub storage: StorageConfig,
    /// Key type used when a create request names none
    pub default_key_type: KeyType,
    /// Logging configuration
    pub logging: LogConfig,
}

impl TransitConfig {
    /// Parse a TOML document
    ///
    /// ```toml
    /// default_key_type = "ed25519"
    ///
    /// [storage]
    /// backend = "file"
    /// path = "/var/lib/transit"
    ///
    /// [logging]
    /// default_level = "debug"
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Set the storage configuration
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Set the default key type
    pub fn with_default_key_type(mut self, key_type: KeyType) -> Self {
        self.default_key_type = key_type;
        self
    }

    /// Set the logging configuration
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Open the configured storage backend
    pub async fn open_storage(&self) -> Result<Arc<dyn Storage>, StorageError> {
        let storage: Arc<dyn Storage> = match &self.storage {
            StorageConfig::Memory => Arc::new(InMemoryStorage::new()),
            StorageConfig::File { path, sync_writes } => {
                Arc::new(FileStorage::with_options(path, *sync_writes).await?)
            }
        };
        Ok(storage)
    }

    /// Install the configured logging subscriber
    ///
    /// Keep the returned guard alive while file output should be flushed.
    pub fn init_logging(&self) -> Option<WorkerGuard> {
        TransitSubscriberBuilder::new()
            .with_config(self.logging.clone())
            .init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transit_logging::RotationStrategy;

    #[test]
    fn test_defaults() {
        let config = TransitConfig::default();
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.default_key_type, KeyType::Aes256Gcm96);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(
            TransitConfig::from_toml_str("").unwrap(),
            TransitConfig::default()
        );
    }

    #[test]
    fn test_parse_full_document() {
        let config = TransitConfig::from_toml_str(
            r#"
            default_key_type = "ecdsa-p256"

            [storage]
            backend = "file"
            path = "/var/lib/transit"

            [logging]
            default_level = "debug"

            [logging.file]
            directory = "/var/log/transit"
            rotation = "hourly"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_key_type, KeyType::EcdsaP256);
        assert_eq!(config.storage, StorageConfig::file("/var/lib/transit"));
        assert_eq!(config.logging.default_level, "debug");
        let file = config.logging.file.unwrap();
        assert_eq!(file.rotation, RotationStrategy::Hourly);
        assert_eq!(file.prefix, "transit");
    }

    #[test]
    fn test_unknown_key_type_fails() {
        let err = TransitConfig::from_toml_str(r#"default_key_type = "des""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_missing_file() {
        let missing = "/nonexistent/transit.toml";
        let err = TransitConfig::from_file(missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[tokio::test]
    async fn test_open_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let config = TransitConfig::default().with_storage(StorageConfig::File {
            path: dir.path().join("data"),
            sync_writes: false,
        });

        let storage = config.open_storage().await.unwrap();
        storage.put("policy/x", b"1").await.unwrap();
        assert!(dir.path().join("data").join("policy").join("x").exists());
    }
}
