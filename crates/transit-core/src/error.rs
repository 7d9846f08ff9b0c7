//! Error types for Transit

use thiserror::Error;

/// Errors raised while validating a policy request
///
/// All of these are caller-input errors. They are detected before any lock is
/// taken or any storage call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("convergent encryption requires derivation to be enabled")]
    ConvergentRequiresDerivation,

    #[error("unknown key type {0}")]
    InvalidKeyType(String),

    #[error("invalid key name: {0:?}")]
    InvalidName(String),
}

/// Errors reported by the durable storage collaborator
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during storage operations
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// The backend could not be reached at all
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The storage key cannot be represented by this backend
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl StorageError {
    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Create a new Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a new Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a new Deserialization error
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

/// Postcard failures only surface while decoding stored blobs
impl From<postcard::Error> for StorageError {
    fn from(err: postcard::Error) -> Self {
        StorageError::Deserialization(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
