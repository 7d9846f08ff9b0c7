//! Error types for transit-keys

use thiserror::Error;

use transit_core::{KeyType, StorageError, ValidationError};
use transit_crypto::CryptoError;

/// Errors raised by the context derivation engine
#[derive(Debug, Error)]
pub enum DerivationError {
    #[error(
        "missing context for key derivation; the key was created with derivation enabled, \
         so per-request context must be supplied"
    )]
    MissingContext,

    #[error("convergent derivation requires a caller-supplied nonce")]
    NonceRequired,

    #[error("a nonce may only be supplied for convergent keys")]
    NonceNotAllowed,

    #[error("invalid nonce length: expected {expected} bytes, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    #[error("unknown key version {0}")]
    UnknownVersion(u32),

    #[error("key type {0} has no public key")]
    NotAsymmetric(KeyType),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Top-level error type for policy operations
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Malformed caller input detected at the request boundary
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Derivation(#[from] DerivationError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Crypto failure: {0}")]
    Crypto(#[from] CryptoError),
}

/// Caller-facing classification of a [`PolicyError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; never retried, surfaced verbatim
    InvalidRequest,
    /// The storage collaborator failed; fatal to the request
    StorageFailure,
    /// Key generation or encoding failed
    Internal,
}

impl PolicyError {
    /// Create a new InvalidRequest error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PolicyError::InvalidRequest(_) | PolicyError::Validation(_) => {
                ErrorKind::InvalidRequest
            }
            PolicyError::Derivation(DerivationError::Crypto(_)) => ErrorKind::Internal,
            PolicyError::Derivation(_) => ErrorKind::InvalidRequest,
            PolicyError::Storage(_) => ErrorKind::StorageFailure,
            PolicyError::Crypto(_) => ErrorKind::Internal,
        }
    }

    pub fn is_invalid_request(&self) -> bool {
        self.kind() == ErrorKind::InvalidRequest
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type alias for policy operations
pub type PolicyResult<T> = Result<T, PolicyError>;
