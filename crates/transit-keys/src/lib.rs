//! # Transit Keys
//!
//! Named cryptographic key policies: creation, versioning, reads and
//! deletion under strict per-name locking.
//!
//! ## Components
//!
//! - [`Policy`]: One named key with its versions and creation-time flags
//! - [`PolicyStore`]: The lock manager; at most one policy is ever created
//!   per name, no matter how many callers race
//! - [`derivation`]: Per-context subkeys and derived public keys
//! - [`KeysBackend`]: Request surface for a routing layer
//! - [`TransitConfig`]: TOML configuration for storage, defaults and logging
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use transit_keys::{KeysBackend, PolicyStore, ReadKeyRequest, WriteKeyRequest};
//! use transit_storage::InMemoryStorage;
//!
//! let store = Arc::new(PolicyStore::new(Arc::new(InMemoryStorage::new())));
//! let backend = KeysBackend::new(store);
//!
//! backend
//!     .write_key(WriteKeyRequest::new("sig-key").with_type("ed25519").with_derived(true))
//!     .await?;
//!
//! let info = backend
//!     .read_key(ReadKeyRequest::new("sig-key").with_context("b3JkZXItNDI="))
//!     .await?
//!     .expect("key exists");
//! println!("{:?}", info.derived_public_key);
//! ```
//!
//! A service built from a config file installs logging first and keeps the
//! returned guard alive for as long as file output should be flushed:
//!
//! ```rust,ignore
//! let config = TransitConfig::from_file("transit.toml")?;
//! let _log_guard = config.init_logging();
//! let backend = KeysBackend::from_config(&config).await?;
//! ```

pub mod backend;
pub mod config;
pub mod derivation;
pub mod error;
pub mod policy;
pub mod request;
pub mod store;

// Re-exports
pub use backend::{
    KeyInfo, KeyVersionInfo, KeysBackend, ReadKeyRequest, WriteKeyRequest, WriteKeyResponse,
};
pub use config::{StorageConfig, TransitConfig};
pub use derivation::{derive, derive_public_key, derive_version, SubKey, NONCE_SIZE};
pub use error::{ConfigError, DerivationError, ErrorKind, PolicyError, PolicyResult};
pub use policy::{Policy, POLICY_PREFIX};
pub use request::PolicyRequest;
pub use store::{PolicyRef, PolicyStore};
