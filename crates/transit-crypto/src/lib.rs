//! # Transit Crypto
//!
//! Key material for Transit policies.
//!
//! Cryptographic primitives come from the RustCrypto and dalek crates; this
//! crate only decides how key material is generated, encoded, and derived
//! for each [`KeyType`](transit_core::KeyType).
//!
//! ## Key Types
//!
//! - [`KeyEntry`]: One version of a policy's key material
//! - [`AsymmetricKeyPair`]: Private/public pair for asymmetric key types
//! - [`SecureBytes`]: Secret bytes that are zeroized on drop
//!
//! ## Derivation
//!
//! [`derive_key`] expands a version key into a per-context subkey with
//! HKDF-SHA256. [`AsymmetricKeyPair::from_seed`] turns a subkey into a
//! deterministic key pair.
//!
//! ## Example
//!
//! ```rust,ignore
//! use transit_core::KeyType;
//! use transit_crypto::{derive_key, AsymmetricKeyPair, KeyEntry};
//!
//! let entry = KeyEntry::generate(KeyType::Ed25519)?;
//! let subkey = derive_key(entry.key().as_slice(), b"order-42", None)?;
//! let derived = AsymmetricKeyPair::from_seed(KeyType::Ed25519, &subkey)?;
//! println!("{}", derived.public_key());
//! ```

pub mod asymmetric;
pub mod error;
pub mod kdf;
pub mod key_entry;
pub mod secure;

// Re-exports
pub use asymmetric::AsymmetricKeyPair;
pub use error::{CryptoError, CryptoResult};
pub use kdf::{derive_key, KDF_NAME, SUBKEY_SIZE};
pub use key_entry::{KeyEntry, KEY_SIZE};
pub use secure::SecureBytes;
