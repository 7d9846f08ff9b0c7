//! Context derivation engine
//!
//! Derived policies never use a version key directly. Each request supplies a
//! context, and the version key is expanded into a per-context subkey with
//! HKDF-SHA256:
//!
//! ```text
//! subkey = HKDF-SHA256(ikm = version key, salt = nonce | none, info = context)
//! ```
//!
//! Convergent policies mix a caller-supplied 12-byte nonce in as the salt, so
//! the same `(context, nonce)` always yields the same subkey. Reusing a nonce
//! under one context is the caller's responsibility to avoid.
//!
//! Non-convergent policies draw a fresh nonce on every call and return it
//! alongside the subkey. The subkey bytes then depend on the context alone,
//! which keeps derived public keys stable per context.

use rand::RngCore;

use transit_crypto::{AsymmetricKeyPair, KeyEntry, SecureBytes, derive_key};

use crate::error::DerivationError;
use crate::policy::Policy;

/// Nonce size for convergent derivation (96 bits)
pub const NONCE_SIZE: usize = 12;

/// The key to use for one operation against a policy
#[derive(Debug, Clone)]
pub struct SubKey {
    key: SecureBytes,
    nonce: Option<[u8; NONCE_SIZE]>,
    version: u32,
    derived: bool,
}

impl SubKey {
    pub fn key(&self) -> &SecureBytes {
        &self.key
    }

    /// The nonce mixed in or generated for this subkey
    ///
    /// `None` when the policy is not derived.
    pub fn nonce(&self) -> Option<&[u8; NONCE_SIZE]> {
        self.nonce.as_ref()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whether the key was derived from a context or is the version key itself
    pub fn is_derived(&self) -> bool {
        self.derived
    }
}

/// Derive the subkey for `context` from the latest version
pub fn derive(
    policy: &Policy,
    context: &[u8],
    nonce: Option<&[u8]>,
) -> Result<SubKey, DerivationError> {
    derive_version(policy, policy.latest_version(), context, nonce)
}

/// Derive the subkey for `context` from a specific version
///
/// Non-derived policies skip derivation and return the version key; the
/// context and nonce are ignored.
pub fn derive_version(
    policy: &Policy,
    version: u32,
    context: &[u8],
    nonce: Option<&[u8]>,
) -> Result<SubKey, DerivationError> {
    let entry = version_entry(policy, version)?;

    if !policy.derived() {
        return Ok(SubKey {
            key: entry.key().clone(),
            nonce: None,
            version,
            derived: false,
        });
    }

    let nonce = match resolve_nonce(policy, nonce)? {
        Some(nonce) => nonce,
        None => {
            let mut fresh = [0u8; NONCE_SIZE];
            rand::rng().fill_bytes(&mut fresh);
            fresh
        }
    };
    let key = subkey_bytes(policy, entry, context, &nonce)?;

    Ok(SubKey {
        key,
        nonce: Some(nonce),
        version,
        derived: true,
    })
}

/// Public key for `context`, without exposing private material
///
/// Derived policies return the public half of the key pair generated from the
/// context subkey. Non-derived policies return the version's own public key.
pub fn derive_public_key(
    policy: &Policy,
    version: u32,
    context: &[u8],
    nonce: Option<&[u8]>,
) -> Result<String, DerivationError> {
    let key_type = policy.key_type();
    if !key_type.supports_public_key_export() {
        return Err(DerivationError::NotAsymmetric(key_type));
    }

    let entry = version_entry(policy, version)?;

    if !policy.derived() {
        return entry
            .public_key()
            .map(str::to_string)
            .ok_or(DerivationError::NotAsymmetric(key_type));
    }

    // A non-convergent salt is never mixed in, so any nonce value works here
    let nonce = resolve_nonce(policy, nonce)?.unwrap_or([0u8; NONCE_SIZE]);
    let subkey = subkey_bytes(policy, entry, context, &nonce)?;
    let pair = AsymmetricKeyPair::from_seed(key_type, subkey.as_slice())?;

    Ok(pair.public_key().to_string())
}

fn version_entry(policy: &Policy, version: u32) -> Result<&KeyEntry, DerivationError> {
    policy
        .entry(version)
        .ok_or(DerivationError::UnknownVersion(version))
}

/// Check a caller nonce against the policy's convergence mode
///
/// Returns the nonce for convergent policies and `None` otherwise.
fn resolve_nonce(
    policy: &Policy,
    nonce: Option<&[u8]>,
) -> Result<Option<[u8; NONCE_SIZE]>, DerivationError> {
    match (policy.convergent(), nonce) {
        (true, None) => Err(DerivationError::NonceRequired),
        (true, Some(bytes)) => {
            let nonce = <[u8; NONCE_SIZE]>::try_from(bytes).map_err(|_| {
                DerivationError::InvalidNonceLength {
                    expected: NONCE_SIZE,
                    actual: bytes.len(),
                }
            })?;
            Ok(Some(nonce))
        }
        (false, Some(_)) => Err(DerivationError::NonceNotAllowed),
        (false, None) => Ok(None),
    }
}

fn subkey_bytes(
    policy: &Policy,
    entry: &KeyEntry,
    context: &[u8],
    nonce: &[u8; NONCE_SIZE],
) -> Result<SecureBytes, DerivationError> {
    if context.is_empty() {
        return Err(DerivationError::MissingContext);
    }

    let salt = policy.convergent().then_some(&nonce[..]);
    Ok(derive_key(entry.key().as_slice(), context, salt)?)
}
