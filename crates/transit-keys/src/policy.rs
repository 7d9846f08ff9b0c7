//! The Policy object
//!
//! A [`Policy`] is the full versioned configuration and key material for one
//! named key. Creation-time fields never change; `versions` only grows.

use serde::{Deserialize, Serialize};

use transit_core::{KeyType, StorageError};
use transit_crypto::{CryptoResult, KeyEntry};

use crate::request::PolicyRequest;

/// Storage prefix under which every policy is persisted
pub const POLICY_PREFIX: &str = "policy/";

/// One named key and all of its versions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    name: String,
    key_type: KeyType,
    derived: bool,
    convergent: bool,
    exportable: bool,
    /// Version `n` lives at index `n - 1`
    versions: Vec<KeyEntry>,
    latest_version: u32,
}

impl Policy {
    /// Create a policy with a freshly generated version 1
    ///
    /// Assumes the request has already been validated.
    pub fn generate(request: &PolicyRequest) -> CryptoResult<Self> {
        let entry = KeyEntry::generate(request.key_type)?;

        Ok(Self {
            name: request.name.clone(),
            key_type: request.key_type,
            derived: request.derived,
            convergent: request.convergent,
            exportable: request.exportable,
            versions: vec![entry],
            latest_version: 1,
        })
    }

    /// Storage key for the policy named `name`
    pub fn storage_key(name: &str) -> String {
        format!("{}{}", POLICY_PREFIX, name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn derived(&self) -> bool {
        self.derived
    }

    pub fn convergent(&self) -> bool {
        self.convergent
    }

    pub fn exportable(&self) -> bool {
        self.exportable
    }

    pub fn latest_version(&self) -> u32 {
        self.latest_version
    }

    /// Key material for `version`, if it exists
    pub fn entry(&self, version: u32) -> Option<&KeyEntry> {
        let index = usize::try_from(version).ok()?.checked_sub(1)?;
        self.versions.get(index)
    }

    pub fn latest_entry(&self) -> Option<&KeyEntry> {
        self.entry(self.latest_version)
    }

    /// Iterate `(version, entry)` pairs in ascending version order
    pub fn versions(&self) -> impl Iterator<Item = (u32, &KeyEntry)> {
        (1u32..).zip(self.versions.iter())
    }

    /// Append a freshly generated version and make it the latest
    pub fn rotate(&mut self) -> CryptoResult<u32> {
        let entry = KeyEntry::generate(self.key_type)?;
        self.versions.push(entry);
        self.latest_version += 1;
        Ok(self.latest_version)
    }

    /// Serialize to the opaque blob handed to storage
    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        postcard::to_allocvec(self).map_err(|e| StorageError::serialization(e.to_string()))
    }

    /// Deserialize a stored blob, rejecting blobs that break the
    /// policy invariants
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let policy: Policy = postcard::from_bytes(bytes)?;

        if policy.convergent && !policy.derived {
            return Err(StorageError::deserialization(format!(
                "policy {} is convergent but not derived",
                policy.name
            )));
        }
        if policy.versions.is_empty() || policy.latest_version as usize != policy.versions.len() {
            return Err(StorageError::deserialization(format!(
                "policy {} has inconsistent versions",
                policy.name
            )));
        }

        Ok(policy)
    }
}
