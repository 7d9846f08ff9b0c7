//! Versioned key material
//!
//! A [`KeyEntry`] is one generation of key material within a policy. Every
//! entry holds a random 256-bit key; asymmetric entries also hold a key pair.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use transit_core::KeyType;

use crate::asymmetric::AsymmetricKeyPair;
use crate::error::CryptoResult;
use crate::secure::SecureBytes;

/// Key size (32 bytes)
pub const KEY_SIZE: usize = 32;

/// One version of a policy's key material
///
/// For `aes256-gcm96` the key is the AES key itself. For every type it is
/// also the root from which context subkeys are derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEntry {
    key: SecureBytes,
    key_pair: Option<AsymmetricKeyPair>,
    creation_time: DateTime<Utc>,
}

impl KeyEntry {
    /// Generate fresh key material for `key_type`
    pub fn generate(key_type: KeyType) -> CryptoResult<Self> {
        let mut key = vec![0u8; KEY_SIZE];
        rand::rng().fill_bytes(&mut key);

        let key_pair = if key_type.is_asymmetric() {
            Some(AsymmetricKeyPair::generate(key_type)?)
        } else {
            None
        };

        Ok(Self {
            key: SecureBytes::new(key),
            key_pair,
            creation_time: Utc::now(),
        })
    }

    /// Get the raw version key (use with caution)
    pub fn key(&self) -> &SecureBytes {
        &self.key
    }

    pub fn key_pair(&self) -> Option<&AsymmetricKeyPair> {
        self.key_pair.as_ref()
    }

    /// Formatted public key, for asymmetric entries
    pub fn public_key(&self) -> Option<&str> {
        self.key_pair.as_ref().map(AsymmetricKeyPair::public_key)
    }

    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    /// Base64 of the private key material, as handed out on export
    ///
    /// Symmetric entries export the AES key; asymmetric entries export the
    /// encoded private key.
    pub fn export(&self) -> String {
        match &self.key_pair {
            Some(pair) => STANDARD.encode(pair.private_key().as_slice()),
            None => STANDARD.encode(self.key.as_slice()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_generation() {
        let a = KeyEntry::generate(KeyType::Aes256Gcm96).unwrap();
        let b = KeyEntry::generate(KeyType::Aes256Gcm96).unwrap();

        assert_eq!(a.key().len(), KEY_SIZE);
        assert_ne!(a.key(), b.key());
        assert!(a.key_pair().is_none());
        assert!(a.public_key().is_none());
    }

    #[test]
    fn test_asymmetric_generation_has_pair() {
        let entry = KeyEntry::generate(KeyType::Ed25519).unwrap();
        let pair = entry.key_pair().unwrap();
        assert_eq!(pair.key_type(), KeyType::Ed25519);
        assert_eq!(entry.public_key(), Some(pair.public_key()));
        assert_eq!(entry.key().len(), KEY_SIZE);
    }

    #[test]
    fn test_export_encodes_private_material() {
        let entry = KeyEntry::generate(KeyType::Aes256Gcm96).unwrap();
        let exported = STANDARD.decode(entry.export()).unwrap();
        assert_eq!(exported, entry.key().as_slice());

        let entry = KeyEntry::generate(KeyType::Ed25519).unwrap();
        let exported = STANDARD.decode(entry.export()).unwrap();
        assert_eq!(
            exported,
            entry.key_pair().unwrap().private_key().as_slice()
        );
    }

    #[test]
    fn test_creation_time_is_recent() {
        let before = Utc::now();
        let entry = KeyEntry::generate(KeyType::EcdsaP256).unwrap();
        assert!(entry.creation_time() >= before);
        assert!(entry.creation_time() <= Utc::now());
    }

    #[test]
    fn test_survives_serialization() {
        let entry = KeyEntry::generate(KeyType::EcdsaP256).unwrap();
        let bytes = postcard::to_allocvec(&entry).unwrap();
        let parsed: KeyEntry = postcard::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.key(), entry.key());
        assert_eq!(parsed.public_key(), entry.public_key());
        assert_eq!(parsed.creation_time(), entry.creation_time());
    }
}
