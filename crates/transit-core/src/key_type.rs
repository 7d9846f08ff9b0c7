//! Key type registry
//!
//! The set of supported key types is closed. Identifiers are resolved once at
//! the request boundary; everything past that point matches on [`KeyType`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A supported key type
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum KeyType {
    /// AES-256 in GCM mode with 96-bit nonces
    #[default]
    #[serde(rename = "aes256-gcm96")]
    Aes256Gcm96,
    /// ECDSA over NIST P-256
    #[serde(rename = "ecdsa-p256")]
    EcdsaP256,
    /// Ed25519 signatures
    #[serde(rename = "ed25519")]
    Ed25519,
    /// RSA with a 2048-bit modulus
    #[serde(rename = "rsa-2048")]
    Rsa2048,
    /// RSA with a 4096-bit modulus
    #[serde(rename = "rsa-4096")]
    Rsa4096,
}

impl KeyType {
    /// Every supported key type, in registry order
    pub const ALL: [KeyType; 5] = [
        KeyType::Aes256Gcm96,
        KeyType::EcdsaP256,
        KeyType::Ed25519,
        KeyType::Rsa2048,
        KeyType::Rsa4096,
    ];

    /// Resolve an identifier such as `"aes256-gcm96"`
    ///
    /// Matching ignores ASCII case. Unknown identifiers fail with
    /// [`ValidationError::InvalidKeyType`] carrying the offending string.
    pub fn resolve(identifier: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|kt| kt.as_str().eq_ignore_ascii_case(identifier))
            .ok_or_else(|| ValidationError::InvalidKeyType(identifier.to_string()))
    }

    /// Canonical identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            KeyType::Aes256Gcm96 => "aes256-gcm96",
            KeyType::EcdsaP256 => "ecdsa-p256",
            KeyType::Ed25519 => "ed25519",
            KeyType::Rsa2048 => "rsa-2048",
            KeyType::Rsa4096 => "rsa-4096",
        }
    }

    /// Whether the type carries a public/private key pair
    pub const fn is_asymmetric(&self) -> bool {
        !matches!(self, KeyType::Aes256Gcm96)
    }

    /// Whether a public key can be handed out for this type
    pub const fn supports_public_key_export(&self) -> bool {
        self.is_asymmetric()
    }

    /// Fixed key length in bits
    pub const fn key_bits(&self) -> usize {
        match self {
            KeyType::Aes256Gcm96 => 256,
            KeyType::EcdsaP256 => 256,
            KeyType::Ed25519 => 256,
            KeyType::Rsa2048 => 2048,
            KeyType::Rsa4096 => 4096,
        }
    }

    pub const fn supports_encryption(&self) -> bool {
        matches!(
            self,
            KeyType::Aes256Gcm96 | KeyType::Rsa2048 | KeyType::Rsa4096
        )
    }

    pub const fn supports_decryption(&self) -> bool {
        self.supports_encryption()
    }

    pub const fn supports_signing(&self) -> bool {
        self.is_asymmetric()
    }

    pub const fn supports_derivation(&self) -> bool {
        true
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}
