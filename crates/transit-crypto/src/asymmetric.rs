//! Asymmetric key pairs
//!
//! Every pair is produced from a 32-byte seed, either random or derived.
//! Ed25519 uses the seed as its secret directly; ECDSA and RSA draw from a
//! ChaCha20 CSPRNG seeded with it, which makes derived pairs reproducible.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::SigningKey;
use p256::pkcs8::LineEnding;
use rand::RngCore;
use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::SeedableRng;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use transit_core::KeyType;

use crate::error::{CryptoError, CryptoResult};
use crate::secure::SecureBytes;

/// Seed size for key pair generation (32 bytes)
pub const SEED_SIZE: usize = 32;

/// Private/public key pair for an asymmetric [`KeyType`]
///
/// Private key encodings:
/// - Ed25519: the 32-byte secret seed
/// - ECDSA-P256, RSA: PKCS#8 DER
///
/// Public keys are pre-formatted for callers: base64 for Ed25519, SPKI PEM
/// for ECDSA and RSA.
#[derive(Clone, Serialize, Deserialize)]
pub struct AsymmetricKeyPair {
    key_type: KeyType,
    private_key: SecureBytes,
    public_key: String,
}

impl AsymmetricKeyPair {
    /// Generate a new random key pair
    pub fn generate(key_type: KeyType) -> CryptoResult<Self> {
        let mut seed = Zeroizing::new([0u8; SEED_SIZE]);
        rand::rng().fill_bytes(&mut seed[..]);
        Self::from_seed(key_type, &seed[..])
    }

    /// Build the key pair determined by `seed`
    ///
    /// The same `(key_type, seed)` always yields the same pair.
    pub fn from_seed(key_type: KeyType, seed: &[u8]) -> CryptoResult<Self> {
        let seed = Zeroizing::new(<[u8; SEED_SIZE]>::try_from(seed).map_err(|_| {
            CryptoError::InvalidKey(format!(
                "seed must be {} bytes, got {}",
                SEED_SIZE,
                seed.len()
            ))
        })?);

        match key_type {
            KeyType::Aes256Gcm96 => Err(CryptoError::InvalidKey(format!(
                "{} is not an asymmetric key type",
                key_type
            ))),
            KeyType::Ed25519 => Ok(Self::ed25519(&seed)),
            KeyType::EcdsaP256 => Self::ecdsa_p256(&mut ChaCha20Rng::from_seed(*seed)),
            KeyType::Rsa2048 | KeyType::Rsa4096 => {
                Self::rsa(key_type, &mut ChaCha20Rng::from_seed(*seed))
            }
        }
    }

    fn ed25519(seed: &[u8; SEED_SIZE]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self {
            key_type: KeyType::Ed25519,
            private_key: SecureBytes::new(signing_key.to_bytes().to_vec()),
            public_key: STANDARD.encode(signing_key.verifying_key().to_bytes()),
        }
    }

    fn ecdsa_p256(rng: &mut ChaCha20Rng) -> CryptoResult<Self> {
        let secret = p256::SecretKey::random(rng);

        let private_der = p256::pkcs8::EncodePrivateKey::to_pkcs8_der(&secret)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        let public_pem =
            p256::pkcs8::EncodePublicKey::to_public_key_pem(&secret.public_key(), LineEnding::LF)
                .map_err(|e| CryptoError::Encoding(e.to_string()))?;

        Ok(Self {
            key_type: KeyType::EcdsaP256,
            private_key: SecureBytes::new(private_der.as_bytes().to_vec()),
            public_key: public_pem,
        })
    }

    fn rsa(key_type: KeyType, rng: &mut ChaCha20Rng) -> CryptoResult<Self> {
        let private = RsaPrivateKey::new(rng, key_type.key_bits())
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;

        let private_der = rsa::pkcs8::EncodePrivateKey::to_pkcs8_der(&private)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        let public_pem = rsa::pkcs8::EncodePublicKey::to_public_key_pem(
            &RsaPublicKey::from(&private),
            rsa::pkcs8::LineEnding::LF,
        )
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;

        Ok(Self {
            key_type,
            private_key: SecureBytes::new(private_der.as_bytes().to_vec()),
            public_key: public_pem,
        })
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Get the encoded private key (use with caution)
    pub fn private_key(&self) -> &SecureBytes {
        &self.private_key
    }

    /// Get the formatted public key
    pub fn public_key(&self) -> &str {
        &self.public_key
    }
}

impl fmt::Debug for AsymmetricKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsymmetricKeyPair")
            .field("key_type", &self.key_type)
            .field("private_key", &self.private_key)
            .field("public_key", &self.public_key)
            .finish()
    }
}
