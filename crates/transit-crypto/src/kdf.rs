//! Context subkey derivation
//!
//! Subkeys are expanded from a version key with HKDF-SHA256. The context is
//! the HKDF info string; a caller-supplied nonce, when present, is the salt.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};
use crate::secure::SecureBytes;

/// Name reported for the KDF in key metadata
pub const KDF_NAME: &str = "hkdf_sha256";

/// Size of a derived subkey (32 bytes)
pub const SUBKEY_SIZE: usize = 32;

/// Derive a subkey from `master` for `context`
///
/// Deterministic: the same `(master, context, salt)` always produces the same
/// subkey. `salt` carries the convergent nonce; pass `None` otherwise.
pub fn derive_key(master: &[u8], context: &[u8], salt: Option<&[u8]>) -> CryptoResult<SecureBytes> {
    if master.is_empty() {
        return Err(CryptoError::InvalidKey("empty master key".to_string()));
    }

    let hk = Hkdf::<Sha256>::new(salt, master);
    let mut okm = vec![0u8; SUBKEY_SIZE];
    hk.expand(context, &mut okm)
        .map_err(|e| CryptoError::KeyDerivationFailed(format!("HKDF expand failed: {}", e)))?;

    Ok(SecureBytes::new(okm))
}
