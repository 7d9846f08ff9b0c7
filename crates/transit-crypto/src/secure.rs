//! Zeroizing container for secret key material

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secure byte container that zeroizes on drop
///
/// Holds raw key material. `Debug` output never includes the bytes.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecureBytes(Vec<u8>);

impl SecureBytes {
    /// Take ownership of `bytes`
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the secret
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SecureBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for SecureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureBytes([REDACTED; {}])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let bytes = SecureBytes::new(vec![0xAB; 32]);
        let debug = format!("{:?}", bytes);
        assert_eq!(debug, "SecureBytes([REDACTED; 32])");
        assert!(!debug.contains("171"));
    }

    #[test]
    fn test_zeroize_clears_contents() {
        let mut bytes = SecureBytes::new(vec![1, 2, 3, 4]);
        bytes.zeroize();
        assert!(bytes.is_empty());
    }
}
