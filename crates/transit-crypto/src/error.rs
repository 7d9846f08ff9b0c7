//! Error types for transit-crypto

use thiserror::Error;

/// Errors that can occur while generating or deriving key material
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Key encoding failed: {0}")]
    Encoding(String),
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_error_display() {
        let err = CryptoError::KeyGenerationFailed("rng error".to_string());
        assert!(err.to_string().contains("Key generation failed"));
        assert!(err.to_string().contains("rng error"));

        let err = CryptoError::KeyDerivationFailed("bad length".to_string());
        assert!(err.to_string().contains("Key derivation failed"));

        let err = CryptoError::InvalidKey("wrong length".to_string());
        assert!(err.to_string().contains("Invalid key"));

        let err = CryptoError::Encoding("pem".to_string());
        assert!(err.to_string().contains("encoding"));
    }
}
