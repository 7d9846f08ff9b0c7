//! Validation rules for policy requests
//!
//! Checks run in a fixed order and touch nothing but their arguments, so a
//! failing request leaves the store exactly as it found it.

use crate::error::ValidationError;
use crate::key_type::KeyType;

/// Validate derivation flags and resolve the key type identifier
///
/// Rules, in order:
/// 1. `convergent` requires `derived`
/// 2. `key_type` must name a supported [`KeyType`]
pub fn validate(
    derived: bool,
    convergent: bool,
    key_type: &str,
) -> Result<KeyType, ValidationError> {
    check_derivation(derived, convergent)?;
    KeyType::resolve(key_type)
}

/// Check the flag combination alone, for callers holding a resolved type
pub fn check_derivation(derived: bool, convergent: bool) -> Result<(), ValidationError> {
    if convergent && !derived {
        return Err(ValidationError::ConvergentRequiresDerivation);
    }
    Ok(())
}

/// Check that a key name is acceptable
///
/// Names are ASCII word characters, `-` and `.`, and must start and end with
/// a word character. This keeps every name usable as a single storage path
/// segment.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';

    let mut chars = name.chars();
    let valid = match (chars.next(), chars.next_back()) {
        (Some(first), None) => is_word(first),
        (Some(first), Some(last)) => {
            is_word(first) && is_word(last) && chars.all(|c| is_word(c) || c == '-' || c == '.')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidName(name.to_string()))
    }
}
