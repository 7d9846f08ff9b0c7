//! Resolved creation parameters for a policy

use serde::{Deserialize, Serialize};

use transit_core::{KeyType, ValidationError, check_derivation, validate_name};

/// Parameters of a create-or-get call, with the key type already resolved
///
/// These fields are fixed when a policy is first created. A later request
/// with different values never changes an existing policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub name: String,
    pub key_type: KeyType,
    pub derived: bool,
    pub convergent: bool,
    pub exportable: bool,
}

impl PolicyRequest {
    /// A non-derived, non-exportable request
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            key_type,
            derived: false,
            convergent: false,
            exportable: false,
        }
    }

    pub fn with_derived(mut self, derived: bool) -> Self {
        self.derived = derived;
        self
    }

    pub fn with_convergent(mut self, convergent: bool) -> Self {
        self.convergent = convergent;
        self
    }

    pub fn with_exportable(mut self, exportable: bool) -> Self {
        self.exportable = exportable;
        self
    }

    /// Check the name and the flag combination
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        check_derivation(self.derived, self.convergent)
    }
}
