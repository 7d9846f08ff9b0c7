//! # Transit Core
//!
//! Core types, traits, and errors shared by the Transit key management crates.
//!
//! ## Key Types
//!
//! - [`KeyType`]: Closed set of supported key types and their parameters
//! - [`Storage`]: Durable storage collaborator that holds serialized policies
//!
//! ## Validation
//!
//! [`validate`] runs the cross-field checks that must pass before any policy
//! is constructed or mutated. It has no side effects.

pub mod error;
pub mod key_type;
pub mod traits;
pub mod validation;

// Re-export main types
pub use error::*;
pub use key_type::*;
pub use traits::*;
pub use validation::*;
