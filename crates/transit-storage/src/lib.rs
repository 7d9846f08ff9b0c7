//! # Transit Storage
//!
//! Storage backends for serialized Transit policies.
//!
//! ## Features
//!
//! - **InMemoryStorage**: `DashMap`-backed storage for testing and single-process use
//! - **FileStorage**: One file per key under a root directory, written atomically
//!
//! Both implement [`Storage`] from `transit-core`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use transit_storage::{InMemoryStorage, Storage};
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = InMemoryStorage::new();
//!     storage.put("policy/orders-key", b"blob").await.unwrap();
//!
//!     let names = storage.list("policy/").await.unwrap();
//!     assert_eq!(names, vec!["orders-key".to_string()]);
//! }
//! ```

pub mod file;
pub mod memory;

// Re-exports
pub use file::FileStorage;
pub use memory::InMemoryStorage;

// Re-export the trait and error from transit-core for convenience
pub use transit_core::{Storage, StorageError};
