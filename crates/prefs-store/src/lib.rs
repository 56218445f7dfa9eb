//! Key-value storage for prefs.
//!
//! This crate defines the contract a durable medium must satisfy to hold
//! preference values, plus two backends. The store never interprets keys;
//! it only holds typed [`Value`](prefs_types::Value)s and commits edits as
//! atomic batches.
//!
//! # Storage Backends
//!
//! All backends implement the [`KeyValueStore`] trait:
//!
//! - [`InMemoryStore`] -- map-based store for tests and embedding
//! - [`FileStore`] -- checksummed single-file store with atomic replace
//!
//! # Design Rules
//!
//! 1. Edits accumulate in an [`Editor`] and become visible only on commit.
//! 2. A commit is all-or-nothing; a failed commit changes nothing.
//! 3. Typed reads never coerce between variants.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod batch;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use batch::{EditBatch, EditOp};
pub use error::{StoreError, StoreResult};
pub use file::{FileStore, FileStoreConfig, SyncMode};
pub use memory::InMemoryStore;
pub use traits::{Editor, KeyValueStore};
