//! Typed preference access for applications.
//!
//! [`PreferenceStore`] is the entry point: it pairs any
//! [`KeyValueStore`](prefs_store::KeyValueStore) with a map of per-key
//! defaults and exposes typed get/set, bulk save, remove, reset and clear.
//! Call sites never deal with missing keys or the medium's native API.
//!
//! ```
//! use prefs_core::{Defaults, InMemoryStore, PreferenceStore};
//!
//! let defaults: Defaults = [("timeout", 30)].into_iter().collect();
//! let prefs = PreferenceStore::new(InMemoryStore::new(), defaults);
//!
//! assert_eq!(prefs.get_int("timeout").unwrap(), 30);
//! prefs.save("timeout", 99).unwrap();
//! prefs.reset("timeout").unwrap();
//! assert_eq!(prefs.get_int("timeout").unwrap(), 30);
//! ```

pub mod error;
pub mod preferences;

pub use error::{PrefError, PrefResult};
pub use preferences::PreferenceStore;

// Re-export key types
pub use prefs_store::{
    Editor, FileStore, FileStoreConfig, InMemoryStore, KeyValueStore, StoreError, SyncMode,
};
pub use prefs_types::{Defaults, IntoValue, TypeError, Value, ValueKind};
