//! Foundation types for prefs.
//!
//! Every other prefs crate depends on `prefs-types`. It defines what a
//! preference value *is*; storing and reading values lives in `prefs-store`
//! and `prefs-core`.
//!
//! # Key Types
//!
//! - [`Value`] — Tagged union over the six supported preference shapes
//! - [`ValueKind`] — The variant tag, with zero-values and literal parsing
//! - [`IntoValue`] — The fallible construction boundary into [`Value`]
//! - [`Defaults`] — Immutable key-to-default mapping

pub mod defaults;
pub mod error;
pub mod value;

pub use defaults::Defaults;
pub use error::{TypeError, TypeResult};
pub use value::{IntoValue, Value, ValueKind};
