use std::collections::{BTreeMap, BTreeSet};

use prefs_types::{Value, ValueKind};

use crate::batch::EditBatch;
use crate::error::{StoreError, StoreResult};

/// Durable key-value medium holding preference values.
///
/// All implementations must satisfy these invariants:
/// - A committed batch becomes visible as a whole; readers never observe a
///   subset of one batch.
/// - A failed commit leaves the store exactly as it was.
/// - A batch putting a non-finite float fails with
///   [`StoreError::UnstorableValue`] as a whole.
/// - The store never coerces between variants: a typed read of a key holding
///   another variant is a [`StoreError::TypeMismatch`].
/// - All I/O errors are propagated, never silently ignored.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value for `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Snapshot of every stored entry.
    fn get_all(&self) -> StoreResult<BTreeMap<String, Value>>;

    /// Atomically apply a batch of edits.
    fn commit_batch(&self, batch: EditBatch) -> StoreResult<()>;

    /// Check whether `key` holds a value.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Begin an edit session. Nothing is visible until [`Editor::commit`].
    fn edit(&self) -> Box<dyn Editor + '_> {
        Box::new(BatchEditor {
            store: self,
            batch: EditBatch::new(),
        })
    }

    fn get_string(&self, key: &str, default: String) -> StoreResult<String> {
        read_typed(self.get(key)?, key, ValueKind::String, default, |v| match v {
            Value::String(s) => Ok(s),
            other => Err(other),
        })
    }

    fn get_bool(&self, key: &str, default: bool) -> StoreResult<bool> {
        read_typed(self.get(key)?, key, ValueKind::Bool, default, |v| match v {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        })
    }

    fn get_long(&self, key: &str, default: i64) -> StoreResult<i64> {
        read_typed(self.get(key)?, key, ValueKind::Long, default, |v| match v {
            Value::Long(n) => Ok(n),
            other => Err(other),
        })
    }

    fn get_int(&self, key: &str, default: i32) -> StoreResult<i32> {
        read_typed(self.get(key)?, key, ValueKind::Int, default, |v| match v {
            Value::Int(n) => Ok(n),
            other => Err(other),
        })
    }

    fn get_float(&self, key: &str, default: f32) -> StoreResult<f32> {
        read_typed(self.get(key)?, key, ValueKind::Float, default, |v| match v {
            Value::Float(x) => Ok(x),
            other => Err(other),
        })
    }

    fn get_string_set(
        &self,
        key: &str,
        default: BTreeSet<String>,
    ) -> StoreResult<BTreeSet<String>> {
        read_typed(self.get(key)?, key, ValueKind::StringSet, default, |v| match v {
            Value::StringSet(set) => Ok(set),
            other => Err(other),
        })
    }
}

fn read_typed<T>(
    stored: Option<Value>,
    key: &str,
    expected: ValueKind,
    default: T,
    extract: impl FnOnce(Value) -> Result<T, Value>,
) -> StoreResult<T> {
    match stored {
        None => Ok(default),
        Some(value) => {
            extract(value).map_err(|other| StoreError::type_mismatch(key, expected, other.kind()))
        }
    }
}

/// An edit session over a [`KeyValueStore`].
///
/// Operations accumulate until [`Editor::commit`], which applies them in
/// recording order as one atomic batch. Dropping an editor without committing
/// discards its operations.
pub trait Editor {
    fn put(&mut self, key: &str, value: Value);

    fn remove(&mut self, key: &str);

    fn clear(&mut self);

    /// Materialize every accumulated operation at once.
    fn commit(self: Box<Self>) -> StoreResult<()>;

    fn put_string(&mut self, key: &str, value: String) {
        self.put(key, Value::String(value));
    }

    fn put_bool(&mut self, key: &str, value: bool) {
        self.put(key, Value::Bool(value));
    }

    fn put_long(&mut self, key: &str, value: i64) {
        self.put(key, Value::Long(value));
    }

    fn put_int(&mut self, key: &str, value: i32) {
        self.put(key, Value::Int(value));
    }

    fn put_float(&mut self, key: &str, value: f32) {
        self.put(key, Value::Float(value));
    }

    fn put_string_set(&mut self, key: &str, value: BTreeSet<String>) {
        self.put(key, Value::StringSet(value));
    }
}

/// Default editor: records into an [`EditBatch`] and hands it to
/// [`KeyValueStore::commit_batch`].
struct BatchEditor<'a, S: ?Sized> {
    store: &'a S,
    batch: EditBatch,
}

impl<S: KeyValueStore + ?Sized> Editor for BatchEditor<'_, S> {
    fn put(&mut self, key: &str, value: Value) {
        self.batch.put(key, value);
    }

    fn remove(&mut self, key: &str) {
        self.batch.remove(key);
    }

    fn clear(&mut self) {
        self.batch.clear();
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let BatchEditor { store, batch } = *self;
        store.commit_batch(batch)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        (**self).get(key)
    }

    fn get_all(&self) -> StoreResult<BTreeMap<String, Value>> {
        (**self).get_all()
    }

    fn commit_batch(&self, batch: EditBatch) -> StoreResult<()> {
        (**self).commit_batch(batch)
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        (**self).contains(key)
    }

    fn edit(&self) -> Box<dyn Editor + '_> {
        (**self).edit()
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        (**self).get(key)
    }

    fn get_all(&self) -> StoreResult<BTreeMap<String, Value>> {
        (**self).get_all()
    }

    fn commit_batch(&self, batch: EditBatch) -> StoreResult<()> {
        (**self).commit_batch(batch)
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        (**self).contains(key)
    }

    fn edit(&self) -> Box<dyn Editor + '_> {
        (**self).edit()
    }
}
