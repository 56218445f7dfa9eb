use std::collections::{BTreeMap, BTreeSet};

use prefs_store::{Editor, KeyValueStore};
use prefs_types::{Defaults, IntoValue, Value};
use tracing::debug;

use crate::error::{PrefError, PrefResult};

/// Typed access to one settings namespace.
///
/// Wraps a [`KeyValueStore`] together with an immutable [`Defaults`] map.
/// Reads fall back to the registered default, or to the type's zero-value
/// when none is registered. Writes are converted and validated up front,
/// then committed as a single batch.
///
/// The store is used, not owned: pass `&S` or `Arc<S>` to share one medium
/// between several accessors.
#[derive(Debug)]
pub struct PreferenceStore<S> {
    store: S,
    defaults: Defaults,
}

impl<S: KeyValueStore> PreferenceStore<S> {
    pub fn new(store: S, defaults: Defaults) -> Self {
        Self { store, defaults }
    }

    /// An accessor where every key defaults to its zero-value.
    pub fn without_defaults(store: S) -> Self {
        Self::new(store, Defaults::new())
    }

    /// The underlying store, for callers that need the raw medium.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    // ---- Writes ----

    /// Write every registered default into the store, overwriting existing
    /// values for those keys.
    pub fn load_default_preferences(&self) -> PrefResult<()> {
        self.save_all(&self.defaults)
    }

    /// Write a single key. An absent value (`None`) removes the key.
    pub fn save<V: IntoValue>(&self, key: &str, value: V) -> PrefResult<()> {
        self.save_all([(key, value)])
    }

    /// Write many keys as one atomic batch.
    ///
    /// Every value is converted before the edit session opens, so an
    /// unsupported value fails the whole call with
    /// [`PrefError::UnsupportedValueType`] and nothing from the batch is
    /// committed.
    pub fn save_all<I, K, V>(&self, entries: I) -> PrefResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoValue,
    {
        let staged = entries
            .into_iter()
            .map(|(key, value)| match value.into_value() {
                Ok(value) => Ok((key, value)),
                Err(source) => Err(PrefError::UnsupportedValueType {
                    key: key.as_ref().to_string(),
                    source,
                }),
            })
            .collect::<PrefResult<Vec<_>>>()?;

        let count = staged.len();
        let mut editor = self.store.edit();
        for (key, value) in staged {
            stage(&mut *editor, key.as_ref(), value);
        }
        editor.commit()?;

        debug!(entries = count, "saved preferences");
        Ok(())
    }

    /// Delete `key`. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> PrefResult<()> {
        let mut editor = self.store.edit();
        editor.remove(key);
        editor.commit()?;
        Ok(())
    }

    /// Restore `key` to its registered default.
    ///
    /// A key without a registered default is removed.
    pub fn reset(&self, key: &str) -> PrefResult<()> {
        self.save(key, self.defaults.get(key))
    }

    /// Erase every key, then repopulate exactly the registered defaults.
    ///
    /// Both steps go through one edit session, so readers see either the old
    /// contents or the reset contents.
    pub fn reset_all(&self) -> PrefResult<()> {
        let mut editor = self.store.edit();
        editor.clear();
        for (key, value) in &self.defaults {
            stage(&mut *editor, key, Some(value.clone()));
        }
        editor.commit()?;

        debug!(defaults = self.defaults.len(), "reset all preferences");
        Ok(())
    }

    /// Erase every key in the store.
    pub fn clear(&self) -> PrefResult<()> {
        let mut editor = self.store.edit();
        editor.clear();
        editor.commit()?;

        debug!("cleared preferences");
        Ok(())
    }

    // ---- Reads ----

    /// Whether the store holds `key`, regardless of registered defaults.
    pub fn contains(&self, key: &str) -> PrefResult<bool> {
        Ok(self.store.contains(key)?)
    }

    /// Snapshot of every stored entry, without default substitution.
    pub fn get_all(&self) -> PrefResult<BTreeMap<String, Value>> {
        Ok(self.store.get_all()?)
    }

    pub fn get_string(&self, key: &str) -> PrefResult<String> {
        let default = self
            .default_value(key)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_default();
        Ok(self.store.get_string(key, default)?)
    }

    pub fn get_bool(&self, key: &str) -> PrefResult<bool> {
        let default = self
            .default_value(key)
            .and_then(Value::as_bool)
            .unwrap_or_default();
        Ok(self.store.get_bool(key, default)?)
    }

    pub fn get_long(&self, key: &str) -> PrefResult<i64> {
        let default = self
            .default_value(key)
            .and_then(Value::as_long)
            .unwrap_or_default();
        Ok(self.store.get_long(key, default)?)
    }

    pub fn get_int(&self, key: &str) -> PrefResult<i32> {
        let default = self
            .default_value(key)
            .and_then(Value::as_int)
            .unwrap_or_default();
        Ok(self.store.get_int(key, default)?)
    }

    pub fn get_float(&self, key: &str) -> PrefResult<f32> {
        let default = self
            .default_value(key)
            .and_then(Value::as_float)
            .unwrap_or_default();
        Ok(self.store.get_float(key, default)?)
    }

    pub fn get_string_set(&self, key: &str) -> PrefResult<BTreeSet<String>> {
        let default = self
            .default_value(key)
            .and_then(Value::as_string_set)
            .cloned()
            .unwrap_or_default();
        Ok(self.store.get_string_set(key, default)?)
    }

    fn default_value(&self, key: &str) -> Option<&Value> {
        self.defaults.get(key)
    }
}

/// Dispatch one entry to the editor's typed write primitive.
fn stage<E: Editor + ?Sized>(editor: &mut E, key: &str, value: Option<Value>) {
    match value {
        Some(Value::String(s)) => editor.put_string(key, s),
        Some(Value::Bool(b)) => editor.put_bool(key, b),
        Some(Value::Long(n)) => editor.put_long(key, n),
        Some(Value::Int(n)) => editor.put_int(key, n),
        Some(Value::Float(x)) => editor.put_float(key, x),
        Some(Value::StringSet(set)) => editor.put_string_set(key, set),
        None => editor.remove(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefs_store::{InMemoryStore, StoreError};
    use prefs_types::ValueKind;
    use serde_json::json;

    fn prefs(defaults: Defaults) -> PreferenceStore<InMemoryStore> {
        PreferenceStore::new(InMemoryStore::new(), defaults)
    }

    #[test]
    fn save_none_removes_key() {
        let p = prefs(Defaults::new());
        p.save("k", "v").unwrap();
        assert!(p.contains("k").unwrap());

        p.save("k", None::<String>).unwrap();
        assert!(!p.contains("k").unwrap());
    }

    #[test]
    fn json_null_in_batch_removes_key() {
        let p = prefs(Defaults::new());
        p.save("gone", 1).unwrap();
        p.save_all([("gone", json!(null)), ("kept", json!("yes"))])
            .unwrap();
        assert!(!p.contains("gone").unwrap());
        assert_eq!(p.get_string("kept").unwrap(), "yes");
    }

    #[test]
    fn reset_without_default_removes_key() {
        let p = prefs(Defaults::new());
        p.save("orphan", 5).unwrap();
        p.reset("orphan").unwrap();
        assert!(!p.contains("orphan").unwrap());
        assert_eq!(p.get_int("orphan").unwrap(), 0);
    }

    #[test]
    fn remove_absent_key_is_ok() {
        let p = prefs(Defaults::new());
        p.remove("never-written").unwrap();
        assert!(p.get_all().unwrap().is_empty());
    }

    #[test]
    fn load_defaults_overwrites_existing() {
        let defaults: Defaults = [("timeout", 30)].into_iter().collect();
        let p = prefs(defaults);
        p.save("timeout", 99).unwrap();
        p.save("other", true).unwrap();

        p.load_default_preferences().unwrap();
        assert_eq!(p.get_int("timeout").unwrap(), 30);
        assert!(p.get_bool("other").unwrap());
    }

    #[test]
    fn get_all_returns_native_values_only() {
        let defaults: Defaults = [("unset", "dflt")].into_iter().collect();
        let p = prefs(defaults);
        p.save("n", 5i64).unwrap();

        let all = p.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["n"], Value::Long(5));
    }

    #[test]
    fn mismatched_stored_variant_propagates() {
        let p = prefs(Defaults::new());
        p.save("n", 5i64).unwrap();
        let err = p.get_int("n").unwrap_err();
        assert!(
            matches!(
                err,
                PrefError::Store(StoreError::TypeMismatch {
                    expected: ValueKind::Int,
                    found: ValueKind::Long,
                    ..
                })
            ),
            "expected TypeMismatch, got: {err}"
        );
    }

    #[test]
    fn mismatched_default_falls_back_to_zero_value() {
        let defaults: Defaults = [("timeout", "thirty")].into_iter().collect();
        let p = prefs(defaults);
        assert_eq!(p.get_int("timeout").unwrap(), 0);
        assert_eq!(p.get_string("timeout").unwrap(), "thirty");
    }

    #[test]
    fn unsupported_error_names_key() {
        let p = prefs(Defaults::new());
        let err = p.save("nested", json!({"a": 1})).unwrap_err();
        match err {
            PrefError::UnsupportedValueType { key, .. } => assert_eq!(key, "nested"),
            other => panic!("expected UnsupportedValueType, got: {other}"),
        }

        let message = p.save("mixed", json!([1, 2])).unwrap_err().to_string();
        assert!(message.contains("mixed"), "{message}");
        assert!(message.contains("[1,2]"), "{message}");
    }

    #[test]
    fn shared_store_between_accessors() {
        let store = InMemoryStore::new();
        let a = PreferenceStore::without_defaults(&store);
        let b = PreferenceStore::without_defaults(&store);
        a.save("shared", "from-a").unwrap();
        assert_eq!(b.get_string("shared").unwrap(), "from-a");
        assert!(a.store().contains("shared").unwrap());
    }
}
