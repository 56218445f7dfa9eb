//! The immutable default map consulted by typed reads and resets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::value::Value;

/// Table name under which a defaults document may nest its entries.
const DEFAULTS_TABLE: &str = "defaults";

/// Field that marks a table as a single tagged value rather than a section.
const TAG_FIELD: &str = "type";

/// Registered default values, keyed by preference name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Defaults {
    entries: BTreeMap<String, Value>,
}

impl Defaults {
    /// An empty default map: every key falls back to its zero-value.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Parse a TOML defaults document.
    ///
    /// Entries use the tagged value layout, either at the top level or
    /// under a `[defaults]` table:
    ///
    /// ```toml
    /// [defaults]
    /// timeout = { type = "int", value = 30 }
    /// server_url = { type = "string", value = "https://example.org" }
    /// ```
    pub fn from_toml_str(input: &str) -> TypeResult<Self> {
        let mut table: toml::Table = input
            .parse()
            .map_err(|e: toml::de::Error| TypeError::Parse(e.to_string()))?;

        let nested = match table.get(DEFAULTS_TABLE) {
            Some(toml::Value::Table(inner)) if table.len() == 1 && !inner.contains_key(TAG_FIELD) => {
                Some(inner.clone())
            }
            _ => None,
        };
        if let Some(inner) = nested {
            table = inner;
        }

        let entries: BTreeMap<String, Value> = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| TypeError::Parse(e.to_string()))?;
        Self::checked(entries)
    }

    /// Parse a JSON defaults document (same layout as [`Self::from_toml_str`]).
    pub fn from_json_str(input: &str) -> TypeResult<Self> {
        let mut doc: serde_json::Value =
            serde_json::from_str(input).map_err(|e| TypeError::Parse(e.to_string()))?;

        let nested = match &doc {
            serde_json::Value::Object(map) if map.len() == 1 => map
                .get(DEFAULTS_TABLE)
                .filter(|inner| inner.is_object() && inner.get(TAG_FIELD).is_none())
                .cloned(),
            _ => None,
        };
        if let Some(inner) = nested {
            doc = inner;
        }

        let entries: BTreeMap<String, Value> =
            serde_json::from_value(doc).map_err(|e| TypeError::Parse(e.to_string()))?;
        Self::checked(entries)
    }

    fn checked(entries: BTreeMap<String, Value>) -> TypeResult<Self> {
        match entries.values().find(|value| !value.is_storable()) {
            Some(bad) => Err(TypeError::Unsupported {
                value: bad.to_string(),
            }),
            None => Ok(Self { entries }),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Defaults
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, Value>> for Defaults {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a Defaults {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_float_default_is_rejected() {
        let err = Defaults::from_toml_str("ratio = { type = \"float\", value = nan }").unwrap_err();
        assert!(matches!(err, TypeError::Unsupported { .. }), "{err}");

        let ok = Defaults::from_toml_str("ratio = { type = \"float\", value = 0.25 }").unwrap();
        assert_eq!(ok.get("ratio"), Some(&Value::Float(0.25)));
    }

    #[test]
    fn collect_from_pairs() {
        let defaults: Defaults = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults.get("a"), Some(&Value::Int(1)));
        assert!(defaults.get("c").is_none());
    }

    #[test]
    fn toml_nested_table() {
        let defaults = Defaults::from_toml_str(
            r#"
            [defaults]
            timeout = { type = "int", value = 30 }
            protocols = { type = "string_set", value = ["odk", "google"] }
            "#,
        )
        .unwrap();
        assert_eq!(defaults.get("timeout"), Some(&Value::Int(30)));
        assert_eq!(
            defaults.get("protocols").map(Value::kind),
            Some(crate::ValueKind::StringSet)
        );
    }

    #[test]
    fn toml_flat_document() {
        let defaults = Defaults::from_toml_str(
            r#"
            autosend = { type = "bool", value = true }
            max_bytes = { type = "long", value = 10000000000 }
            "#,
        )
        .unwrap();
        assert_eq!(defaults.get("autosend"), Some(&Value::Bool(true)));
        assert_eq!(defaults.get("max_bytes"), Some(&Value::Long(10_000_000_000)));
    }

    #[test]
    fn toml_untagged_entry_is_rejected() {
        let err = Defaults::from_toml_str("timeout = 30").unwrap_err();
        assert!(matches!(err, TypeError::Parse(_)));
    }

    #[test]
    fn toml_single_entry_named_defaults() {
        let defaults =
            Defaults::from_toml_str(r#"defaults = { type = "bool", value = false }"#).unwrap();
        assert_eq!(defaults.get("defaults"), Some(&Value::Bool(false)));
    }

    #[test]
    fn json_document() {
        let defaults = Defaults::from_json_str(
            r#"{"defaults": {"ratio": {"type": "float", "value": 0.25}}}"#,
        )
        .unwrap();
        assert_eq!(defaults.get("ratio"), Some(&Value::Float(0.25)));
    }

    #[test]
    fn json_malformed() {
        assert!(matches!(
            Defaults::from_json_str("{not json"),
            Err(TypeError::Parse(_))
        ));
    }
}
