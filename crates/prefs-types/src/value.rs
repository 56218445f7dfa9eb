use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// The shape of a stored preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Bool,
    Long,
    Int,
    Float,
    StringSet,
}

impl ValueKind {
    /// All kinds, in declaration order.
    pub const ALL: [ValueKind; 6] = [
        Self::String,
        Self::Bool,
        Self::Long,
        Self::Int,
        Self::Float,
        Self::StringSet,
    ];

    /// The implicit default used when no default is registered for a key.
    pub fn zero_value(self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Bool => Value::Bool(false),
            Self::Long => Value::Long(0),
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::StringSet => Value::StringSet(BTreeSet::new()),
        }
    }

    /// Canonical lowercase name, as used in serialized values.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Long => "long",
            Self::Int => "int",
            Self::Float => "float",
            Self::StringSet => "string_set",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(Self::String),
            "bool" | "boolean" => Ok(Self::Bool),
            "long" | "i64" => Ok(Self::Long),
            "int" | "i32" => Ok(Self::Int),
            "float" | "f32" => Ok(Self::Float),
            "string_set" | "string-set" | "set" => Ok(Self::StringSet),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

/// A preference value.
///
/// Exactly six shapes are representable. Serialized adjacently tagged so the
/// variant survives persistence: `{"type": "int", "value": 30}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Bool(bool),
    Long(i64),
    Int(i32),
    Float(f32),
    StringSet(BTreeSet<String>),
}

impl Value {
    /// The variant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Bool(_) => ValueKind::Bool,
            Self::Long(_) => ValueKind::Long,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::StringSet(_) => ValueKind::StringSet,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_string_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::StringSet(set) => Some(set),
            _ => None,
        }
    }

    /// Whether the value can be persisted. Floats must be finite.
    pub fn is_storable(&self) -> bool {
        match self {
            Self::Float(x) => x.is_finite(),
            _ => true,
        }
    }

    /// Parse a textual literal as the given kind.
    ///
    /// String sets are comma-separated; surrounding whitespace of each member
    /// is trimmed and an empty input yields the empty set.
    pub fn parse(kind: ValueKind, input: &str) -> TypeResult<Self> {
        let invalid = |reason: String| TypeError::InvalidLiteral {
            kind,
            input: input.to_string(),
            reason,
        };
        match kind {
            ValueKind::String => Ok(Self::String(input.to_string())),
            ValueKind::Bool => input
                .trim()
                .parse::<bool>()
                .map(Self::Bool)
                .map_err(|e| invalid(e.to_string())),
            ValueKind::Long => input
                .trim()
                .parse::<i64>()
                .map(Self::Long)
                .map_err(|e| invalid(e.to_string())),
            ValueKind::Int => input
                .trim()
                .parse::<i32>()
                .map(Self::Int)
                .map_err(|e| invalid(e.to_string())),
            ValueKind::Float => match input.trim().parse::<f32>() {
                Ok(x) if x.is_finite() => Ok(Self::Float(x)),
                Ok(_) => Err(invalid("not a finite number".into())),
                Err(e) => Err(invalid(e.to_string())),
            },
            ValueKind::StringSet => Ok(Self::StringSet(
                input
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Long(n) => write!(f, "{n}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::StringSet(set) => {
                let joined: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<BTreeSet<String>> for Value {
    fn from(v: BTreeSet<String>) -> Self {
        Self::StringSet(v)
    }
}

impl From<HashSet<String>> for Value {
    fn from(v: HashSet<String>) -> Self {
        Self::StringSet(v.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Construction boundary
// ---------------------------------------------------------------------------

/// Conversion of a caller-supplied value into a preference value.
///
/// `Ok(None)` means "no value": the write path removes the key. Anything that
/// cannot be represented fails here, before any write is staged.
pub trait IntoValue {
    fn into_value(self) -> TypeResult<Option<Value>>;
}

macro_rules! infallible_into_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> TypeResult<Option<Value>> {
                    Ok(Some(Value::from(self)))
                }
            }
        )*
    };
}

infallible_into_value!(String, &str, bool, i64, i32, BTreeSet<String>, HashSet<String>);

impl IntoValue for f32 {
    fn into_value(self) -> TypeResult<Option<Value>> {
        storable(Value::Float(self)).map(Some)
    }
}

impl IntoValue for Value {
    fn into_value(self) -> TypeResult<Option<Value>> {
        storable(self).map(Some)
    }
}

impl IntoValue for &Value {
    fn into_value(self) -> TypeResult<Option<Value>> {
        storable(self.clone()).map(Some)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> TypeResult<Option<Value>> {
        match self {
            Some(inner) => inner.into_value(),
            None => Ok(None),
        }
    }
}

/// Integers that fit 32 bits become `Int`, wider ones `Long`.
fn integer_value(n: i64) -> Value {
    match i32::try_from(n) {
        Ok(small) => Value::Int(small),
        Err(_) => Value::Long(n),
    }
}

fn storable(value: Value) -> TypeResult<Value> {
    if value.is_storable() {
        Ok(value)
    } else {
        Err(TypeError::Unsupported {
            value: value.to_string(),
        })
    }
}

/// Narrow to `f32`, rounding to the nearest representable value.
/// NaN, infinities, overflow and underflow to zero are rejected.
fn float_value(x: f64, original: &dyn fmt::Display) -> TypeResult<Value> {
    let narrowed = x as f32;
    if !narrowed.is_finite() || (narrowed == 0.0 && x != 0.0) {
        return Err(TypeError::Unsupported {
            value: original.to_string(),
        });
    }
    Ok(Value::Float(narrowed))
}

impl IntoValue for serde_json::Value {
    fn into_value(self) -> TypeResult<Option<Value>> {
        use serde_json::Value as Json;

        let unsupported = |v: &Json| TypeError::Unsupported {
            value: v.to_string(),
        };
        match &self {
            Json::Null => Ok(None),
            Json::Bool(b) => Ok(Some(Value::Bool(*b))),
            Json::String(s) => Ok(Some(Value::String(s.clone()))),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Some(integer_value(i)))
                } else if n.is_u64() {
                    Err(unsupported(&self))
                } else {
                    let x = n.as_f64().ok_or_else(|| unsupported(&self))?;
                    float_value(x, n).map(Some)
                }
            }
            Json::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<BTreeSet<String>>>()
                .map(|set| Some(Value::StringSet(set)))
                .ok_or_else(|| unsupported(&self)),
            Json::Object(_) => Err(unsupported(&self)),
        }
    }
}

impl IntoValue for toml::Value {
    fn into_value(self) -> TypeResult<Option<Value>> {
        use toml::Value as Toml;

        let unsupported = |v: &Toml| TypeError::Unsupported {
            value: v.to_string(),
        };
        match &self {
            Toml::String(s) => Ok(Some(Value::String(s.clone()))),
            Toml::Boolean(b) => Ok(Some(Value::Bool(*b))),
            Toml::Integer(i) => Ok(Some(integer_value(*i))),
            Toml::Float(x) => float_value(*x, x).map(Some),
            Toml::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<BTreeSet<String>>>()
                .map(|set| Some(Value::StringSet(set)))
                .ok_or_else(|| unsupported(&self)),
            Toml::Datetime(_) | Toml::Table(_) => Err(unsupported(&self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn zero_values_match_kind() {
        for kind in ValueKind::ALL {
            assert_eq!(kind.zero_value().kind(), kind);
        }
        assert_eq!(ValueKind::String.zero_value(), Value::String(String::new()));
        assert_eq!(ValueKind::Float.zero_value(), Value::Float(0.0));
        assert_eq!(ValueKind::StringSet.zero_value(), Value::StringSet(BTreeSet::new()));
    }

    #[test]
    fn kind_names_parse_back() {
        for kind in ValueKind::ALL {
            assert_eq!(kind.as_str().parse::<ValueKind>().unwrap(), kind);
        }
        assert_eq!("Boolean".parse::<ValueKind>().unwrap(), ValueKind::Bool);
        assert!(matches!(
            "double".parse::<ValueKind>(),
            Err(TypeError::UnknownKind(_))
        ));
    }

    #[test]
    fn serialized_form_is_tagged() {
        let json = serde_json::to_value(Value::Int(30)).unwrap();
        assert_eq!(json, json!({"type": "int", "value": 30}));

        let back: Value = serde_json::from_value(json!({"type": "long", "value": 30})).unwrap();
        assert_eq!(back, Value::Long(30));

        let json = serde_json::to_value(Value::StringSet(set(&["b", "a"]))).unwrap();
        assert_eq!(json, json!({"type": "string_set", "value": ["a", "b"]}));
    }

    #[test]
    fn parse_literals() {
        assert_eq!(Value::parse(ValueKind::Int, " 42 ").unwrap(), Value::Int(42));
        assert_eq!(
            Value::parse(ValueKind::Long, "9000000000").unwrap(),
            Value::Long(9_000_000_000)
        );
        assert_eq!(Value::parse(ValueKind::Bool, "true").unwrap(), Value::Bool(true));
        assert_eq!(Value::parse(ValueKind::Float, "1.5").unwrap(), Value::Float(1.5));
        assert_eq!(
            Value::parse(ValueKind::StringSet, "wifi, cellular,,").unwrap(),
            Value::StringSet(set(&["cellular", "wifi"]))
        );
        assert_eq!(
            Value::parse(ValueKind::StringSet, "").unwrap(),
            Value::StringSet(BTreeSet::new())
        );
    }

    #[test]
    fn parse_rejects_bad_literal() {
        let err = Value::parse(ValueKind::Int, "9000000000").unwrap_err();
        assert!(matches!(
            err,
            TypeError::InvalidLiteral { kind: ValueKind::Int, .. }
        ));
        assert!(Value::parse(ValueKind::Bool, "yes").is_err());
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        for literal in ["NaN", "inf", "-infinity"] {
            let err = Value::parse(ValueKind::Float, literal).unwrap_err();
            assert!(
                matches!(err, TypeError::InvalidLiteral { kind: ValueKind::Float, .. }),
                "expected InvalidLiteral for {literal}"
            );
        }
        for x in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(!Value::Float(x).is_storable());
            assert!(matches!(x.into_value(), Err(TypeError::Unsupported { .. })));
            assert!(matches!(Value::Float(x).into_value(), Err(TypeError::Unsupported { .. })));
            assert!(matches!((&Value::Float(x)).into_value(), Err(TypeError::Unsupported { .. })));
        }
        assert_eq!(0.0f32.into_value().unwrap(), Some(Value::Float(0.0)));
        assert_eq!(f32::MIN_POSITIVE.into_value().unwrap(), Some(Value::Float(f32::MIN_POSITIVE)));
    }

    #[test]
    fn toml_non_finite_and_underflow_are_rejected() {
        let table: toml::Table = "a = nan\nb = inf\nc = 1e-50\nd = 0.0\ne = 0.1".parse().unwrap();
        for key in ["a", "b", "c"] {
            assert!(
                matches!(table[key].clone().into_value(), Err(TypeError::Unsupported { .. })),
                "expected Unsupported for {key}"
            );
        }
        assert_eq!(table["d"].clone().into_value().unwrap(), Some(Value::Float(0.0)));
        assert_eq!(table["e"].clone().into_value().unwrap(), Some(Value::Float(0.1)));
    }

    #[test]
    fn display_joins_sets() {
        assert_eq!(Value::StringSet(set(&["b", "a"])).to_string(), "a,b");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }

    #[test]
    fn option_none_is_absent() {
        let absent: Option<i32> = None;
        assert_eq!(absent.into_value().unwrap(), None);
        assert_eq!(Some("x").into_value().unwrap(), Some(Value::from("x")));
    }

    #[test]
    fn json_conversion() {
        assert_eq!(json!(null).into_value().unwrap(), None);
        assert_eq!(json!(7).into_value().unwrap(), Some(Value::Int(7)));
        assert_eq!(
            json!(5_000_000_000i64).into_value().unwrap(),
            Some(Value::Long(5_000_000_000))
        );
        assert_eq!(json!(0.5).into_value().unwrap(), Some(Value::Float(0.5)));
        assert_eq!(
            json!(["x", "y"]).into_value().unwrap(),
            Some(Value::StringSet(set(&["x", "y"])))
        );
    }

    #[test]
    fn json_unsupported_shapes() {
        for bad in [json!({"nested": 1}), json!([1, 2]), json!(u64::MAX), json!(1e300), json!(1e-50)] {
            let err = bad.clone().into_value().unwrap_err();
            assert!(
                matches!(err, TypeError::Unsupported { .. }),
                "expected Unsupported for {bad}"
            );
        }
    }

    #[test]
    fn toml_conversion() {
        let table: toml::Table = "a = 1\nb = [\"x\"]\nc = 2024-01-01".parse().unwrap();
        assert_eq!(
            table["a"].clone().into_value().unwrap(),
            Some(Value::Int(1))
        );
        assert_eq!(
            table["b"].clone().into_value().unwrap(),
            Some(Value::StringSet(set(&["x"])))
        );
        assert!(table["c"].clone().into_value().is_err());
    }
}
