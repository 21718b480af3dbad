//! Loosely-typed primitive value carried by property bags and the output cache
//!
//! Authoring tools hand us numbers as strings, booleans as integers, and so
//! on. `Value` keeps whatever arrived and offers two families of coercion:
//! the `coerce_*` methods return `None` when the value cannot be interpreted,
//! and the total `to_*` methods never fail (unparseable becomes `false`/`0`).

use std::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Value Kind
// ─────────────────────────────────────────────────────────────────────────────

/// Primitive kinds a property can be declared as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    String,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Int => write!(f, "int"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::String => write!(f, "string"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Value
// ─────────────────────────────────────────────────────────────────────────────

/// Tagged primitive value
///
/// Serializes to and from plain JSON primitives. Deserialization never fails:
/// arrays and objects degrade to their JSON text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// The kind of the stored value, `None` for null
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Float(_) => Some(ValueKind::Float),
            Value::String(_) => Some(ValueKind::String),
        }
    }

    /// Get as string reference (no coercion)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Partial coercions
    // ─────────────────────────────────────────────────────────────────────

    /// Interpret as a boolean if the value has an obvious boolean reading
    pub fn coerce_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("false") || s.eq_ignore_ascii_case("no") {
                    Some(false)
                } else {
                    s.parse::<f64>().ok().map(|n| n != 0.0)
                }
            }
            Value::Null => None,
        }
    }

    /// Interpret as an integer; floats truncate toward zero
    pub fn coerce_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.is_finite() => Some(*f as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
            }
            _ => None,
        }
    }

    /// Interpret as a float
    pub fn coerce_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Null => None,
        }
    }

    /// Interpret as text; null has no text
    pub fn coerce_string(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Total coercions
    // ─────────────────────────────────────────────────────────────────────

    /// Boolean reading, `false` when unparseable
    pub fn to_bool(&self) -> bool {
        self.coerce_bool().unwrap_or(false)
    }

    /// Integer reading, `0` when unparseable
    pub fn to_int(&self) -> i64 {
        self.coerce_int().unwrap_or(0)
    }

    /// Float reading, `0.0` when unparseable
    pub fn to_float(&self) -> f64 {
        self.coerce_float().unwrap_or(0.0)
    }

    /// Text reading, empty for null
    pub fn to_text(&self) -> String {
        self.coerce_string().unwrap_or_default()
    }

    /// Compare two values for ordering, numerically when both sides read as numbers
    pub fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => match (self.coerce_float(), other.coerce_float()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => Some(a.cmp(b)),
            },
            _ => {
                let a = self.coerce_float()?;
                let b = other.coerce_float()?;
                a.partial_cmp(&b)
            }
        }
    }

    /// Loose equality used by authored comparisons: numeric when both sides
    /// read as numbers, case-insensitive text otherwise
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Bool(a), b) | (b, Value::Bool(a)) => b.coerce_bool() == Some(*a),
            _ => match (self.coerce_float(), other.coerce_float()) {
                (Some(a), Some(b)) => a == b,
                _ => self.to_text().eq_ignore_ascii_case(&other.to_text()),
            },
        }
    }
}

/// Kind-aware equality: `Int(3) == Float(3.0)`, strings compare exactly
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// From Implementations
// ─────────────────────────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// serde_json::Value Interop
// ─────────────────────────────────────────────────────────────────────────────

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Null
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Value::String(nested.to_string())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_strings_coerce() {
        assert_eq!(Value::from("42").coerce_int(), Some(42));
        assert_eq!(Value::from(" 2.5 ").coerce_float(), Some(2.5));
        assert_eq!(Value::from("7.9").coerce_int(), Some(7));
        assert_eq!(Value::from("TRUE").coerce_bool(), Some(true));
        assert_eq!(Value::from("0").coerce_bool(), Some(false));
    }

    #[test]
    fn test_total_coercions_never_fail() {
        let junk = Value::from("not a number");
        assert_eq!(junk.coerce_int(), None);
        assert_eq!(junk.to_int(), 0);
        assert_eq!(junk.to_float(), 0.0);
        assert!(!junk.to_bool());
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::Float(f64::NAN).coerce_int(), None);
    }

    #[test]
    fn test_kind_aware_equality() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
        assert_ne!(Value::Int(3), Value::from("3"));
        assert_ne!(Value::from("Gate"), Value::from("gate"));
        assert!(Value::from("Gate").loosely_equals(&Value::from("gate")));
        assert!(Value::from("3").loosely_equals(&Value::Int(3)));
        assert!(Value::Bool(true).loosely_equals(&Value::from("yes")));
    }

    #[test]
    fn test_compare() {
        use std::cmp::Ordering;
        assert_eq!(Value::Int(2).compare(&Value::from("10")), Some(Ordering::Less));
        assert_eq!(Value::from("b").compare(&Value::from("a")), Some(Ordering::Greater));
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_json_deserialization_is_lenient() {
        let values: Vec<Value> =
            serde_json::from_str(r#"[null, true, 5, 1.5, "x", [1, 2], {"a": 1}]"#).unwrap();
        assert!(matches!(values[0], Value::Null));
        assert_eq!(values[1], Value::Bool(true));
        assert_eq!(values[2], Value::Int(5));
        assert_eq!(values[3], Value::Float(1.5));
        assert_eq!(values[4].as_str(), Some("x"));
        assert_eq!(values[5].as_str(), Some("[1,2]"));
        assert_eq!(values[6].kind(), Some(ValueKind::String));
    }
}
