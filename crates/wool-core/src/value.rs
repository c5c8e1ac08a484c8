use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Map payload of [`Value::Map`]; iterates in insertion order.
pub type ValueMap = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(ValueMap),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Truth value used by conditions and the logical operators.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(value) => *value,
            Self::Int(value) => *value != 0,
            Self::Float(value) => *value != 0.0,
            Self::String(value) => !value.is_empty(),
            Self::List(values) => !values.is_empty(),
            Self::Map(values) => !values.is_empty(),
        }
    }

    /// Structural equality where integers and floats compare by numeric value.
    /// Maps compare by entries, not by order. Never fails, whatever the
    /// operand types.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (a, b) if a.is_number() && b.is_number() => a.as_f64() == b.as_f64(),
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, value)| b.get(key).is_some_and(|other| value.equals(other)))
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{:?}", value),
            Self::String(value) => write!(f, "{}", value),
            Self::List(values) => {
                write!(f, "[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Self::Map(values) => {
                write!(f, "{{")?;
                for (index, (key, value)) in values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::List(values)
    }
}

impl From<ValueMap> for Value {
    fn from(values: ValueMap) -> Self {
        Self::Map(values)
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(entries: I) -> Self {
        Self::Map(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod value_tests {
    use super::*;

    #[test]
    fn equals_is_numeric_across_int_and_float() {
        assert!(Value::Int(2).equals(&Value::Float(2.0)));
        assert!(!Value::Int(2).equals(&Value::String("2".to_string())));
        assert!(!Value::Null.equals(&Value::Bool(false)));
        assert!(Value::List(vec![Value::Int(1)]).equals(&Value::List(vec![Value::Float(1.0)])));
    }

    #[test]
    fn truthiness_follows_emptiness_and_zero() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::String("x".to_string()).is_truthy());
        assert!(!Value::List(Vec::new()).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
    }

    #[test]
    fn display_renders_floats_with_fraction() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Int(6).to_string(), "6");
        let list = Value::List(vec![Value::Int(1), Value::String("a".to_string())]);
        assert_eq!(list.to_string(), "[1, a]");
    }

    #[test]
    fn serde_keeps_integers_apart_from_floats() {
        let parsed: Value =
            serde_json::from_str(r#"{"a":1,"b":1.5,"c":null,"d":[true]}"#).expect("json");
        let Value::Map(map) = parsed else {
            panic!("expected map");
        };
        assert_eq!(map.get("a"), Some(&Value::Int(1)));
        assert_eq!(map.get("b"), Some(&Value::Float(1.5)));
        assert_eq!(map.get("c"), Some(&Value::Null));
        assert_eq!(map.get("d"), Some(&Value::List(vec![Value::Bool(true)])));
    }

    #[test]
    fn maps_keep_insertion_order() {
        let map: Value = [("b", 1), ("a", 2)]
            .into_iter()
            .map(|(key, value)| (key.to_string(), Value::from(value)))
            .collect();
        assert_eq!(map.to_string(), "{b: 1, a: 2}");
        assert_eq!(
            serde_json::to_string(&map).expect("map should serialize"),
            r#"{"b":1,"a":2}"#
        );

        let parsed: Value = serde_json::from_str(r#"{"z":1,"y":2}"#).expect("json");
        assert_eq!(parsed.to_string(), "{z: 1, y: 2}");

        let reordered: Value = [("a", 2), ("b", 1)]
            .into_iter()
            .map(|(key, value)| (key.to_string(), Value::from(value)))
            .collect();
        assert!(map.equals(&reordered));
    }
}
