//! `RpcValue` - a tagged sum over every JSON-RPC argument or result value.
//!
//! Conversions to and from `serde_json::Value` are total: every JSON value
//! maps to exactly one variant and back without loss. The only wire-level
//! ambiguity is numeric: integers and doubles are distinct variants, but a
//! whole-valued double is only recognizable as such when the JSON text
//! carries a decimal point or exponent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Any JSON-RPC argument or result value.
///
/// Structural equality; `Dict` key order is not preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcValue {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Boolean(bool),
    /// JSON number without decimal point or exponent.
    Integer(i64),
    /// JSON number with decimal point or exponent, or outside i64 range.
    Double(f64),
    /// JSON string.
    String(String),
    /// JSON array.
    List(Vec<RpcValue>),
    /// JSON object.
    Dict(HashMap<String, RpcValue>),
}

impl RpcValue {
    /// True if this is the `Null` variant.
    pub fn is_null(&self) -> bool {
        matches!(self, RpcValue::Null)
    }

    /// The string payload, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RpcValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is an `Integer`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RpcValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// The numeric payload widened to f64, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RpcValue::Integer(n) => Some(*n as f64),
            RpcValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// The boolean payload, if this is a `Boolean`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RpcValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The element sequence, if this is a `List`.
    pub fn as_list(&self) -> Option<&[RpcValue]> {
        match self {
            RpcValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// The key/value mapping, if this is a `Dict`.
    pub fn as_dict(&self) -> Option<&HashMap<String, RpcValue>> {
        match self {
            RpcValue::Dict(map) => Some(map),
            _ => None,
        }
    }
}

impl From<Value> for RpcValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RpcValue::Null,
            Value::Bool(b) => RpcValue::Boolean(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RpcValue::Integer(i)
                } else {
                    // u64 beyond i64::MAX or a fractional/exponent literal
                    RpcValue::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => RpcValue::String(s),
            Value::Array(items) => {
                RpcValue::List(items.into_iter().map(RpcValue::from).collect())
            }
            Value::Object(map) => RpcValue::Dict(
                map.into_iter().map(|(k, v)| (k, RpcValue::from(v))).collect(),
            ),
        }
    }
}

impl From<RpcValue> for Value {
    fn from(value: RpcValue) -> Self {
        match value {
            RpcValue::Null => Value::Null,
            RpcValue::Boolean(b) => Value::Bool(b),
            RpcValue::Integer(n) => Value::from(n),
            RpcValue::Double(d) => Value::from(d),
            RpcValue::String(s) => Value::String(s),
            RpcValue::List(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            RpcValue::Dict(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for RpcValue {
    fn from(s: &str) -> Self {
        RpcValue::String(s.to_string())
    }
}

impl From<String> for RpcValue {
    fn from(s: String) -> Self {
        RpcValue::String(s)
    }
}

impl From<i64> for RpcValue {
    fn from(n: i64) -> Self {
        RpcValue::Integer(n)
    }
}

impl From<f64> for RpcValue {
    fn from(d: f64) -> Self {
        RpcValue::Double(d)
    }
}

impl From<bool> for RpcValue {
    fn from(b: bool) -> Self {
        RpcValue::Boolean(b)
    }
}

impl From<Vec<RpcValue>> for RpcValue {
    fn from(items: Vec<RpcValue>) -> Self {
        RpcValue::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_json_value_maps_to_one_variant() {
        assert_eq!(RpcValue::from(json!(null)), RpcValue::Null);
        assert_eq!(RpcValue::from(json!(true)), RpcValue::Boolean(true));
        assert_eq!(RpcValue::from(json!(42)), RpcValue::Integer(42));
        assert_eq!(RpcValue::from(json!(-7)), RpcValue::Integer(-7));
        assert_eq!(RpcValue::from(json!(1.5)), RpcValue::Double(1.5));
        assert_eq!(
            RpcValue::from(json!("hi")),
            RpcValue::String("hi".to_string())
        );
        assert_eq!(
            RpcValue::from(json!([1, "a"])),
            RpcValue::List(vec![
                RpcValue::Integer(1),
                RpcValue::String("a".to_string())
            ])
        );

        let dict = RpcValue::from(json!({"k": 1}));
        assert_eq!(
            dict.as_dict().unwrap().get("k"),
            Some(&RpcValue::Integer(1))
        );
    }

    #[test]
    fn test_u64_beyond_i64_becomes_double() {
        let big = u64::MAX;
        let value = RpcValue::from(json!(big));
        assert!(matches!(value, RpcValue::Double(_)));
    }

    #[test]
    fn test_round_trip_through_json_value() {
        let original = RpcValue::Dict(HashMap::from([
            ("name".to_string(), RpcValue::String("calc".to_string())),
            (
                "args".to_string(),
                RpcValue::List(vec![
                    RpcValue::Integer(1),
                    RpcValue::Double(2.5),
                    RpcValue::Boolean(false),
                    RpcValue::Null,
                ]),
            ),
        ]));

        let json = Value::from(original.clone());
        assert_eq!(RpcValue::from(json), original);
    }

    #[test]
    fn test_round_trip_through_wire_text() {
        let original = RpcValue::List(vec![
            RpcValue::Integer(3),
            RpcValue::Double(0.25),
            RpcValue::String("x".to_string()),
        ]);

        let text = serde_json::to_string(&original).unwrap();
        let back: RpcValue = serde_json::from_str(&text).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_integer_double_tag_on_wire() {
        // "3" has no decimal point, "3.0" does
        let int: RpcValue = serde_json::from_str("3").unwrap();
        assert_eq!(int, RpcValue::Integer(3));

        let dbl: RpcValue = serde_json::from_str("3.0").unwrap();
        assert_eq!(dbl, RpcValue::Double(3.0));
    }

    #[test]
    fn test_null_serializes_as_json_null() {
        assert_eq!(serde_json::to_string(&RpcValue::Null).unwrap(), "null");
    }

    #[test]
    fn test_accessors() {
        assert!(RpcValue::Null.is_null());
        assert_eq!(RpcValue::from("s").as_str(), Some("s"));
        assert_eq!(RpcValue::from(5i64).as_i64(), Some(5));
        assert_eq!(RpcValue::from(5i64).as_f64(), Some(5.0));
        assert_eq!(RpcValue::from(true).as_bool(), Some(true));
        assert!(RpcValue::from(vec![]).as_list().unwrap().is_empty());
        assert_eq!(RpcValue::from(1.0).as_i64(), None);
    }
}
