//! Dynamic cell values.
//!
//! [`Value`] is the plain, decoded form of a wire [`TypedValue`]. It flows in two
//! directions: rows are materialized into `Value`s (see [`row`](crate::row)), and
//! `Value`s are bound as statement parameters through [`Value::to_typed_value`].
use std::fmt;

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::protocol::proto::{Rep, TypedValue};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    DateTime(DateTime<Utc>),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Best-effort conversion to a wire value for parameter binding.
    ///
    /// Integral doubles are sent as `LONG`, date-times as `LONG` epoch millis, and an
    /// array takes its component type from its first element (`OBJECT` when empty).
    pub fn to_typed_value(&self) -> TypedValue {
        match self {
            Value::Null => TypedValue {
                r#type: Rep::Null as i32,
                null: true,
                ..Default::default()
            },
            Value::String(s) => TypedValue {
                r#type: Rep::String as i32,
                string_value: s.clone(),
                ..Default::default()
            },
            Value::Int(n) => long(*n),
            Value::Double(d) if is_integral(*d) => long(*d as i64),
            Value::Double(d) => TypedValue {
                r#type: Rep::Double as i32,
                double_value: *d,
                ..Default::default()
            },
            Value::Bool(b) => TypedValue {
                r#type: Rep::Boolean as i32,
                bool_value: *b,
                ..Default::default()
            },
            Value::DateTime(dt) => long(dt.timestamp_millis()),
            Value::Bytes(bytes) => TypedValue {
                r#type: Rep::ByteString as i32,
                bytes_value: bytes.clone(),
                ..Default::default()
            },
            Value::Array(items) => {
                let array_value = items.iter().map(Value::to_typed_value).collect::<Vec<_>>();
                let component_type = array_value
                    .first()
                    .map(|v| v.r#type)
                    .unwrap_or(Rep::Object as i32);
                TypedValue {
                    r#type: Rep::Array as i32,
                    component_type,
                    array_value,
                    ..Default::default()
                }
            }
        }
    }

    /// JSON rendering used by the JSON output format.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(_) | Value::DateTime(_) => serde_json::Value::String(self.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

fn long(n: i64) -> TypedValue {
    TypedValue {
        r#type: Rep::Long as i32,
        number_value: n,
        ..Default::default()
    }
}

fn is_integral(d: f64) -> bool {
    d.is_finite() && d.fract() == 0.0 && d >= i64::MIN as f64 && d <= i64::MAX as f64
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
            Value::Bytes(bytes) => f.write_str(&general_purpose::STANDARD.encode(bytes)),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Parameters given on the command line arrive as JSON. Objects have no wire
/// representation and are bound as their JSON text.
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n
                    .as_f64()
                    .map(Value::Double)
                    .unwrap_or_else(|| Value::String(n.to_string())),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            other @ serde_json::Value::Object(_) => Value::String(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn null_binds_with_null_flag() {
        let tv = Value::Null.to_typed_value();
        assert!(tv.null);
        assert_eq!(tv.rep(), Some(Rep::Null));
    }

    #[test]
    fn numbers_bind_by_integrality() {
        let tv = Value::Int(42).to_typed_value();
        assert_eq!((tv.rep(), tv.number_value), (Some(Rep::Long), 42));

        let tv = Value::Double(3.0).to_typed_value();
        assert_eq!((tv.rep(), tv.number_value), (Some(Rep::Long), 3));

        let tv = Value::Double(2.5).to_typed_value();
        assert_eq!((tv.rep(), tv.double_value), (Some(Rep::Double), 2.5));

        let tv = Value::Double(f64::NAN).to_typed_value();
        assert_eq!(tv.rep(), Some(Rep::Double));
    }

    #[test]
    fn scalars_bind_to_matching_tags() {
        let tv = Value::from("x").to_typed_value();
        assert_eq!((tv.rep(), tv.string_value.as_str()), (Some(Rep::String), "x"));

        let tv = Value::Bool(true).to_typed_value();
        assert_eq!((tv.rep(), tv.bool_value), (Some(Rep::Boolean), true));

        let tv = Value::Bytes(vec![1, 2]).to_typed_value();
        assert_eq!(tv.rep(), Some(Rep::ByteString));
        assert_eq!(tv.bytes_value, vec![1, 2]);
    }

    #[test]
    fn datetime_binds_as_epoch_millis() {
        let dt = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let tv = Value::DateTime(dt).to_typed_value();
        assert_eq!(tv.rep(), Some(Rep::Long));
        assert_eq!(tv.number_value, 1_700_000_000_123);
    }

    #[test]
    fn array_component_type_comes_from_first_element() {
        let tv = Value::Array(vec!["a".into(), "b".into()]).to_typed_value();
        assert_eq!(tv.rep(), Some(Rep::Array));
        assert_eq!(tv.component_type, Rep::String as i32);
        assert_eq!(tv.array_value.len(), 2);

        let tv = Value::Array(vec![]).to_typed_value();
        assert_eq!(tv.component_type, Rep::Object as i32);
    }

    #[test]
    fn json_objects_fall_back_to_strings() {
        let value = Value::from(serde_json::json!({"a": 1}));
        assert_eq!(value, Value::String("{\"a\":1}".into()));

        let value = Value::from(serde_json::json!([1, 2.5, null]));
        assert_eq!(
            value,
            Value::Array(vec![Value::Int(1), Value::Double(2.5), Value::Null])
        );
    }

    #[test]
    fn display_renders_bytes_and_dates() {
        assert_eq!(Value::Bytes(b"hi".to_vec()).to_string(), "aGk=");
        let dt = Utc.timestamp_millis_opt(0).unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "1970-01-01T00:00:00.000Z");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}
