//! Row materialization.
//!
//! Turns the typed cells of a result [`Frame`](crate::frame::Frame) into [`Record`]s
//! keyed by column label, using the result's [`Signature`] to decide how ambiguous
//! cells decode.
//!
//! # Decoding rules
//!
//! 1. A cell with its null flag set is [`Value::Null`], whatever its tag.
//! 2. Integer tags decode as dates (days since epoch) or timestamps (millis since
//!    epoch) when the column's SQL type is `DATE` or `TIMESTAMP`, else as integers.
//! 3. Remaining known tags decode from their own payload field.
//! 4. Anything else falls back to the first populated payload, in the order
//!    string, number, double, bytes, array, boolean.
//!
//! The fallback order is observable: changing it changes decode results for loosely
//! tagged servers.
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::trace;

use crate::{
    protocol::proto::{ColumnMetaData, ColumnValue, Rep, Row, Signature, TypedValue},
    value::Value,
};

/// `java.sql.Types.DATE`
const SQL_DATE: u32 = 91;
/// `java.sql.Types.TIMESTAMP`
const SQL_TIMESTAMP: u32 = 93;
const MILLIS_PER_DAY: i64 = 86_400_000;

/// One materialized row. Fields keep column order; a repeated label overwrites the
/// earlier field's value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: Value) {
        let label = label.into();
        match self.fields.iter_mut().find(|(l, _)| *l == label) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&Value> {
        self.fields.iter().find(|(l, _)| l == label).map(|(_, v)| v)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(l, _)| l.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(l, v)| (l.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(l, v)| (l.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// Column labels in signature order, each listed once where it first appears, so
/// they line up with the fields of a [`Record`]. Unlabelled columns fall back to
/// their name, then to their ordinal.
pub fn column_labels(signature: Option<&Signature>) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    let columns = signature.map(|s| s.columns.as_slice()).unwrap_or_default();
    for (i, column) in columns.iter().enumerate() {
        let label = label_for(i, Some(column));
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Materializes every row of a page.
pub fn materialize(signature: Option<&Signature>, rows: &[Row]) -> Vec<Record> {
    let columns = signature.map(|s| s.columns.as_slice()).unwrap_or_default();
    trace!("materializing {} rows over {} columns", rows.len(), columns.len());

    rows.iter()
        .map(|row| {
            let mut record = Record::new();
            for (i, cell) in row.value.iter().enumerate() {
                let column = columns.get(i);
                record.insert(label_for(i, column), decode_cell(cell, column));
            }
            record
        })
        .collect()
}

fn label_for(ordinal: usize, column: Option<&ColumnMetaData>) -> String {
    match column {
        Some(c) if !c.label.is_empty() => c.label.clone(),
        Some(c) if !c.column_name.is_empty() => c.column_name.clone(),
        _ => ordinal.to_string(),
    }
}

pub fn decode_cell(cell: &ColumnValue, column: Option<&ColumnMetaData>) -> Value {
    if cell.has_array_value {
        return Value::Array(cell.array_value.iter().map(|v| decode_value(v, None)).collect());
    }
    match cell.scalar_value.as_ref().or(cell.value.first()) {
        Some(tv) => decode_value(tv, column),
        None => Value::Null,
    }
}

/// Decodes one typed value. `column` disambiguates integer-encoded dates.
pub fn decode_value(tv: &TypedValue, column: Option<&ColumnMetaData>) -> Value {
    if tv.null {
        return Value::Null;
    }

    let Some(rep) = tv.rep() else {
        return fallback(tv);
    };

    if rep.is_integral() {
        return match column.and_then(temporal_kind) {
            Some(Temporal::Date) => millis(tv.number_value.saturating_mul(MILLIS_PER_DAY)),
            Some(Temporal::Timestamp) => millis(tv.number_value),
            None => Value::Int(tv.number_value),
        };
    }

    match rep {
        Rep::PrimitiveBoolean | Rep::Boolean => Value::Bool(tv.bool_value),
        Rep::String | Rep::Character | Rep::PrimitiveChar => Value::String(tv.string_value.clone()),
        Rep::ByteString => Value::Bytes(tv.bytes_value.clone()),
        Rep::Array => Value::Array(tv.array_value.iter().map(|v| decode_value(v, None)).collect()),
        Rep::PrimitiveFloat | Rep::PrimitiveDouble | Rep::Float | Rep::Double => {
            Value::Double(tv.double_value)
        }
        r if r.is_temporal() => {
            if tv.number_value == 0 && !tv.string_value.is_empty() {
                parse_datetime(&tv.string_value)
                    .map(Value::DateTime)
                    .unwrap_or_else(|| Value::String(tv.string_value.clone()))
            } else {
                millis(tv.number_value)
            }
        }
        _ => fallback(tv),
    }
}

fn fallback(tv: &TypedValue) -> Value {
    if !tv.string_value.is_empty() {
        Value::String(tv.string_value.clone())
    } else if tv.number_value != 0 {
        Value::Int(tv.number_value)
    } else if tv.double_value != 0.0 {
        Value::Double(tv.double_value)
    } else if !tv.bytes_value.is_empty() {
        Value::Bytes(tv.bytes_value.clone())
    } else if !tv.array_value.is_empty() {
        Value::Array(tv.array_value.iter().map(|v| decode_value(v, None)).collect())
    } else if tv.bool_value {
        Value::Bool(true)
    } else {
        Value::Null
    }
}

enum Temporal {
    Date,
    Timestamp,
}

fn temporal_kind(column: &ColumnMetaData) -> Option<Temporal> {
    let ty = column.r#type.as_ref()?;
    let name = ty.name.to_ascii_uppercase();
    if ty.id == SQL_DATE || name == "DATE" {
        Some(Temporal::Date)
    } else if ty.id == SQL_TIMESTAMP || name.starts_with("TIMESTAMP") {
        Some(Temporal::Timestamp)
    } else {
        None
    }
}

fn millis(ms: i64) -> Value {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(Value::DateTime)
        .unwrap_or(Value::Int(ms))
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::protocol::proto::AvaticaType;

    use super::*;

    fn typed(rep: Rep) -> TypedValue {
        TypedValue {
            r#type: rep as i32,
            ..Default::default()
        }
    }

    fn column(label: &str, type_id: u32, type_name: &str) -> ColumnMetaData {
        ColumnMetaData {
            label: label.into(),
            r#type: Some(AvaticaType {
                id: type_id,
                name: type_name.into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn scalar(tv: TypedValue) -> ColumnValue {
        ColumnValue {
            scalar_value: Some(tv),
            ..Default::default()
        }
    }

    #[test]
    fn tagged_payloads_decode_to_input() {
        let tv = TypedValue {
            number_value: 42,
            ..typed(Rep::Long)
        };
        assert_eq!(decode_value(&tv, None), Value::Int(42));

        let tv = TypedValue {
            string_value: "x".into(),
            ..typed(Rep::String)
        };
        assert_eq!(decode_value(&tv, None), Value::String("x".into()));

        let tv = TypedValue {
            bool_value: true,
            ..typed(Rep::Boolean)
        };
        assert_eq!(decode_value(&tv, None), Value::Bool(true));

        let tv = TypedValue {
            double_value: 1.5,
            ..typed(Rep::Double)
        };
        assert_eq!(decode_value(&tv, None), Value::Double(1.5));

        let tv = TypedValue {
            bytes_value: vec![9, 8],
            ..typed(Rep::ByteString)
        };
        assert_eq!(decode_value(&tv, None), Value::Bytes(vec![9, 8]));
    }

    #[test]
    fn null_flag_wins_over_any_tag() {
        for rep in [Rep::Long, Rep::String, Rep::Boolean, Rep::Array, Rep::JavaSqlDate] {
            let tv = TypedValue {
                null: true,
                number_value: 7,
                string_value: "nope".into(),
                ..typed(rep)
            };
            assert_eq!(decode_value(&tv, None), Value::Null);
        }
    }

    #[test]
    fn integer_cells_follow_column_sql_type() {
        let days = TypedValue {
            number_value: 19_000,
            ..typed(Rep::Integer)
        };
        let date = column("d", 91, "DATE");
        assert_eq!(
            decode_value(&days, Some(&date)),
            Value::DateTime(Utc.timestamp_millis_opt(19_000 * 86_400_000).unwrap())
        );

        let ms = TypedValue {
            number_value: 1_700_000_000_000,
            ..typed(Rep::Long)
        };
        let ts = column("t", 93, "TIMESTAMP");
        assert_eq!(
            decode_value(&ms, Some(&ts)),
            Value::DateTime(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
        );

        let plain = column("n", 4, "INTEGER");
        assert_eq!(decode_value(&ms, Some(&plain)), Value::Int(1_700_000_000_000));
    }

    #[test]
    fn date_type_matched_by_name_alone() {
        let days = TypedValue {
            number_value: 1,
            ..typed(Rep::PrimitiveInt)
        };
        let date = column("d", 0, "date");
        assert_eq!(
            decode_value(&days, Some(&date)),
            Value::DateTime(Utc.timestamp_millis_opt(86_400_000).unwrap())
        );
    }

    #[test]
    fn temporal_tags_fall_back_to_string_payload() {
        let tv = TypedValue {
            number_value: 1_000,
            ..typed(Rep::JavaSqlTimestamp)
        };
        assert_eq!(
            decode_value(&tv, None),
            Value::DateTime(Utc.timestamp_millis_opt(1_000).unwrap())
        );

        let tv = TypedValue {
            string_value: "2024-03-01 12:30:00".into(),
            ..typed(Rep::JavaSqlDate)
        };
        assert_eq!(
            decode_value(&tv, None),
            Value::DateTime(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
        );
    }

    #[test]
    fn fallback_prefers_string_then_number() {
        let tv = TypedValue {
            string_value: "12.50".into(),
            number_value: 3,
            ..typed(Rep::BigDecimal)
        };
        assert_eq!(decode_value(&tv, None), Value::String("12.50".into()));

        let tv = TypedValue {
            number_value: 3,
            double_value: 4.0,
            ..typed(Rep::Object)
        };
        assert_eq!(decode_value(&tv, None), Value::Int(3));

        let tv = TypedValue {
            r#type: 999,
            double_value: 4.0,
            ..Default::default()
        };
        assert_eq!(decode_value(&tv, None), Value::Double(4.0));

        assert_eq!(decode_value(&typed(Rep::Object), None), Value::Null);
    }

    #[test]
    fn array_cells_decode_recursively() {
        let cell = ColumnValue {
            has_array_value: true,
            array_value: vec![
                TypedValue {
                    number_value: 1,
                    ..typed(Rep::Integer)
                },
                TypedValue {
                    null: true,
                    ..typed(Rep::Integer)
                },
            ],
            ..Default::default()
        };
        assert_eq!(
            decode_cell(&cell, None),
            Value::Array(vec![Value::Int(1), Value::Null])
        );
    }

    #[test]
    fn materialize_keys_rows_by_label() {
        let signature = Signature {
            columns: vec![column("a", 4, "INTEGER"), column("b", 12, "VARCHAR")],
            ..Default::default()
        };
        let rows = vec![Row {
            value: vec![
                scalar(TypedValue {
                    number_value: 5,
                    ..typed(Rep::Integer)
                }),
                scalar(TypedValue {
                    string_value: "five".into(),
                    ..typed(Rep::String)
                }),
            ],
        }];

        let records = materialize(Some(&signature), &rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("a"), Some(&Value::Int(5)));
        assert_eq!(records[0].get("b"), Some(&Value::String("five".into())));
        assert_eq!(records[0].labels().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn repeated_label_keeps_last_value() {
        let signature = Signature {
            columns: vec![column("x", 4, "INTEGER"), column("x", 4, "INTEGER")],
            ..Default::default()
        };
        let rows = vec![Row {
            value: vec![
                scalar(TypedValue {
                    number_value: 1,
                    ..typed(Rep::Integer)
                }),
                scalar(TypedValue {
                    number_value: 2,
                    ..typed(Rep::Integer)
                }),
            ],
        }];

        let records = materialize(Some(&signature), &rows);
        assert_eq!(records[0].len(), 1);
        assert_eq!(records[0].get("x"), Some(&Value::Int(2)));
    }

    #[test]
    fn column_labels_match_record_fields() {
        let signature = Signature {
            columns: vec![
                column("x", 4, "INTEGER"),
                column("y", 4, "INTEGER"),
                column("x", 4, "INTEGER"),
            ],
            ..Default::default()
        };
        assert_eq!(column_labels(Some(&signature)), vec!["x", "y"]);
        assert!(column_labels(None).is_empty());
    }

    #[test]
    fn missing_signature_uses_ordinals() {
        let rows = vec![Row {
            value: vec![ColumnValue::default()],
        }];
        let records = materialize(None, &rows);
        assert_eq!(records[0].get("0"), Some(&Value::Null));
    }
}
