//! Conversion between primary-key values and child names.
//!
//! Every child of a collection is addressed by a string name derived from its
//! primary key. [`KeyCodec`] is the seam: collections use [`ColumnCodec`] by
//! default and accept a custom implementation for composite or formatted keys.
//!
//! Casting is driven by the key column's type:
//!
//! | column      | name                                   |
//! |-------------|----------------------------------------|
//! | `Text`      | the text itself                        |
//! | `Uuid`      | canonical lowercase hyphenated form    |
//! | `Integer`   | decimal                                |
//! | `Date`      | `YYYY-MM-DD`                           |
//! | `Timestamp` | RFC 3339 in UTC                        |

mod errors;

pub use errors::CodecError;

use std::fmt::Debug;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use crate::Result;
use crate::schema::RecordType;
use crate::value::{ColumnType, Fields, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Bidirectional mapping between a record's key fields and its name.
pub trait KeyCodec: Send + Sync + Debug {
    /// Name for the record holding `fields`, `None` while the key is unset.
    fn encode(&self, fields: &Fields) -> Option<String>;

    /// Key fields identified by `name`.
    fn decode(&self, name: &str) -> Result<Fields>;

    /// Canonical spelling of `name`: decode, then encode again.
    ///
    /// `"05"` and `"5"` decode to the same integer key; both canonicalize
    /// to `"5"` so they address one cache path.
    fn canonical(&self, name: &str) -> Result<String> {
        let fields = self.decode(name)?;
        self.encode(&fields).ok_or_else(|| {
            CodecError::Unencodable {
                name: name.to_string(),
            }
            .into()
        })
    }
}

/// Default codec over a single typed key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCodec {
    column: String,
    ty: ColumnType,
}

impl ColumnCodec {
    /// Codec over an explicit column, independent of any record type.
    pub fn new(column: impl Into<String>, ty: ColumnType) -> Result<Self> {
        let column = column.into();
        if !is_key_type(ty) {
            return Err(CodecError::UnsupportedKey {
                table: String::new(),
                reason: format!("column '{column}' has type {ty}, which cannot name a child"),
            }
            .into());
        }
        Ok(Self { column, ty })
    }

    /// Resolve the codec for `record_type`.
    ///
    /// With `key` set, that column is used; otherwise the primary key must
    /// have exactly one column.
    pub fn for_record_type(record_type: &RecordType, key: Option<&str>) -> Result<Self> {
        let table = record_type.table();
        let column_name = match (key, record_type.primary_key()) {
            (Some(key), _) => key,
            (None, [only]) => only.as_str(),
            (None, columns) => {
                return Err(CodecError::UnsupportedKey {
                    table: table.to_string(),
                    reason: format!(
                        "default codec needs exactly one primary key column, found {}",
                        columns.len()
                    ),
                }
                .into());
            }
        };
        let column = record_type
            .column(column_name)
            .ok_or_else(|| CodecError::UnsupportedKey {
                table: table.to_string(),
                reason: format!("key column '{column_name}' does not exist"),
            })?;
        Self::new(column.name(), column.ty()).map_err(|err| match err {
            crate::Error::Codec(CodecError::UnsupportedKey { reason, .. }) => {
                CodecError::UnsupportedKey {
                    table: table.to_string(),
                    reason,
                }
                .into()
            }
            other => other,
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn column_type(&self) -> ColumnType {
        self.ty
    }
}

impl KeyCodec for ColumnCodec {
    fn encode(&self, fields: &Fields) -> Option<String> {
        fields.get(&self.column).and_then(encode_value)
    }

    fn decode(&self, name: &str) -> Result<Fields> {
        let value = decode_value(self.ty, name)?;
        Ok(Fields::from([(self.column.clone(), value)]))
    }
}

fn is_key_type(ty: ColumnType) -> bool {
    matches!(
        ty,
        ColumnType::Text
            | ColumnType::Integer
            | ColumnType::Uuid
            | ColumnType::Date
            | ColumnType::Timestamp
    )
}

/// String form of a key value, `None` for values that cannot name a child.
pub fn encode_value(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Uuid(u) => Some(u.hyphenated().to_string()),
        Value::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
        Value::Timestamp(t) => Some(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Null | Value::Real(_) | Value::Bool(_) => None,
    }
}

/// Parse `name` as a value of column type `ty`.
pub fn decode_value(ty: ColumnType, name: &str) -> std::result::Result<Value, CodecError> {
    let malformed = |reason: String| CodecError::Malformed {
        name: name.to_string(),
        expected: ty,
        reason,
    };
    match ty {
        ColumnType::Text => Ok(Value::Text(name.to_string())),
        ColumnType::Integer => name
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| malformed(e.to_string())),
        ColumnType::Uuid => Uuid::parse_str(name)
            .map(Value::Uuid)
            .map_err(|e| malformed(e.to_string())),
        ColumnType::Date => NaiveDate::parse_from_str(name, DATE_FORMAT)
            .map(Value::Date)
            .map_err(|e| malformed(e.to_string())),
        // Accepts the signed extended years RFC 3339 output uses outside 0..=9999.
        ColumnType::Timestamp => name
            .parse::<DateTime<Utc>>()
            .map(Value::Timestamp)
            .map_err(|e| malformed(e.to_string())),
        ColumnType::Real | ColumnType::Bool => {
            Err(malformed(format!("{ty} columns cannot be keys")))
        }
    }
}
