//! Error types for record type descriptors.

use thiserror::Error;

/// Errors raised while building a [`RecordType`](super::RecordType).
///
/// All of these are configuration errors: they are raised once, when the
/// descriptor is built, never while a collection is serving requests.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The table name is empty.
    #[error("Record type has an empty table name")]
    EmptyTableName,

    /// The record type declares no columns.
    #[error("Record type '{table}' declares no columns")]
    NoColumns { table: String },

    /// A column name is declared twice.
    #[error("Column '{column}' is declared twice in '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// A primary-key entry names a column that does not exist.
    #[error("Primary key column '{column}' is not a column of '{table}'")]
    UnknownKeyColumn { table: String, column: String },

    /// The record type has no primary key.
    #[error("Record type '{table}' has no primary key")]
    NoPrimaryKey { table: String },
}

impl SchemaError {
    /// Name of the table the error is about, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            SchemaError::EmptyTableName => None,
            SchemaError::NoColumns { table }
            | SchemaError::DuplicateColumn { table, .. }
            | SchemaError::UnknownKeyColumn { table, .. }
            | SchemaError::NoPrimaryKey { table } => Some(table),
        }
    }
}

impl From<SchemaError> for crate::Error {
    fn from(err: SchemaError) -> Self {
        crate::Error::Schema(err)
    }
}
