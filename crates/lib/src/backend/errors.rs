//! Error types for session backends.
//!
//! Everything a backend raises is a persistence error from the collection's
//! point of view: it is propagated unchanged and never retried.

use thiserror::Error;

/// Errors that can occur during backend operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// The table was never created in this backend.
    #[error("Table not found: {table}")]
    TableNotFound {
        /// Name of the missing table
        table: String,
    },

    /// No row matches the given primary key.
    #[error("No row in '{table}' with key {key}")]
    RowNotFound {
        /// Table that was searched
        table: String,
        /// Rendered primary key, `column=value` pairs
        key: String,
    },

    /// A write would break a table constraint (duplicate or missing key).
    #[error("Constraint violation in '{table}': {reason}")]
    ConstraintViolation {
        /// Table the write targeted
        table: String,
        /// Which constraint and why
        reason: String,
    },

    /// A write referenced a column the table does not have.
    #[error("Unknown column '{column}' in '{table}'")]
    UnknownColumn {
        /// Table the write targeted
        table: String,
        /// The unknown column
        column: String,
    },

    /// A stored value cannot be read back as its column type.
    #[error("Corrupt value in '{table}.{column}': {reason}")]
    DataCorruption {
        /// Table holding the value
        table: String,
        /// Column holding the value
        column: String,
        /// Parse failure
        reason: String,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// SQL driver error.
    #[cfg(feature = "sqlite")]
    #[error("SQL error: {reason}")]
    SqlxError {
        /// Context and driver message
        reason: String,
        /// The underlying driver error
        #[source]
        source: Option<sqlx::Error>,
    },

    /// The async runtime driving a SQL backend could not be created.
    #[error("Runtime error: {reason}")]
    Runtime {
        /// Description of the failure
        reason: String,
    },
}

impl BackendError {
    /// Check if this error indicates a table or row was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BackendError::TableNotFound { .. } | BackendError::RowNotFound { .. }
        )
    }

    /// Check if this error is a constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, BackendError::ConstraintViolation { .. })
    }

    /// Check if this error indicates a data integrity issue.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, BackendError::DataCorruption { .. })
    }

    /// Check if this error is related to I/O operations.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
        )
    }

    /// Get the table name if this error is about a specific table.
    pub fn table(&self) -> Option<&str> {
        match self {
            BackendError::TableNotFound { table }
            | BackendError::RowNotFound { table, .. }
            | BackendError::ConstraintViolation { table, .. }
            | BackendError::UnknownColumn { table, .. }
            | BackendError::DataCorruption { table, .. } => Some(table),
            _ => None,
        }
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
