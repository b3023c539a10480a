//! Error types for collection operations.

use thiserror::Error;

use crate::value::ColumnType;

/// Errors raised by the collection engine itself.
///
/// Storage failures are not wrapped here; they surface as
/// [`BackendError`](crate::backend::BackendError) unchanged.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CollectionError {
    /// No child with this name exists, or the name does not decode.
    #[error("No child named '{name}' in {collection}")]
    NotFound { collection: String, name: String },

    /// A lookup that expects at most one row matched several.
    #[error("Lookup in {collection} matched more than one row")]
    MultipleRows { collection: String },

    /// Fields passed to merge do not determine a name.
    #[error("Fields for {collection} do not contain a complete key")]
    IncompleteKey { collection: String },

    /// A field that is not a column of the record type.
    #[error("Unknown field '{field}' for {collection}")]
    UnknownField { collection: String, field: String },

    /// A value that does not fit its column type.
    #[error("Field '{field}' of {collection} expects {expected}, got {actual}")]
    FieldType {
        collection: String,
        field: String,
        expected: ColumnType,
        actual: String,
    },
}

impl CollectionError {
    /// Check if this error indicates a missing child.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CollectionError::NotFound { .. })
    }

    /// Check if this error comes from fields that do not fit the record type.
    pub fn is_invalid_fields(&self) -> bool {
        matches!(
            self,
            CollectionError::UnknownField { .. }
                | CollectionError::FieldType { .. }
                | CollectionError::IncompleteKey { .. }
        )
    }

    /// Display name of the collection the error concerns.
    pub fn collection(&self) -> &str {
        match self {
            CollectionError::NotFound { collection, .. }
            | CollectionError::MultipleRows { collection }
            | CollectionError::IncompleteKey { collection }
            | CollectionError::UnknownField { collection, .. }
            | CollectionError::FieldType { collection, .. } => collection,
        }
    }
}

impl From<CollectionError> for crate::Error {
    fn from(err: CollectionError) -> Self {
        crate::Error::Collection(err)
    }
}
