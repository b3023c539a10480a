//! Error types for the key codec.

use thiserror::Error;

use crate::value::ColumnType;

/// Errors produced while converting between names and primary-key values.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CodecError {
    /// The name cannot be parsed as the configured key type.
    #[error("Cannot decode name '{name}' as {expected}: {reason}")]
    Malformed {
        name: String,
        expected: ColumnType,
        reason: String,
    },

    /// Decoded key fields do not encode back to a name.
    #[error("Name '{name}' decodes to a key that has no name")]
    Unencodable { name: String },

    /// The record type has no usable key column for the default codec.
    #[error("Unsupported key for '{table}': {reason}")]
    UnsupportedKey { table: String, reason: String },
}

impl CodecError {
    /// Check if this error is a malformed-name failure.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            CodecError::Malformed { .. } | CodecError::Unencodable { .. }
        )
    }

    /// Check if this error was raised while configuring a codec.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, CodecError::UnsupportedKey { .. })
    }

    /// The offending name, for decode failures.
    pub fn name(&self) -> Option<&str> {
        match self {
            CodecError::Malformed { name, .. } | CodecError::Unencodable { name } => Some(name),
            CodecError::UnsupportedKey { .. } => None,
        }
    }
}

impl From<CodecError> for crate::Error {
    fn from(err: CodecError) -> Self {
        crate::Error::Codec(err)
    }
}
