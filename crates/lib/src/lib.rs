//!
//! rowtree: database records addressed as named children of a resource tree.
//! This library maps the rows of a table onto the children of a tree node, so
//! `/users/42` names the `users` row whose primary key is `42`.
//!
//! ## Core Concepts
//!
//! * **Record types (`schema::RecordType`)**: A table name, typed columns and the primary-key column list.
//! * **Key codecs (`codec::KeyCodec`)**: The bidirectional mapping between a record's primary key and its child name.
//! * **Collections (`collection::Collection`)**: A record type mounted at a tree path, with lookup, iteration and the add/edit/delete lifecycle.
//! * **Children (`record::Child`)**: Shared handles pairing a record with its parent path and name.
//! * **Identity caches (`cache::IdentityCache`)**: Path-keyed stores that hand out one child instance per path, with tombstones for paths that moved or were deleted.
//! * **Contexts (`context::Context`)**: The session, cache and notifier every collection operation runs against.
//! * **Sessions (`backend::Session`)**: A pluggable storage layer. `InMemory` is always available; `Sqlite` comes with the "sqlite" feature.
//! * **Events (`events::Notifier`)**: Observers of the mutation lifecycle (`before-add`, `moved`, `after-delete`, ...).

pub mod backend;
pub mod cache;
pub mod codec;
pub mod collection;
pub mod constants;
pub mod context;
pub mod events;
mod locks;
pub mod path;
pub mod query;
pub mod record;
pub mod results;
pub mod schema;
pub mod value;

pub use backend::database::InMemory;
#[cfg(feature = "sqlite")]
pub use backend::database::Sqlite;
pub use cache::{IdentityCache, MemoryCache, NullCache};
pub use codec::KeyCodec;
pub use collection::{Collection, CollectionConfig, LookupKey};
pub use context::Context;
pub use events::{EventLog, Notifier, Payload, Phase, Target};
pub use path::ResourcePath;
pub use record::{Change, ChangeSet, Child};
pub use schema::RecordType;
pub use value::{ColumnType, Fields, Value};

/// Result type used throughout the rowtree library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the rowtree library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured errors from the key codec
    #[error(transparent)]
    Codec(codec::CodecError),

    /// Structured record type validation errors from the schema module
    #[error(transparent)]
    Schema(schema::SchemaError),

    /// Structured errors from collection operations
    #[error(transparent)]
    Collection(collection::CollectionError),

    /// Structured storage errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Codec(_) => "codec",
            Error::Schema(_) => "schema",
            Error::Collection(_) => "collection",
            Error::Backend(_) => "backend",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    ///
    /// A name that does not decode names nothing, so decode failures count.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Codec(codec_err) => codec_err.is_decode_error(),
            Error::Collection(collection_err) => collection_err.is_not_found(),
            Error::Backend(backend_err) => backend_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is a malformed name.
    pub fn is_decode_error(&self) -> bool {
        match self {
            Error::Codec(codec_err) => codec_err.is_decode_error(),
            _ => false,
        }
    }

    /// Check if this error comes from an unusable record type or key setup.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Error::Schema(_) => true,
            Error::Codec(codec_err) => codec_err.is_configuration_error(),
            _ => false,
        }
    }

    /// Check if this error was raised by the storage layer.
    pub fn is_persistence_error(&self) -> bool {
        matches!(self, Error::Backend(_))
    }

    /// Check if this error indicates a conflict (key already taken).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_constraint_violation(),
            _ => false,
        }
    }

    /// Check if this error indicates a data integrity issue.
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_integrity_error(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Backend(backend_err) => backend_err.is_io_error(),
            _ => false,
        }
    }
}
