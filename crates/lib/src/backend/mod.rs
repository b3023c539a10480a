//! Persistence sessions for collections.
//!
//! This module provides the [`Session`] trait a collection runs its queries and
//! writes through, and the backends that implement it, organized by category.
//!
//! A session stands for one unit of work. The collection engine never opens,
//! commits or retries anything; it calls the session and propagates whatever
//! the session returns.

use crate::Result;
use crate::query::Query;
use crate::schema::RecordType;
use crate::value::Fields;

// Category modules
pub mod database;
pub mod errors;

pub use errors::BackendError;

/// Sequential reader over the rows a query produced.
pub trait Cursor: Send {
    /// Up to `n` further rows. An empty batch means the cursor is exhausted.
    fn fetch(&mut self, n: usize) -> Result<Vec<Fields>>;
}

/// Storage and query engine a collection persists its records through.
///
/// Rows are exchanged as complete [`Fields`] maps: every column of the record
/// type present, unset columns `Null`. Keys passed to `update` and `delete`
/// are the primary-key fields of the row as it is currently stored.
///
/// All sessions must be `Send` and `Sync` so a context can be shared with
/// whatever owns the resource tree.
pub trait Session: Send + Sync {
    /// Create storage for `record_type` if it does not exist yet.
    fn ensure_table(&self, record_type: &RecordType) -> Result<()>;

    /// Run a select and return a cursor over its rows.
    fn execute(&self, record_type: &RecordType, query: &Query) -> Result<Box<dyn Cursor>>;

    /// Number of rows `query` selects, without materializing them.
    fn count(&self, record_type: &RecordType, query: &Query) -> Result<u64>;

    /// Insert a record and return it as stored, including generated keys.
    fn add(&self, record_type: &RecordType, fields: &Fields) -> Result<Fields>;

    /// Overwrite `changes` on the row identified by `key`.
    fn update(&self, record_type: &RecordType, key: &Fields, changes: &Fields) -> Result<()>;

    /// Remove the row identified by `key`.
    fn delete(&self, record_type: &RecordType, key: &Fields) -> Result<()>;
}

/// Render key fields as `column=value` pairs for error messages.
pub(crate) fn describe_key(key: &Fields) -> String {
    key.iter()
        .map(|(column, value)| format!("{column}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Fail with `UnknownColumn` if `fields` names a column `record_type` lacks.
pub(crate) fn check_columns(record_type: &RecordType, fields: &Fields) -> Result<()> {
    match fields.keys().find(|c| record_type.column(c).is_none()) {
        Some(column) => Err(BackendError::UnknownColumn {
            table: record_type.table().to_string(),
            column: column.clone(),
        }
        .into()),
        None => Ok(()),
    }
}
