//! In-memory database backend implementation
//!
//! This module provides an in-memory implementation of the [`Session`] trait,
//! suitable for testing, development, or scenarios where data persistence
//! is not strictly required or is handled externally.
//!
//! [`Session`]: crate::backend::Session

mod persistence;
mod storage;

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::locks;
use crate::value::Fields;

/// Rows of one table plus the last integer key handed out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct MemTable {
    /// Rows in insertion order
    pub(crate) rows: Vec<Fields>,
    /// Highest autoincrement key seen so far
    #[serde(default)]
    pub(crate) last_id: i64,
}

/// A simple in-memory database keeping every table in a `HashMap`.
///
/// Unordered selects return rows in insertion order. Integer single-column
/// primary keys left unset on insert are assigned the next free value.
///
/// It provides basic persistence capabilities via `save_to_file` and
/// `load_from_file`, serializing all tables to JSON.
#[derive(Debug, Default)]
pub struct InMemory {
    /// Tables by name with read-write lock for concurrent access
    pub(crate) tables: RwLock<HashMap<String, MemTable>>,
}

impl InMemory {
    /// Creates a new, empty `InMemory` database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names of all tables currently stored, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let tables = locks::read(&self.tables);
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of rows stored in `table`, `None` if the table does not exist.
    pub fn row_count(&self, table: &str) -> Option<usize> {
        locks::read(&self.tables).get(table).map(|t| t.rows.len())
    }
}
