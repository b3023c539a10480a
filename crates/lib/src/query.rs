//! Select statements over a record type.
//!
//! A [`Query`] is plain data: table, exact-equality filters, ordering and an
//! optional window. Backends translate it into whatever their engine speaks.
//! [`QueryBuilder`] produces the unordered and canonically ordered selects a
//! collection runs.

use serde::{Deserialize, Serialize};

use crate::value::{Fields, Value};

/// A select over one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    table: String,
    filters: Vec<(String, Value)>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: u64,
}

impl Query {
    /// Select every row of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Keep rows whose `column` equals `value`.
    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    /// Keep rows matching every field of `fields`.
    pub fn filter_by(mut self, fields: &Fields) -> Self {
        self.filters
            .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Replace the ordering with `columns`, ascending, in order.
    pub fn order_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    pub fn ordering(&self) -> &[String] {
        &self.order_by
    }

    pub fn window_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn window_offset(&self) -> u64 {
        self.offset
    }

    pub fn is_ordered(&self) -> bool {
        !self.order_by.is_empty()
    }

    /// Whether `row` passes every filter. A missing column compares as `Null`.
    pub fn matches(&self, row: &Fields) -> bool {
        self.filters
            .iter()
            .all(|(column, value)| row.get(column).unwrap_or(&Value::Null) == value)
    }
}

/// Produces the statements a collection runs against its record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    table: String,
    default_order: Vec<String>,
}

impl QueryBuilder {
    pub fn new(table: impl Into<String>, default_order: Vec<String>) -> Self {
        Self {
            table: table.into(),
            default_order,
        }
    }

    /// Unordered select over the full record type.
    pub fn select(&self) -> Query {
        Query::new(self.table.clone())
    }

    /// [`select`](Self::select) with the collection's deterministic ordering.
    pub fn select_ordered(&self) -> Query {
        self.select().order_by(self.default_order.iter().cloned())
    }

    pub fn default_order(&self) -> &[String] {
        &self.default_order
    }
}
