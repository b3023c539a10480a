//! Row storage and query evaluation for the InMemory database.

use std::cmp::Ordering;

use super::{InMemory, MemTable};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{Cursor, Session, check_columns, describe_key};
use crate::locks;
use crate::query::Query;
use crate::schema::RecordType;
use crate::value::{Fields, Value};

/// Cursor over a snapshot of the rows a query selected.
struct MemCursor {
    rows: std::vec::IntoIter<Fields>,
}

impl Cursor for MemCursor {
    fn fetch(&mut self, n: usize) -> Result<Vec<Fields>> {
        Ok(self.rows.by_ref().take(n).collect())
    }
}

fn table_not_found(table: &str) -> crate::Error {
    BackendError::TableNotFound {
        table: table.to_string(),
    }
    .into()
}

/// Rows of `table` selected by `query`, filtered, ordered and windowed.
fn select(table: &MemTable, query: &Query) -> Vec<Fields> {
    let mut rows: Vec<Fields> = table
        .rows
        .iter()
        .filter(|row| query.matches(row))
        .cloned()
        .collect();
    if query.is_ordered() {
        rows.sort_by(|a, b| {
            query
                .ordering()
                .iter()
                .map(|column| {
                    let left = a.get(column).unwrap_or(&Value::Null);
                    let right = b.get(column).unwrap_or(&Value::Null);
                    left.sort_cmp(right)
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }
    let offset = usize::try_from(query.window_offset()).unwrap_or(usize::MAX);
    let limit = query
        .window_limit()
        .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
    rows.into_iter().skip(offset).take(limit).collect()
}

fn check_key(record_type: &RecordType, row: &Fields) -> Result<()> {
    if record_type.has_full_key(row) {
        return Ok(());
    }
    Err(BackendError::ConstraintViolation {
        table: record_type.table().to_string(),
        reason: format!(
            "primary key ({}) must not be null",
            record_type.primary_key().join(", ")
        ),
    }
    .into())
}

fn duplicate_key(record_type: &RecordType, key: &Fields) -> crate::Error {
    BackendError::ConstraintViolation {
        table: record_type.table().to_string(),
        reason: format!("duplicate primary key {}", describe_key(key)),
    }
    .into()
}

fn note_integer_key(table: &mut MemTable, record_type: &RecordType, row: &Fields) {
    if let Some(column) = record_type.autoincrement_column()
        && let Some(id) = row.get(column.name()).and_then(Value::as_integer)
    {
        table.last_id = table.last_id.max(id);
    }
}

impl Session for InMemory {
    fn ensure_table(&self, record_type: &RecordType) -> Result<()> {
        let mut tables = locks::write(&self.tables);
        if !tables.contains_key(record_type.table()) {
            tables.insert(record_type.table().to_string(), MemTable::default());
            tracing::info!(table = record_type.table(), "Created in-memory table");
        }
        Ok(())
    }

    fn execute(&self, record_type: &RecordType, query: &Query) -> Result<Box<dyn Cursor>> {
        let tables = locks::read(&self.tables);
        let table = tables
            .get(query.table())
            .ok_or_else(|| table_not_found(query.table()))?;
        let rows: Vec<Fields> = select(table, query)
            .iter()
            .map(|row| record_type.complete(row))
            .collect();
        Ok(Box::new(MemCursor {
            rows: rows.into_iter(),
        }))
    }

    fn count(&self, _record_type: &RecordType, query: &Query) -> Result<u64> {
        let tables = locks::read(&self.tables);
        let table = tables
            .get(query.table())
            .ok_or_else(|| table_not_found(query.table()))?;
        Ok(select(table, query).len() as u64)
    }

    fn add(&self, record_type: &RecordType, fields: &Fields) -> Result<Fields> {
        check_columns(record_type, fields)?;
        let mut tables = locks::write(&self.tables);
        let table = tables
            .get_mut(record_type.table())
            .ok_or_else(|| table_not_found(record_type.table()))?;

        let mut row = record_type.complete(fields);
        if let Some(column) = record_type.autoincrement_column()
            && row.get(column.name()).is_none_or(Value::is_null)
        {
            row.insert(column.name().to_string(), Value::Integer(table.last_id + 1));
        }
        check_key(record_type, &row)?;

        let key = record_type.key_fields(&row);
        if table
            .rows
            .iter()
            .any(|existing| record_type.key_fields(existing) == key)
        {
            return Err(duplicate_key(record_type, &key));
        }
        note_integer_key(table, record_type, &row);
        table.rows.push(row.clone());
        Ok(row)
    }

    fn update(&self, record_type: &RecordType, key: &Fields, changes: &Fields) -> Result<()> {
        check_columns(record_type, changes)?;
        let mut tables = locks::write(&self.tables);
        let table = tables
            .get_mut(record_type.table())
            .ok_or_else(|| table_not_found(record_type.table()))?;

        let index = table
            .rows
            .iter()
            .position(|row| record_type.key_fields(row) == *key)
            .ok_or_else(|| BackendError::RowNotFound {
                table: record_type.table().to_string(),
                key: describe_key(key),
            })?;

        let mut row = table.rows[index].clone();
        for (column, value) in changes {
            row.insert(column.clone(), value.clone());
        }
        check_key(record_type, &row)?;

        let new_key = record_type.key_fields(&row);
        if new_key != *key
            && table
                .rows
                .iter()
                .any(|existing| record_type.key_fields(existing) == new_key)
        {
            return Err(duplicate_key(record_type, &new_key));
        }
        note_integer_key(table, record_type, &row);
        table.rows[index] = row;
        Ok(())
    }

    fn delete(&self, record_type: &RecordType, key: &Fields) -> Result<()> {
        let mut tables = locks::write(&self.tables);
        let table = tables
            .get_mut(record_type.table())
            .ok_or_else(|| table_not_found(record_type.table()))?;
        let index = table
            .rows
            .iter()
            .position(|row| record_type.key_fields(row) == *key)
            .ok_or_else(|| BackendError::RowNotFound {
                table: record_type.table().to_string(),
                key: describe_key(key),
            })?;
        table.rows.remove(index);
        Ok(())
    }
}
