//! Row storage and query operations for the SQLite backend.
//!
//! Every statement is built from the record type, with identifiers quoted and
//! values bound as parameters. Selects are read page by page with
//! `LIMIT`/`OFFSET`, so a cursor never holds more than one batch.

use chrono::SecondsFormat;
use sqlx::Row;
use sqlx::any::AnyRow;

use super::schema::{create_table, quote};
use super::{Sqlite, SqlxResultExt};
use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{Cursor, Session, check_columns, describe_key};
use crate::codec::decode_value;
use crate::query::Query;
use crate::schema::RecordType;
use crate::value::{ColumnType, Fields, Value};

type AnyQuery<'q> = sqlx::query::Query<'q, sqlx::Any, sqlx::any::AnyArguments<'q>>;

/// Bind `value` using the storage representation of its kind.
fn bind_value<'q>(query: AnyQuery<'q>, value: &Value) -> AnyQuery<'q> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Text(s) => query.bind(s.clone()),
        Value::Integer(i) => query.bind(*i),
        Value::Real(r) => query.bind(*r),
        Value::Bool(b) => query.bind(i64::from(*b)),
        Value::Uuid(u) => query.bind(u.hyphenated().to_string()),
        Value::Date(d) => query.bind(d.format("%Y-%m-%d").to_string()),
        Value::Timestamp(t) => query.bind(t.to_rfc3339_opts(SecondsFormat::Nanos, true)),
    }
}

/// Read column `index` of `row` as a value of type `ty`.
fn decode_column(table: &str, column: &str, ty: ColumnType, row: &AnyRow, index: usize) -> Result<Value> {
    let corrupt = |reason: String| -> crate::Error {
        BackendError::DataCorruption {
            table: table.to_string(),
            column: column.to_string(),
            reason,
        }
        .into()
    };
    let value = match ty {
        ColumnType::Text => row
            .try_get::<Option<String>, _>(index)
            .map(|v| v.map_or(Value::Null, Value::Text)),
        ColumnType::Integer => row
            .try_get::<Option<i64>, _>(index)
            .map(|v| v.map_or(Value::Null, Value::Integer)),
        ColumnType::Real => row
            .try_get::<Option<f64>, _>(index)
            .map(|v| v.map_or(Value::Null, Value::Real)),
        ColumnType::Bool => row
            .try_get::<Option<i64>, _>(index)
            .map(|v| v.map_or(Value::Null, |i| Value::Bool(i != 0))),
        ColumnType::Uuid | ColumnType::Date | ColumnType::Timestamp => {
            let text = row
                .try_get::<Option<String>, _>(index)
                .map_err(|e| corrupt(e.to_string()))?;
            return match text {
                None => Ok(Value::Null),
                Some(text) => decode_value(ty, &text).map_err(|e| corrupt(e.to_string())),
            };
        }
    };
    value.map_err(|e| corrupt(e.to_string()))
}

fn decode_row(record_type: &RecordType, row: &AnyRow) -> Result<Fields> {
    record_type
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let value = decode_column(record_type.table(), column.name(), column.ty(), row, index)?;
            Ok((column.name().to_string(), value))
        })
        .collect()
}

/// `SELECT` for `query` without its window, plus the values to bind.
fn select_sql(record_type: &RecordType, query: &Query) -> (String, Vec<Value>) {
    let columns: Vec<String> = record_type.columns().iter().map(|c| quote(c.name())).collect();
    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), quote(query.table()));
    let mut params = Vec::new();
    if !query.filters().is_empty() {
        let clauses: Vec<String> = query
            .filters()
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                format!("{} IS ?", quote(column))
            })
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    // Paging needs a stable order even when the caller asked for none.
    let ordering: Vec<String> = if query.is_ordered() {
        query.ordering().iter().map(|c| quote(c)).collect()
    } else {
        record_type.primary_key().iter().map(|c| quote(c)).collect()
    };
    sql.push_str(" ORDER BY ");
    sql.push_str(&ordering.join(", "));
    (sql, params)
}

fn window_sql(limit: Option<u64>, offset: u64) -> String {
    match limit {
        Some(limit) => format!(" LIMIT {limit} OFFSET {offset}"),
        None => format!(" LIMIT -1 OFFSET {offset}"),
    }
}

/// Cursor that reads one `LIMIT`/`OFFSET` page per fetch.
struct SqlCursor {
    backend: Sqlite,
    record_type: RecordType,
    sql: String,
    params: Vec<Value>,
    offset: u64,
    remaining: Option<u64>,
    done: bool,
}

impl Cursor for SqlCursor {
    fn fetch(&mut self, n: usize) -> Result<Vec<Fields>> {
        if self.done || n == 0 {
            return Ok(Vec::new());
        }
        let mut page = n as u64;
        if let Some(remaining) = self.remaining {
            page = page.min(remaining);
        }
        if page == 0 {
            self.done = true;
            return Ok(Vec::new());
        }

        let sql = format!("{}{}", self.sql, window_sql(Some(page), self.offset));
        let table = self.record_type.table().to_string();
        let rows = self.backend.block_on(async {
            let mut query = sqlx::query(&sql);
            for value in &self.params {
                query = bind_value(query, value);
            }
            query
                .fetch_all(self.backend.pool())
                .await
                .table_context(&table, &format!("Failed to read from {table}"))
        })?;

        let fetched = rows.len() as u64;
        self.offset += fetched;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= fetched;
        }
        if fetched < page {
            self.done = true;
        }
        rows.iter().map(|row| decode_row(&self.record_type, row)).collect()
    }
}

impl Session for Sqlite {
    fn ensure_table(&self, record_type: &RecordType) -> Result<()> {
        let sql = create_table(record_type);
        self.block_on(async {
            sqlx::query(&sql)
                .execute(self.pool())
                .await
                .sql_context(&format!("Failed to create table {}", record_type.table()))
        })?;
        tracing::info!(table = record_type.table(), "Ensured SQLite table");
        Ok(())
    }

    fn execute(&self, record_type: &RecordType, query: &Query) -> Result<Box<dyn Cursor>> {
        let (sql, params) = select_sql(record_type, query);
        tracing::trace!(%sql, "Prepared select");
        Ok(Box::new(SqlCursor {
            backend: self.clone(),
            record_type: record_type.clone(),
            sql,
            params,
            offset: query.window_offset(),
            remaining: query.window_limit(),
            done: false,
        }))
    }

    fn count(&self, record_type: &RecordType, query: &Query) -> Result<u64> {
        let (select, params) = select_sql(record_type, query);
        let sql = format!(
            "SELECT COUNT(*) FROM ({select}{})",
            window_sql(query.window_limit(), query.window_offset())
        );
        let table = record_type.table();
        let count: i64 = self.block_on(async {
            let mut statement = sqlx::query(&sql);
            for value in &params {
                statement = bind_value(statement, value);
            }
            let row = statement
                .fetch_one(self.pool())
                .await
                .table_context(table, &format!("Failed to count rows of {table}"))?;
            row.try_get::<i64, _>(0)
                .sql_context(&format!("Failed to count rows of {table}"))
        })?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn add(&self, record_type: &RecordType, fields: &Fields) -> Result<Fields> {
        check_columns(record_type, fields)?;
        let mut row = record_type.complete(fields);
        let generated = record_type
            .autoincrement_column()
            .map(|c| c.name().to_string())
            .filter(|name| row.get(name).is_none_or(Value::is_null));

        let inserted: Vec<(&String, &Value)> = row
            .iter()
            .filter(|(column, _)| Some(*column) != generated.as_ref())
            .collect();
        let table = record_type.table();
        let mut sql = if inserted.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote(table))
        } else {
            let columns: Vec<String> = inserted.iter().map(|(c, _)| quote(c)).collect();
            let placeholders = vec!["?"; inserted.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({placeholders})",
                quote(table),
                columns.join(", ")
            )
        };
        // The Any driver reports no last insert id for SQLite, so the
        // generated key is read back from the inserted row itself.
        if let Some(column) = &generated {
            sql.push_str(&format!(" RETURNING {}", quote(column)));
        }

        let id = self.block_on(async {
            let mut statement = sqlx::query(&sql);
            for (_, value) in &inserted {
                statement = bind_value(statement, value);
            }
            if generated.is_some() {
                let returned = statement
                    .fetch_one(self.pool())
                    .await
                    .table_context(table, &format!("Failed to insert into {table}"))?;
                returned
                    .try_get::<i64, _>(0)
                    .map(Some)
                    .table_context(table, &format!("Failed to read generated key of {table}"))
            } else {
                statement
                    .execute(self.pool())
                    .await
                    .table_context(table, &format!("Failed to insert into {table}"))
                    .map(|_| None)
            }
        })?;

        if let (Some(column), Some(id)) = (generated, id) {
            row.insert(column, Value::Integer(id));
        }
        Ok(row)
    }

    fn update(&self, record_type: &RecordType, key: &Fields, changes: &Fields) -> Result<()> {
        check_columns(record_type, changes)?;
        if changes.is_empty() {
            return Ok(());
        }
        let table = record_type.table();
        let assignments: Vec<String> = changes.keys().map(|c| format!("{} = ?", quote(c))).collect();
        let conditions: Vec<String> = key.keys().map(|c| format!("{} IS ?", quote(c))).collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            quote(table),
            assignments.join(", "),
            conditions.join(" AND ")
        );

        let result = self.block_on(async {
            let mut statement = sqlx::query(&sql);
            for value in changes.values().chain(key.values()) {
                statement = bind_value(statement, value);
            }
            statement
                .execute(self.pool())
                .await
                .table_context(table, &format!("Failed to update {table}"))
        })?;
        if result.rows_affected() == 0 {
            return Err(BackendError::RowNotFound {
                table: table.to_string(),
                key: describe_key(key),
            }
            .into());
        }
        Ok(())
    }

    fn delete(&self, record_type: &RecordType, key: &Fields) -> Result<()> {
        let table = record_type.table();
        let conditions: Vec<String> = key.keys().map(|c| format!("{} IS ?", quote(c))).collect();
        let sql = format!("DELETE FROM {} WHERE {}", quote(table), conditions.join(" AND "));

        let result = self.block_on(async {
            let mut statement = sqlx::query(&sql);
            for value in key.values() {
                statement = bind_value(statement, value);
            }
            statement
                .execute(self.pool())
                .await
                .table_context(table, &format!("Failed to delete from {table}"))
        })?;
        if result.rows_affected() == 0 {
            return Err(BackendError::RowNotFound {
                table: table.to_string(),
                key: describe_key(key),
            }
            .into());
        }
        Ok(())
    }
}
