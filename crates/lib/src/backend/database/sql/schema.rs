//! SQL table definitions derived from record types.
//!
//! Column types map to SQLite storage classes:
//!
//! | column type                    | SQL type  |
//! |--------------------------------|-----------|
//! | `Text`, `Uuid`, `Date`, `Timestamp` | `TEXT` |
//! | `Integer`, `Bool`              | `INTEGER` |
//! | `Real`                         | `REAL`    |
//!
//! A single integer primary key becomes `INTEGER PRIMARY KEY` so SQLite
//! assigns it when inserted as NULL. Other keys get an explicit
//! `PRIMARY KEY (...)` constraint and `NOT NULL` on every key column.

use crate::schema::RecordType;
use crate::value::ColumnType;

/// Quote an identifier for SQL, doubling embedded quotes.
pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// SQL storage type for a column type.
pub fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Text | ColumnType::Uuid | ColumnType::Date | ColumnType::Timestamp => "TEXT",
        ColumnType::Integer | ColumnType::Bool => "INTEGER",
        ColumnType::Real => "REAL",
    }
}

/// `CREATE TABLE IF NOT EXISTS` statement for `record_type`.
pub fn create_table(record_type: &RecordType) -> String {
    let autoincrement = record_type.autoincrement_column().map(|c| c.name());
    let mut definitions: Vec<String> = record_type
        .columns()
        .iter()
        .map(|column| {
            let mut definition = format!("{} {}", quote(column.name()), sql_type(column.ty()));
            if autoincrement == Some(column.name()) {
                definition.push_str(" PRIMARY KEY");
            } else if record_type.primary_key().iter().any(|k| k == column.name()) {
                definition.push_str(" NOT NULL");
            }
            definition
        })
        .collect();
    if autoincrement.is_none() {
        let key: Vec<String> = record_type.primary_key().iter().map(|k| quote(k)).collect();
        definitions.push(format!("PRIMARY KEY ({})", key.join(", ")));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(record_type.table()),
        definitions.join(", ")
    )
}
