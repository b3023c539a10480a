//! Record type descriptors.
//!
//! A [`RecordType`] describes one relational table: its name, its typed
//! columns in declaration order and its primary key. Collections resolve
//! their key codec and default ordering from it once, at construction.

mod errors;

pub use errors::SchemaError;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::value::{ColumnType, Fields, Value};

/// A typed column of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> ColumnType {
        self.ty
    }
}

/// Descriptor of a table whose rows a collection exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordType {
    table: String,
    columns: Vec<Column>,
    primary_key: Vec<String>,
}

impl RecordType {
    /// Start describing the table called `table`.
    pub fn builder(table: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            table: table.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary-key column names in declaration order.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// The single integer key column whose value the store assigns when unset.
    pub fn autoincrement_column(&self) -> Option<&Column> {
        match self.primary_key.as_slice() {
            [key] => self.column(key).filter(|c| c.ty == ColumnType::Integer),
            _ => None,
        }
    }

    /// Primary-key values of `fields`. Missing key columns come back as `Null`.
    pub fn key_fields(&self, fields: &Fields) -> Fields {
        self.primary_key
            .iter()
            .map(|k| (k.clone(), fields.get(k).cloned().unwrap_or_default()))
            .collect()
    }

    /// A full record: every column present, unset columns `Null`, unknown keys dropped.
    pub fn complete(&self, fields: &Fields) -> Fields {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), fields.get(&c.name).cloned().unwrap_or_default()))
            .collect()
    }

    /// Whether every primary-key column of `fields` holds a value.
    pub fn has_full_key(&self, fields: &Fields) -> bool {
        self.primary_key
            .iter()
            .all(|k| fields.get(k).is_some_and(|v| !v.is_null()))
    }

    /// Returns the first field that is not a column or whose value does not
    /// fit the column type, with the expected column type when it exists.
    pub fn find_invalid_field<'a>(
        &self,
        fields: &'a Fields,
    ) -> Option<(&'a str, &'a Value, Option<ColumnType>)> {
        fields.iter().find_map(|(name, value)| match self.column(name) {
            None => Some((name.as_str(), value, None)),
            Some(column) if !column.ty.accepts(value) => {
                Some((name.as_str(), value, Some(column.ty)))
            }
            Some(_) => None,
        })
    }
}

/// Builder for [`RecordType`].
#[derive(Debug, Clone)]
pub struct RecordTypeBuilder {
    table: String,
    columns: Vec<Column>,
    primary_key: Vec<String>,
}

impl RecordTypeBuilder {
    pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push(Column::new(name, ty));
        self
    }

    /// Declare a column and append it to the primary key.
    pub fn key_column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        let name = name.into();
        self.primary_key.push(name.clone());
        self.columns.push(Column::new(name, ty));
        self
    }

    /// Replace the primary key with `columns`, in order.
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<RecordType> {
        if self.table.is_empty() {
            return Err(SchemaError::EmptyTableName.into());
        }
        if self.columns.is_empty() {
            return Err(SchemaError::NoColumns { table: self.table }.into());
        }
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(SchemaError::DuplicateColumn {
                    table: self.table,
                    column: column.name.clone(),
                }
                .into());
            }
        }
        if self.primary_key.is_empty() {
            return Err(SchemaError::NoPrimaryKey { table: self.table }.into());
        }
        if let Some(unknown) = self
            .primary_key
            .iter()
            .find(|k| !self.columns.iter().any(|c| &c.name == *k))
        {
            return Err(SchemaError::UnknownKeyColumn {
                column: unknown.clone(),
                table: self.table,
            }
            .into());
        }
        Ok(RecordType {
            table: self.table,
            columns: self.columns,
            primary_key: self.primary_key,
        })
    }
}
