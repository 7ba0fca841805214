//! Relational schema inferred from documents
//!
//! A [`SchemaBuilder`] accumulates tables, columns and references over a
//! set of documents. [`SchemaBuilder::build`] closes the model into a
//! [`Schema`] and computes the order in which tables can be created.

pub mod builder;
pub mod sort;

pub use builder::SchemaBuilder;
pub use sort::load_order;

use crate::error::{MeltError, Result};
use crate::types::SqlType;
use std::borrow::Cow;
use std::collections::HashMap;

/// Name of the synthetic surrogate key column
pub const ID_COLUMN: &str = "id";

/// Prefix given to discovered columns that clash with a synthetic column
pub const NATURAL_PREFIX: &str = "natural_";

/// Foreign key column name pointing at `parent`
pub fn foreign_key(parent: &str) -> String {
    format!("{}_{}", parent, ID_COLUMN)
}

/// Check that a table name can be used as an output file stem
///
/// Table names come from document keys and tags, and CSV output writes
/// `<table>.csv` into the output directory.
pub fn validate_table_name(name: &str) -> Result<()> {
    let unsafe_name = name.is_empty()
        || name.contains(['/', '\\', '\0'])
        || name.contains("..");
    if unsafe_name {
        return Err(MeltError::MalformedDocument(format!(
            "'{}' cannot be used as a table name",
            name.escape_debug()
        )));
    }
    Ok(())
}

/// A discovered column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Unset when only empty values were seen
    pub sql_type: Option<SqlType>,
}

impl Column {
    /// Type used in DDL, `text` when nothing was inferred
    pub fn effective_type(&self) -> SqlType {
        self.sql_type.unwrap_or(SqlType::Text)
    }
}

/// A discovered table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: Vec<Column>,
    column_index: HashMap<String, usize>,
    parents: Vec<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        TableSchema {
            name: name.into(),
            columns: Vec::new(),
            column_index: HashMap::new(),
            parents: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in discovery order, without `id` and foreign keys
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index.get(name).map(|&i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    /// Referenced parent tables in discovery order
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn references(&self, parent: &str) -> bool {
        self.parents.iter().any(|p| p == parent)
    }

    /// Foreign key column names, one per parent
    pub fn foreign_keys(&self) -> Vec<String> {
        self.parents.iter().map(|p| foreign_key(p)).collect()
    }

    /// Name under which a discovered column is written out
    ///
    /// A column that would shadow `id` or one of this table's foreign keys
    /// gets the `natural_` prefix, repeated until the name is free.
    pub fn output_name<'a>(&self, column: &'a str) -> Cow<'a, str> {
        if !self.is_synthetic(column) {
            return Cow::Borrowed(column);
        }

        let mut name = format!("{}{}", NATURAL_PREFIX, column);
        while self.has_column(&name) || self.is_synthetic(&name) {
            name.insert_str(0, NATURAL_PREFIX);
        }
        Cow::Owned(name)
    }

    fn is_synthetic(&self, column: &str) -> bool {
        column == ID_COLUMN || self.parents.iter().any(|p| foreign_key(p) == column)
    }

    /// Register a column; returns it whether new or existing
    pub(crate) fn add_column(&mut self, name: &str) -> &mut Column {
        let idx = match self.column_index.get(name) {
            Some(&idx) => idx,
            None => {
                self.columns.push(Column {
                    name: name.to_string(),
                    sql_type: None,
                });
                let idx = self.columns.len() - 1;
                self.column_index.insert(name.to_string(), idx);
                idx
            }
        };
        &mut self.columns[idx]
    }

    pub(crate) fn add_parent(&mut self, parent: &str) {
        if !self.references(parent) {
            self.parents.push(parent.to_string());
        }
    }
}

/// A closed schema: the result of discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    tables: Vec<TableSchema>,
    table_index: HashMap<String, usize>,
    load_order: Vec<String>,
}

impl Schema {
    pub(crate) fn new(
        tables: Vec<TableSchema>,
        table_index: HashMap<String, usize>,
        load_order: Vec<String>,
    ) -> Self {
        Schema {
            tables,
            table_index,
            load_order,
        }
    }

    /// Tables in discovery order
    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.table_index.get(name).map(|&i| &self.tables[i])
    }

    /// Table names ordered so that parents precede children
    pub fn load_order(&self) -> &[String] {
        &self.load_order
    }

    /// Tables in load order
    pub fn sorted_tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.load_order.iter().filter_map(|name| self.table(name))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
