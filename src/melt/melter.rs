//! Data population driven by a discovered schema
//!
//! The melter mirrors the discovery walk: every container produces one row
//! of its table with the next surrogate id, scalar values copied under
//! their column names and a foreign key to the enclosing container's row.

use super::data::{Dataset, Row, TableData};
use crate::document::{Document, FieldValue, Node};
use crate::error::{MeltError, Result};
use crate::schema::{Schema, TableSchema};
use std::collections::HashMap;
use tracing::{debug, info};

/// Populates rows for a closed schema
///
/// A melter can only be built from a [`Schema`], so population never runs
/// before discovery has finished.
pub struct Melter<'s> {
    schema: &'s Schema,
    data: Dataset,
}

impl<'s> Melter<'s> {
    /// Create a melter whose id counters start at zero
    pub fn new(schema: &'s Schema) -> Self {
        let tables = schema
            .tables()
            .iter()
            .map(|t| (t.name().to_string(), TableData::default()))
            .collect();

        Melter {
            schema,
            data: Dataset {
                tables,
                ..Dataset::default()
            },
        }
    }

    /// Start id counters at existing maxima, for appending to a loaded catalog
    pub fn with_seeds(mut self, seeds: &HashMap<String, u64>) -> Self {
        for (table, &seed) in seeds {
            match self.data.tables.get_mut(table) {
                Some(data) if data.rows.is_empty() => *data = TableData::seeded(seed),
                Some(_) => debug!(table = %table, "Ignoring seed for a table that already has rows"),
                None => debug!(table = %table, "Ignoring seed for an undiscovered table"),
            }
        }
        self
    }

    /// Populate rows from one document
    pub fn melt(&mut self, document: &Document) -> Result<()> {
        debug!(source = %document.source.display(), "Populating rows");

        for root in &document.roots {
            match &root.value {
                FieldValue::Container(node) => self.melt_node(&root.name, None, node)?,
                FieldValue::ContainerList(nodes) => {
                    for node in nodes {
                        self.melt_node(&root.name, None, node)?;
                    }
                }
                FieldValue::Scalar(_) | FieldValue::TextList(_) | FieldValue::Null => {
                    return Err(MeltError::MalformedDocument(format!(
                        "field '{}' of {} has no enclosing table",
                        root.name,
                        document.source.display()
                    )));
                }
            }
        }

        self.data.stats.documents += 1;
        Ok(())
    }

    /// Populate rows from every document of a set, in order
    pub fn melt_all<'a>(&mut self, documents: impl IntoIterator<Item = &'a Document>) -> Result<()> {
        for document in documents {
            self.melt(document)?;
        }
        Ok(())
    }

    /// Finish population and hand over the rows
    pub fn finish(self) -> Dataset {
        let stats = self.data.stats;
        info!(
            documents = stats.documents,
            rows = stats.rows,
            dropped_fields = stats.dropped_fields,
            defaulted_fields = stats.defaulted_fields,
            "Population finished"
        );
        self.data
    }

    fn melt_node(&mut self, table: &str, parent: Option<(&str, u64)>, node: &Node) -> Result<()> {
        let schema: &'s Schema = self.schema;
        let table_schema = schema
            .table(table)
            .ok_or_else(|| MeltError::UndiscoveredTable(table.to_string()))?;

        if let Some((parent_table, _)) = parent {
            if !table_schema.references(parent_table) {
                return Err(MeltError::UndiscoveredReference {
                    table: table.to_string(),
                    parent: parent_table.to_string(),
                });
            }
        }

        let id = self
            .data
            .tables
            .entry(table.to_string())
            .or_default()
            .next_id();

        let mut row = Row::new(id);
        if let Some((parent_table, parent_id)) = parent {
            row.set_parent(parent_table, parent_id);
        }

        let mut children: Vec<(&str, &Node)> = Vec::new();
        for field in &node.fields {
            match &field.value {
                FieldValue::Scalar(value) => {
                    self.fill(table_schema, &mut row, &field.name, value.clone());
                }
                FieldValue::TextList(values) => {
                    self.fill(table_schema, &mut row, &field.name, values.join(","));
                }
                FieldValue::Null => {}
                FieldValue::Container(child) => children.push((field.name.as_str(), child)),
                FieldValue::ContainerList(list) => {
                    children.extend(list.iter().map(|child| (field.name.as_str(), child)));
                }
            }
        }

        let stats = &mut self.data.stats;
        stats.rows += 1;
        stats.defaulted_fields += table_schema
            .columns()
            .len()
            .saturating_sub(row.value_count());

        self.data
            .tables
            .entry(table.to_string())
            .or_default()
            .rows
            .push(row);

        for (child_table, child) in children {
            self.melt_node(child_table, Some((table, id)), child)?;
        }

        Ok(())
    }

    fn fill(&mut self, table: &TableSchema, row: &mut Row, column: &str, value: String) {
        if table.has_column(column) {
            row.set_value(column, value);
        } else {
            self.data.stats.dropped_fields += 1;
            debug!(table = table.name(), column, "Dropping value of undiscovered column");
        }
    }
}
