use serde::Serialize;
use std::collections::HashMap;

/// One populated row of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Surrogate id, unique within the table
    pub id: u64,
    parent_ids: Vec<(String, u64)>,
    values: HashMap<String, String>,
}

impl Row {
    pub fn new(id: u64) -> Self {
        Row {
            id,
            parent_ids: Vec::new(),
            values: HashMap::new(),
        }
    }

    /// Value of a discovered column, `None` when absent in this instance
    pub fn value(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// Surrogate id of the enclosing `parent` instance
    pub fn parent_id(&self, parent: &str) -> Option<u64> {
        self.parent_ids
            .iter()
            .find(|(p, _)| p == parent)
            .map(|(_, id)| *id)
    }

    /// Number of discovered columns holding a value
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn set_parent(&mut self, parent: &str, id: u64) {
        self.parent_ids.push((parent.to_string(), id));
    }

    pub(crate) fn set_value(&mut self, column: &str, value: String) {
        self.values.insert(column.to_string(), value);
    }
}

/// Rows and id counter of one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableData {
    /// Last surrogate id handed out (the seed before any row exists)
    pub last_id: u64,
    pub rows: Vec<Row>,
}

impl TableData {
    pub fn seeded(seed: u64) -> Self {
        TableData {
            last_id: seed,
            rows: Vec::new(),
        }
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Counters describing how well documents matched the schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MeltStats {
    pub documents: usize,
    pub rows: usize,
    /// Values whose column was never discovered
    pub dropped_fields: usize,
    /// Discovered columns left empty in a row
    pub defaulted_fields: usize,
}

/// All rows produced by population, keyed by table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub(crate) tables: HashMap<String, TableData>,
    pub(crate) stats: MeltStats,
}

impl Dataset {
    pub fn table(&self, name: &str) -> Option<&TableData> {
        self.tables.get(name)
    }

    /// Rows of a table, empty when it has none
    pub fn rows(&self, name: &str) -> &[Row] {
        self.tables
            .get(name)
            .map(|t| t.rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn stats(&self) -> MeltStats {
        self.stats
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(|t| t.rows.len()).sum()
    }
}
