//! Dependency ordering of tables

use super::TableSchema;
use crate::error::{MeltError, Result};
use std::collections::HashSet;

/// Order tables so that every referenced table comes before its referencers
///
/// Passes are repeated over the tables not yet placed, in discovery
/// order; a table is placed as soon as all its parents are. When a pass
/// places nothing while tables remain, those tables form (or hang off) a
/// reference cycle and an error is returned.
pub fn load_order(tables: &[TableSchema]) -> Result<Vec<String>> {
    let mut ordered: Vec<String> = Vec::with_capacity(tables.len());
    let mut placed: HashSet<&str> = HashSet::with_capacity(tables.len());
    let mut remaining: Vec<&TableSchema> = tables.iter().collect();

    while !remaining.is_empty() {
        let before = remaining.len();

        remaining.retain(|table| {
            let ready = table.parents().iter().all(|p| placed.contains(p.as_str()));
            if ready {
                placed.insert(table.name());
                ordered.push(table.name().to_string());
            }
            !ready
        });

        if remaining.len() == before {
            return Err(MeltError::ReferenceCycle {
                tables: remaining.iter().map(|t| t.name().to_string()).collect(),
            });
        }
    }

    Ok(ordered)
}
