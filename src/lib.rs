//! # Relmelt - Hierarchical to Relational Mapping
//!
//! Infers a relational schema from a directory of XML or JSON documents and
//! melts the documents into rows of that schema, written as CSV files or as
//! an SQL script.
//!
//! ## Modules
//!
//! - **document**: Parse XML/JSON into a uniform field tree
//! - **schema**: Discover tables, columns, types and references, then order tables
//! - **melt**: Populate rows with surrogate ids and foreign keys, and write them out
//! - **catalog**: Read current id maxima from a remote catalog for incremental loads
//!
//! ## Quick Start
//!
//! ```rust
//! use relmelt::document::json;
//! use relmelt::{discover, melt};
//! use serde_json::json;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let doc = json::to_document(
//!     Path::new("order.json"),
//!     json!({"order": {"id": "7", "items": [{"sku": "X1"}, {"sku": "X2"}]}}),
//! )?;
//! let documents = vec![doc];
//!
//! let schema = discover(&documents)?;
//! assert_eq!(schema.load_order(), ["order", "items"]);
//!
//! let data = melt(&schema, &documents, None)?;
//! assert_eq!(data.rows("items").len(), 2);
//! assert_eq!(data.rows("items")[1].parent_id("order"), Some(1));
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod melt;
pub mod schema;
pub mod types;

// Re-export commonly used types for convenience
pub use catalog::{CatalogClient, IdSeedSource};
pub use config::{OutputMode, ResolvedConfig, RunConfig};
pub use document::{Document, DocumentFormat, Field, FieldValue, Node};
pub use error::{MeltError, Result};
pub use melt::{CsvWriter, Dataset, MeltStats, Melter, SqlOptions, SqlWriter};
pub use schema::{Schema, SchemaBuilder, TableSchema};
pub use types::SqlType;

/// First pass: discover the schema of a document set
pub fn discover(documents: &[Document]) -> Result<Schema> {
    let mut builder = SchemaBuilder::new();
    builder.add_documents(documents)?;
    builder.build()
}

/// Second pass: populate rows, optionally starting ids after `seeds`
pub fn melt(schema: &Schema, documents: &[Document], seeds: Option<&HashMap<String, u64>>) -> Result<Dataset> {
    let mut melter = match seeds {
        Some(seeds) => Melter::new(schema).with_seeds(seeds),
        None => Melter::new(schema),
    };
    melter.melt_all(documents)?;
    Ok(melter.finish())
}

/// Main entry point: load a directory and run both passes
///
/// When `seeds` is given, it is asked for the current id maxima of every
/// discovered table before population starts.
pub fn melt_directory(
    input: &Path,
    format: Option<DocumentFormat>,
    seeds: Option<&dyn IdSeedSource>,
) -> Result<(Schema, Dataset)> {
    let documents = document::load_directory(input, format)?;
    info!(documents = documents.len(), input = %input.display(), "Loaded documents");

    let schema = discover(&documents)?;

    let seeds = match seeds {
        Some(source) => Some(source.fetch_seeds(schema.load_order())?),
        None => None,
    };

    let data = melt(&schema, &documents, seeds.as_ref())?;
    Ok((schema, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSeeds(u64);

    impl IdSeedSource for FixedSeeds {
        fn fetch_seeds(&self, tables: &[String]) -> Result<HashMap<String, u64>> {
            Ok(tables.iter().map(|t| (t.clone(), self.0)).collect())
        }
    }

    struct FailingSeeds;

    impl IdSeedSource for FailingSeeds {
        fn fetch_seeds(&self, _tables: &[String]) -> Result<HashMap<String, u64>> {
            Err(MeltError::Catalog("HTTP error 503".to_string()))
        }
    }

    fn library_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.xml"),
            r#"<library><book id="1" title="Dune"><author>Herbert</author></book></library>"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_basic_melting() {
        let dir = library_dir();
        let (schema, data) = melt_directory(dir.path(), None, None).unwrap();

        assert_eq!(schema.load_order(), ["library", "book"]);
        assert_eq!(data.rows("book").len(), 1);
        assert_eq!(data.rows("book")[0].id, 1);
    }

    #[test]
    fn test_seeded_melting() {
        let dir = library_dir();
        let (_, data) = melt_directory(dir.path(), None, Some(&FixedSeeds(10))).unwrap();

        assert_eq!(data.rows("library")[0].id, 11);
        assert_eq!(data.rows("book")[0].id, 11);
        assert_eq!(data.rows("book")[0].parent_id("library"), Some(11));
    }

    #[test]
    fn test_seed_failure_aborts() {
        let dir = library_dir();
        let err = melt_directory(dir.path(), None, Some(&FailingSeeds)).unwrap_err();
        assert!(matches!(err, MeltError::Catalog(_)));
    }
}
