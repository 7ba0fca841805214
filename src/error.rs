//! Error types for schema discovery and data population

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a melt run
///
/// There is no recovery path for any of these: discovery and population
/// both need a consistent document set, so the first error ends the run.
#[derive(Error, Debug)]
pub enum MeltError {
    /// Filesystem error while reading inputs or writing outputs
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV file could not be written
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A JSON document could not be parsed
    #[error("JSON parsing error in {path}: {message}")]
    Json { path: PathBuf, message: String },

    /// An XML document could not be parsed
    #[error("XML parsing error in {path}: {message}")]
    Xml { path: PathBuf, message: String },

    /// A document value of a shape the engine does not map (e.g. a JSON boolean)
    #[error("Unsupported value for field '{field}': {found}")]
    UnsupportedValue { field: String, found: String },

    /// A document whose structure cannot be mapped to tables
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Tables whose references can never be satisfied
    #[error("Reference cycle between tables: {}", tables.join(", "))]
    ReferenceCycle { tables: Vec<String> },

    /// Population met a container shape that discovery never saw
    #[error("Table '{0}' was not discovered")]
    UndiscoveredTable(String),

    /// Population met a parent/child nesting that discovery never saw
    #[error("Table '{table}' has no discovered reference to '{parent}'")]
    UndiscoveredReference { table: String, parent: String },

    /// The remote catalog returned an error or an unexpected payload
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Invalid or incomplete run configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MeltError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeltError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = MeltError> = std::result::Result<T, E>;
