//! Hierarchical documents normalized into one closed shape
//!
//! XML and JSON inputs are both turned into a tree of [`Node`]s whose
//! fields carry a [`FieldValue`]. The discovery and population walkers
//! only ever see this representation, and they match on it exhaustively.

pub mod json;
pub mod xml;

use crate::error::{MeltError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Value of a single field of a container
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A single scalar, kept in its textual form
    Scalar(String),
    /// Several scalars that collapse into one delimited text column
    TextList(Vec<String>),
    /// A nested structure that becomes its own table
    Container(Node),
    /// Several nested structures of the same table
    ContainerList(Vec<Node>),
    /// An explicitly empty value
    Null,
}

/// A named field of a container
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Field {
            name: name.into(),
            value,
        }
    }
}

/// A container: one occurrence of a table-producing structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub fields: Vec<Field>,
}

impl Node {
    pub fn new(fields: Vec<Field>) -> Self {
        Node { fields }
    }
}

/// One parsed input document
///
/// `roots` are the top-level fields; each must be a container for the
/// document to be mappable.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: PathBuf,
    pub roots: Vec<Field>,
}

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Xml,
    Json,
}

impl DocumentFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xml" => Some(DocumentFormat::Xml),
            "json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }

    /// Parse raw bytes of one document
    pub fn parse(self, source: &Path, bytes: Vec<u8>) -> Result<Document> {
        match self {
            DocumentFormat::Xml => xml::parse_document(source, &bytes),
            DocumentFormat::Json => json::parse_document(source, bytes),
        }
    }
}

/// List the documents of a directory in processing order
///
/// Files are sorted by name so that column order is reproducible. When
/// `format` is `None` it is inferred from the extensions, and a directory
/// mixing XML and JSON is rejected.
pub fn list_documents(
    dir: &Path,
    format: Option<DocumentFormat>,
) -> Result<(Vec<PathBuf>, Option<DocumentFormat>)> {
    let entries = std::fs::read_dir(dir).map_err(|e| MeltError::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| MeltError::io(dir, e))?.path();
        if !path.is_file() {
            debug!(path = %path.display(), "Skipping non-file entry");
            continue;
        }
        paths.push(path);
    }
    paths.sort();

    let format = match format {
        Some(f) => Some(f),
        None => infer_format(&paths)?,
    };

    let Some(format) = format else {
        return Ok((Vec::new(), None));
    };

    let selected = paths
        .into_iter()
        .filter(|p| {
            let keep = DocumentFormat::from_path(p) == Some(format);
            if !keep {
                debug!(path = %p.display(), "Skipping file with foreign extension");
            }
            keep
        })
        .collect();

    Ok((selected, Some(format)))
}

fn infer_format(paths: &[PathBuf]) -> Result<Option<DocumentFormat>> {
    let mut found = None;
    for path in paths {
        let Some(format) = DocumentFormat::from_path(path) else {
            continue;
        };
        match found {
            None => found = Some(format),
            Some(existing) if existing != format => {
                return Err(MeltError::Config(
                    "input directory mixes XML and JSON documents; pass --format".to_string(),
                ));
            }
            Some(_) => {}
        }
    }
    Ok(found)
}

/// Read and parse one document
pub fn load_document(path: &Path, format: DocumentFormat) -> Result<Document> {
    let bytes = std::fs::read(path).map_err(|e| MeltError::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Parsing document");
    format.parse(path, bytes)
}

/// Read and parse every document of a directory
pub fn load_directory(dir: &Path, format: Option<DocumentFormat>) -> Result<Vec<Document>> {
    let (paths, format) = list_documents(dir, format)?;
    let Some(format) = format else {
        return Ok(Vec::new());
    };

    paths.iter().map(|p| load_document(p, format)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/b.XML")),
            Some(DocumentFormat::Xml)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("b.json")),
            Some(DocumentFormat::Json)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let docs = load_directory(dir.path(), None).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_sorted_listing_and_filtering() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), r#"{"x": {"v": "1"}}"#).unwrap();
        fs::write(dir.path().join("a.json"), r#"{"x": {"v": "2"}}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let (paths, format) = list_documents(dir.path(), None).unwrap();
        assert_eq!(format, Some(DocumentFormat::Json));
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_mixed_formats_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("b.xml"), "<a><b/></a>").unwrap();

        let err = list_documents(dir.path(), None).unwrap_err();
        assert!(matches!(err, MeltError::Config(_)));

        let (paths, _) = list_documents(dir.path(), Some(DocumentFormat::Xml)).unwrap();
        assert_eq!(paths.len(), 1);
    }
}
