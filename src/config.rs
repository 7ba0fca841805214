//! Run configuration shared by the binaries
//!
//! Settings come from an optional JSON file and from command-line flags,
//! with flags taking precedence. A merged [`RunConfig`] is checked by
//! [`RunConfig::validate`] before any document is read.

use crate::document::DocumentFormat;
use crate::error::{MeltError, Result};
use crate::melt::SqlOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Output flavour of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One CSV file per table in an output directory
    Csv,
    /// One SQL script plus an annotation script
    Sql,
}

/// Unvalidated settings, every key optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: Option<DocumentFormat>,
    pub schema: Option<String>,
    pub root: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub catalog: Option<String>,
}

/// Remote catalog to read id seeds from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTarget {
    pub url: String,
    pub schema: String,
}

/// Settings that passed validation
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: Option<DocumentFormat>,
    pub catalog: Option<CatalogTarget>,
    /// Present in SQL mode only
    pub sql: Option<SqlOptions>,
}

impl RunConfig {
    /// Load settings from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| MeltError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| MeltError::Config(format!("invalid config file {}: {}", path.display(), e)))
    }

    /// Overlay `overrides` on top of `self`; set keys in `overrides` win
    pub fn merge(self, overrides: RunConfig) -> RunConfig {
        RunConfig {
            input: overrides.input.or(self.input),
            output: overrides.output.or(self.output),
            format: overrides.format.or(self.format),
            schema: overrides.schema.or(self.schema),
            root: overrides.root.or(self.root),
            title: overrides.title.or(self.title),
            thumbnail: overrides.thumbnail.or(self.thumbnail),
            catalog: overrides.catalog.or(self.catalog),
        }
    }

    /// Check the settings needed for `mode` and resolve them
    pub fn validate(self, mode: OutputMode) -> Result<ResolvedConfig> {
        let input = self
            .input
            .ok_or_else(|| MeltError::Config("no input directory given".to_string()))?;
        if !input.is_dir() {
            return Err(MeltError::Config(format!(
                "input path {} is not a directory",
                input.display()
            )));
        }

        let output = self
            .output
            .ok_or_else(|| MeltError::Config("no output path given".to_string()))?;

        let schema = self.schema.filter(|s| !s.trim().is_empty());

        let catalog = match self.catalog {
            Some(url) => {
                let schema = schema.clone().ok_or_else(|| {
                    MeltError::Config("a schema name is required to read from a catalog".to_string())
                })?;
                Some(CatalogTarget { url, schema })
            }
            None => None,
        };

        let sql = match mode {
            OutputMode::Csv => None,
            OutputMode::Sql => {
                let schema = schema.ok_or_else(|| {
                    MeltError::Config("a schema name is required for SQL output".to_string())
                })?;
                Some(SqlOptions {
                    schema,
                    root: self.root,
                    title: self.title,
                    thumbnail: self.thumbnail,
                })
            }
        };

        Ok(ResolvedConfig {
            input,
            output,
            format: self.format,
            catalog,
            sql,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with_dirs() -> (tempfile::TempDir, RunConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            input: Some(dir.path().to_path_buf()),
            output: Some(dir.path().join("out")),
            ..RunConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"input": "data", "output": "out.sql", "format": "xml", "schema": "lib", "title": "@title"}}"#
        )
        .unwrap();

        let config = RunConfig::from_file(file.path()).unwrap();
        assert_eq!(config.input, Some(PathBuf::from("data")));
        assert_eq!(config.format, Some(DocumentFormat::Xml));
        assert_eq!(config.schema.as_deref(), Some("lib"));
        assert_eq!(config.title.as_deref(), Some("@title"));
        assert_eq!(config.root, None);
    }

    #[test]
    fn test_from_file_rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"inptu": "data"}}"#).unwrap();
        assert!(matches!(
            RunConfig::from_file(file.path()),
            Err(MeltError::Config(_))
        ));
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let file = RunConfig {
            input: Some("a".into()),
            schema: Some("from_file".to_string()),
            title: Some("name".to_string()),
            ..RunConfig::default()
        };
        let flags = RunConfig {
            schema: Some("from_flags".to_string()),
            ..RunConfig::default()
        };

        let merged = file.merge(flags);
        assert_eq!(merged.input, Some(PathBuf::from("a")));
        assert_eq!(merged.schema.as_deref(), Some("from_flags"));
        assert_eq!(merged.title.as_deref(), Some("name"));
    }

    #[test]
    fn test_validate_csv() {
        let (_dir, config) = with_dirs();
        let resolved = config.validate(OutputMode::Csv).unwrap();
        assert!(resolved.sql.is_none());
        assert!(resolved.catalog.is_none());
    }

    #[test]
    fn test_validate_missing_input() {
        let config = RunConfig {
            output: Some("out".into()),
            ..RunConfig::default()
        };
        assert!(matches!(
            config.validate(OutputMode::Csv),
            Err(MeltError::Config(_))
        ));
    }

    #[test]
    fn test_validate_input_not_a_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = RunConfig {
            input: Some(file.path().to_path_buf()),
            output: Some("out".into()),
            ..RunConfig::default()
        };
        let err = config.validate(OutputMode::Csv).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_validate_sql_requires_schema() {
        let (_dir, config) = with_dirs();
        assert!(matches!(
            config.clone().validate(OutputMode::Sql),
            Err(MeltError::Config(_))
        ));

        let blank = RunConfig {
            schema: Some("  ".to_string()),
            ..config.clone()
        };
        assert!(blank.validate(OutputMode::Sql).is_err());

        let named = RunConfig {
            schema: Some("lib".to_string()),
            root: Some("library".to_string()),
            ..config
        };
        let sql = named.validate(OutputMode::Sql).unwrap().sql.unwrap();
        assert_eq!(sql.schema, "lib");
        assert_eq!(sql.root.as_deref(), Some("library"));
    }

    #[test]
    fn test_validate_catalog_requires_schema() {
        let (_dir, config) = with_dirs();
        let without = RunConfig {
            catalog: Some("https://example.org/ermrest/catalog/1".to_string()),
            ..config.clone()
        };
        assert!(without.validate(OutputMode::Csv).is_err());

        let with = RunConfig {
            catalog: Some("https://example.org/ermrest/catalog/1".to_string()),
            schema: Some("lib".to_string()),
            ..config
        };
        let target = with.validate(OutputMode::Csv).unwrap().catalog.unwrap();
        assert_eq!(target.schema, "lib");
    }
}
