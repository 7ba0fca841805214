//! SQL script and annotation output
//!
//! The script recreates the schema, creates every table in load order and
//! inserts the rows, all inside one transaction. The annotation script
//! carries display hints for an ERMrest catalog: nested tables are
//! excluded from the top-level view, surrogate and foreign key columns
//! are hidden, and optional title/thumbnail columns are marked.

use crate::error::{MeltError, Result};
use crate::melt::data::{Dataset, Row};
use crate::schema::{Schema, TableSchema, ID_COLUMN};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options for SQL output
#[derive(Debug, Clone, Default)]
pub struct SqlOptions {
    /// Target schema name
    pub schema: String,
    /// Top-level table; when unset every table without parents is top-level
    pub root: Option<String>,
    /// Column marked as the human-readable title
    pub title: Option<String>,
    /// Column marked as the thumbnail reference
    pub thumbnail: Option<String>,
}

/// Writes SQL DDL/DML and annotation statements
pub struct SqlWriter {
    options: SqlOptions,
}

impl SqlWriter {
    pub fn new(options: SqlOptions) -> Self {
        if options.title.is_none() {
            warn!("No title column configured");
        }
        if options.thumbnail.is_none() {
            warn!("No thumbnail column configured");
        }
        SqlWriter { options }
    }

    /// Path of the annotation script written next to `output`
    pub fn annotation_path(&self, output: &Path) -> PathBuf {
        let name = format!("{}_annotation.sql", self.options.schema);
        match output.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Write the SQL script to `output` and the annotation script next to it
    ///
    /// Returns `None` without touching the filesystem when the schema has
    /// no tables.
    pub fn write_files(
        &self,
        output: &Path,
        schema: &Schema,
        data: &Dataset,
    ) -> Result<Option<(PathBuf, PathBuf)>> {
        if schema.is_empty() {
            debug!("No tables discovered, skipping SQL output");
            return Ok(None);
        }

        write_file(output, |out| self.write_script(out, schema, data))?;

        let annotations = self.annotation_path(output);
        write_file(&annotations, |out| self.write_annotations(out, schema))?;

        Ok(Some((output.to_path_buf(), annotations)))
    }

    /// Write the schema, table definitions and inserts
    pub fn write_script<W: Write>(&self, out: &mut W, schema: &Schema, data: &Dataset) -> std::io::Result<()> {
        let schema_name = quote_ident(&self.options.schema);

        writeln!(out, "BEGIN;\n")?;
        writeln!(out, "DROP SCHEMA {} CASCADE;\n", schema_name)?;
        writeln!(out, "CREATE SCHEMA {};\n", schema_name)?;

        for table in schema.sorted_tables() {
            self.write_create_table(out, table)?;
        }

        for table in schema.sorted_tables() {
            for row in data.rows(table.name()) {
                self.write_insert(out, table, row)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "COMMIT;")?;
        Ok(())
    }

    fn write_create_table<W: Write>(&self, out: &mut W, table: &TableSchema) -> std::io::Result<()> {
        let schema_name = quote_ident(&self.options.schema);

        let mut lines = vec![format!("\t{} integer PRIMARY KEY", quote_ident(ID_COLUMN))];
        for column in table.columns() {
            lines.push(format!(
                "\t{} {}",
                quote_ident(&table.output_name(&column.name)),
                column.effective_type()
            ));
        }
        for fk in table.foreign_keys() {
            lines.push(format!("\t{} integer", quote_ident(&fk)));
        }
        for parent in table.parents() {
            lines.push(format!(
                "\tFOREIGN KEY ({}) REFERENCES {}.{} ({})",
                quote_ident(&crate::schema::foreign_key(parent)),
                schema_name,
                quote_ident(parent),
                ID_COLUMN
            ));
        }

        writeln!(out, "CREATE TABLE {}.{}", schema_name, quote_ident(table.name()))?;
        writeln!(out, "(")?;
        writeln!(out, "{}", lines.join(",\n"))?;
        writeln!(out, ");\n")
    }

    fn write_insert<W: Write>(&self, out: &mut W, table: &TableSchema, row: &Row) -> std::io::Result<()> {
        let mut columns = vec![quote_ident(ID_COLUMN)];
        let mut values = vec![row.id.to_string()];

        for column in table.columns() {
            if let Some(value) = row.value(&column.name) {
                columns.push(quote_ident(&table.output_name(&column.name)));
                values.push(quote_literal(value));
            }
        }
        for parent in table.parents() {
            if let Some(id) = row.parent_id(parent) {
                columns.push(quote_ident(&crate::schema::foreign_key(parent)));
                values.push(id.to_string());
            }
        }

        writeln!(
            out,
            "INSERT INTO {}.{} ({}) VALUES({});",
            quote_ident(&self.options.schema),
            quote_ident(table.name()),
            columns.join(","),
            values.join(",")
        )
    }

    /// Write the catalog annotation statements
    pub fn write_annotations<W: Write>(&self, out: &mut W, schema: &Schema) -> std::io::Result<()> {
        let schema_name = quote_literal(&self.options.schema);

        writeln!(out, "BEGIN;\n")?;
        writeln!(
            out,
            "DELETE FROM _ermrest.model_table_annotation WHERE schema_name={};",
            schema_name
        )?;
        writeln!(
            out,
            "DELETE FROM _ermrest.model_column_annotation WHERE schema_name={};\n",
            schema_name
        )?;

        for table in schema.sorted_tables() {
            let table_name = quote_literal(table.name());

            if !self.is_root(table) {
                writeln!(
                    out,
                    "INSERT INTO _ermrest.model_table_annotation VALUES({}, {}, 'comment', '[\"exclude\", \"nested\"]');",
                    schema_name, table_name
                )?;
            }

            self.write_column_annotation(out, table, ID_COLUMN, "hidden")?;
            for column in table.columns() {
                let name = table.output_name(&column.name);
                if self.options.thumbnail.as_deref() == Some(column.name.as_str()) {
                    self.write_column_annotation(out, table, &name, "thumbnail")?;
                }
                if self.options.title.as_deref() == Some(column.name.as_str()) {
                    self.write_column_annotation(out, table, &name, "title")?;
                }
            }
            for fk in table.foreign_keys() {
                self.write_column_annotation(out, table, &fk, "hidden")?;
            }
        }

        writeln!(out, "\nCOMMIT;")?;
        Ok(())
    }

    fn write_column_annotation<W: Write>(
        &self,
        out: &mut W,
        table: &TableSchema,
        column: &str,
        marker: &str,
    ) -> std::io::Result<()> {
        writeln!(
            out,
            "INSERT INTO _ermrest.model_column_annotation VALUES({}, {}, {}, 'comment', '[\"{}\"]');",
            quote_literal(&self.options.schema),
            quote_literal(table.name()),
            quote_literal(column),
            marker
        )
    }

    fn is_root(&self, table: &TableSchema) -> bool {
        match &self.options.root {
            Some(root) => root == table.name(),
            None => table.parents().is_empty(),
        }
    }
}

fn write_file<F>(path: &Path, render: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path).map_err(|e| MeltError::io(path, e))?;
    let mut out = BufWriter::new(file);
    render(&mut out)
        .and_then(|_| out.flush())
        .map_err(|e| MeltError::io(path, e))?;
    debug!(path = %path.display(), "Wrote SQL");
    Ok(())
}

/// Double-quoted SQL identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quoted SQL string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
