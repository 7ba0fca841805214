use crate::error::{MeltError, Result};
use crate::melt::data::{Dataset, Row};
use crate::schema::{Schema, TableSchema, ID_COLUMN};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the file listing CSV files in load order
pub const INDEX_FILE: &str = "index.txt";

/// Writes one CSV file per table into a directory
pub struct CsvWriter {
    output_dir: PathBuf,
}

impl CsvWriter {
    /// Create a writer for `output_dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).map_err(|e| MeltError::io(&output_dir, e))?;

        Ok(CsvWriter { output_dir })
    }

    /// Write every table that has rows, in load order, plus the index file
    ///
    /// Returns the paths of the CSV files written. Nothing at all is
    /// written when no table has rows.
    pub fn write_all(&self, schema: &Schema, data: &Dataset) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        for table in schema.sorted_tables() {
            let rows = data.rows(table.name());
            if rows.is_empty() {
                debug!(table = table.name(), "Skipping table without rows");
                continue;
            }

            let path = self.output_dir.join(format!("{}.csv", table.name()));
            let file = File::create(&path).map_err(|e| MeltError::io(&path, e))?;
            write_table(file, table, rows).map_err(|source| MeltError::Csv {
                path: path.clone(),
                source,
            })?;

            debug!(table = table.name(), rows = rows.len(), path = %path.display(), "Wrote CSV");
            written.push(path);
        }

        if !written.is_empty() {
            let index = self.output_dir.join(INDEX_FILE);
            let mut out = BufWriter::new(File::create(&index).map_err(|e| MeltError::io(&index, e))?);
            for path in &written {
                if let Some(name) = path.file_name() {
                    writeln!(out, "{}", name.to_string_lossy()).map_err(|e| MeltError::io(&index, e))?;
                }
            }
            out.flush().map_err(|e| MeltError::io(&index, e))?;
        }

        Ok(written)
    }
}

/// Write the header and rows of one table
///
/// Columns are `id`, the discovered columns in discovery order, then one
/// foreign key per parent. Fields are quoted only when they hold a
/// delimiter, a quote or a line break, with embedded quotes doubled.
/// Absent values are left empty.
pub fn write_table<W: Write>(out: W, table: &TableSchema, rows: &[Row]) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(out);

    let mut header = vec![ID_COLUMN.to_string()];
    header.extend(table.columns().iter().map(|c| table.output_name(&c.name).into_owned()));
    header.extend(table.foreign_keys());
    writer.write_record(&header)?;

    let mut record: Vec<String> = Vec::with_capacity(header.len());
    for row in rows {
        record.clear();
        record.push(row.id.to_string());
        for column in table.columns() {
            record.push(row.value(&column.name).unwrap_or_default().to_string());
        }
        for parent in table.parents() {
            record.push(row.parent_id(parent).map(|id| id.to_string()).unwrap_or_default());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
