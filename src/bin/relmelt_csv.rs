//! relmelt-csv: Melt a directory of XML/JSON documents into CSV files
//!
//! Usage:
//!   # One CSV per table plus index.txt listing them in load order
//!   relmelt-csv -i ./records -o ./tables
//!
//!   # Continue ids after the rows already in a catalog
//!   relmelt-csv -i ./records -o ./tables --catalog https://host/ermrest/catalog/1 --schema lib

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use relmelt::logging::init_logging;
use relmelt::{melt_directory, CatalogClient, CsvWriter, DocumentFormat, IdSeedSource, OutputMode, RunConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "relmelt-csv")]
#[command(about = "Melt XML/JSON documents into one CSV file per table", long_about = None)]
struct Args {
    /// Directory of input documents
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,

    /// Output directory for the CSV files
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Input format (default: inferred from file extensions)
    #[arg(long, value_enum)]
    format: Option<DocumentFormat>,

    /// Catalog URL to read current id maxima from
    #[arg(long)]
    catalog: Option<String>,

    /// Schema name in the catalog
    #[arg(long, short = 's')]
    schema: Option<String>,

    /// JSON file with default settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let base = match &args.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };
    let flags = RunConfig {
        input: args.input,
        output: args.output,
        format: args.format,
        schema: args.schema,
        catalog: args.catalog,
        ..RunConfig::default()
    };
    let config = base.merge(flags).validate(OutputMode::Csv)?;

    let client = match &config.catalog {
        Some(target) => Some(CatalogClient::new(&target.url, &target.schema)?),
        None => None,
    };
    let seeds = client.as_ref().map(|c| c as &dyn IdSeedSource);

    let (schema, data) = melt_directory(&config.input, config.format, seeds)
        .with_context(|| format!("Failed to melt {}", config.input.display()))?;

    if schema.is_empty() {
        info!("No tables discovered, nothing written");
        return Ok(());
    }

    let writer = CsvWriter::new(&config.output)?;
    let written = writer
        .write_all(&schema, &data)
        .with_context(|| format!("Failed to write CSV files to {}", config.output.display()))?;

    info!(
        tables = written.len(),
        rows = data.row_count(),
        output = %config.output.display(),
        "Wrote CSV files"
    );

    Ok(())
}
