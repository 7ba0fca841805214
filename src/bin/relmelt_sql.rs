//! relmelt-sql: Melt a directory of XML/JSON documents into an SQL script
//!
//! Writes the DDL and inserts to the output file and display annotations to
//! `<schema>_annotation.sql` next to it.
//!
//! Usage:
//!   relmelt-sql -i ./records -o ./lib.sql -s lib -r library -t @title

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use relmelt::logging::init_logging;
use relmelt::{melt_directory, CatalogClient, DocumentFormat, IdSeedSource, OutputMode, RunConfig, SqlWriter};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "relmelt-sql")]
#[command(about = "Melt XML/JSON documents into an SQL load script", long_about = None)]
struct Args {
    /// Directory of input documents
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,

    /// Output SQL file
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Target schema name
    #[arg(long, short = 's')]
    schema: Option<String>,

    /// Top-level table (default: every table without parents)
    #[arg(long, short = 'r')]
    root: Option<String>,

    /// Column to annotate as the display title
    #[arg(long, short = 't')]
    title: Option<String>,

    /// Column to annotate as the thumbnail
    #[arg(long, short = 'p')]
    thumbnail: Option<String>,

    /// Input format (default: inferred from file extensions)
    #[arg(long, value_enum)]
    format: Option<DocumentFormat>,

    /// Catalog URL to read current id maxima from
    #[arg(long)]
    catalog: Option<String>,

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
        root: args.root,
        title: args.title,
        thumbnail: args.thumbnail,
        catalog: args.catalog,
    };
    let config = base.merge(flags).validate(OutputMode::Sql)?;
    let options = config
        .sql
        .clone()
        .context("SQL options missing after validation")?;

    let client = match &config.catalog {
        Some(target) => Some(CatalogClient::new(&target.url, &target.schema)?),
        None => None,
    };
    let seeds = client.as_ref().map(|c| c as &dyn IdSeedSource);

    let (schema, data) = melt_directory(&config.input, config.format, seeds)
        .with_context(|| format!("Failed to melt {}", config.input.display()))?;

    let writer = SqlWriter::new(options);
    match writer
        .write_files(&config.output, &schema, &data)
        .with_context(|| format!("Failed to write {}", config.output.display()))?
    {
        Some((script, annotations)) => info!(
            tables = schema.len(),
            rows = data.row_count(),
            script = %script.display(),
            annotations = %annotations.display(),
            "Wrote SQL"
        ),
        None => info!("No tables discovered, nothing written"),
    }

    Ok(())
}
