/// Quickstart example - discover, melt and write a small document set
use relmelt::document::{json, xml};
use relmelt::{discover, melt, CsvWriter, SqlOptions, SqlWriter};
use serde_json::json;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    println!("=== Relmelt Quick Start ===\n");

    // Step 1: Documents, one XML and one JSON shape
    let library = xml::parse_document(
        Path::new("library.xml"),
        br#"<library><book id="1" title="Dune"><author>Herbert</author></book><book id="2" title="Foundation"><author>Asimov</author></book></library>"#,
    )?;
    let order = json::to_document(
        Path::new("order.json"),
        json!({"order": {"id": "7", "total": "19.99", "items": [{"sku": "X1"}, {"sku": "X2"}]}}),
    )?;
    let documents = vec![library, order];

    // Step 2: First pass, discover tables, columns and references
    let schema = discover(&documents)?;

    println!("Discovered {} tables, in load order:", schema.len());
    for table in schema.sorted_tables() {
        let columns: Vec<String> = table
            .columns()
            .iter()
            .map(|c| format!("{} {}", table.output_name(&c.name), c.effective_type()))
            .collect();
        println!("  {} ({}) -> {:?}", table.name(), columns.join(", "), table.parents());
    }

    // Step 3: Second pass, populate rows
    let data = melt(&schema, &documents, None)?;
    println!("\nPopulated {} rows", data.row_count());

    // Step 4: Write CSV files and an SQL script
    let out = Path::new("relmelt_quickstart");
    let written = CsvWriter::new(out)?.write_all(&schema, &data)?;

    let sql = SqlWriter::new(SqlOptions {
        schema: "quickstart".to_string(),
        title: Some("@title".to_string()),
        ..SqlOptions::default()
    });
    let files = sql.write_files(&out.join("quickstart.sql"), &schema, &data)?;

    println!("\n✓ Done! Created files:");
    for path in &written {
        println!("  • {}", path.display());
    }
    if let Some((script, annotations)) = files {
        println!("  • {}", script.display());
        println!("  • {}", annotations.display());
    }

    Ok(())
}
