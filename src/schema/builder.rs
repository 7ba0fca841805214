//! Schema discovery
//!
//! The builder walks each document once and accumulates tables, columns,
//! column types and parent references. No data is kept: population is a
//! separate pass driven by the closed [`Schema`].

use super::{sort, validate_table_name, Schema, TableSchema};
use crate::document::{Document, FieldValue, Node};
use crate::error::{MeltError, Result};
use crate::types::SqlType;
use std::collections::HashMap;
use tracing::{debug, info};

/// Accumulates the relational shape of a document set
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: Vec<TableSchema>,
    table_index: HashMap<String, usize>,
    document_count: usize,
}

impl SchemaBuilder {
    /// Create a new empty builder
    pub fn new() -> Self {
        SchemaBuilder::default()
    }

    /// Discover the tables of one document
    ///
    /// Documents may be added in any order; the resulting sets of tables,
    /// columns and references do not depend on it, only their insertion
    /// order does.
    pub fn add_document(&mut self, document: &Document) -> Result<()> {
        debug!(source = %document.source.display(), "Discovering schema");

        for root in &document.roots {
            match &root.value {
                FieldValue::Container(node) => self.discover(&root.name, None, node)?,
                FieldValue::ContainerList(nodes) => {
                    self.table_mut(&root.name)?;
                    for node in nodes {
                        self.discover(&root.name, None, node)?;
                    }
                }
                FieldValue::Scalar(_) | FieldValue::TextList(_) | FieldValue::Null => {
                    return Err(MeltError::MalformedDocument(format!(
                        "field '{}' of {} has no enclosing table",
                        root.name,
                        document.source.display()
                    )));
                }
            }
        }

        self.document_count += 1;
        Ok(())
    }

    /// Discover every document of a set, in order
    pub fn add_documents<'a>(&mut self, documents: impl IntoIterator<Item = &'a Document>) -> Result<()> {
        for document in documents {
            self.add_document(document)?;
        }
        Ok(())
    }

    /// Number of tables discovered so far
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Close the model and compute the table load order
    pub fn build(self) -> Result<Schema> {
        let order = sort::load_order(&self.tables)?;

        info!(
            documents = self.document_count,
            tables = self.tables.len(),
            "Schema discovery finished"
        );

        Ok(Schema::new(self.tables, self.table_index, order))
    }

    fn discover(&mut self, table: &str, parent: Option<&str>, node: &Node) -> Result<()> {
        let t = self.table_mut(table)?;
        if let Some(parent) = parent {
            t.add_parent(parent);
        }

        for field in &node.fields {
            match &field.value {
                FieldValue::Scalar(sample) => {
                    let column = self.table_mut(table)?.add_column(&field.name);
                    column.sql_type = Some(SqlType::widen(column.sql_type, sample));
                }
                FieldValue::TextList(_) => {
                    let column = self.table_mut(table)?.add_column(&field.name);
                    column.sql_type = Some(SqlType::join(column.sql_type, SqlType::Text));
                }
                FieldValue::Null => {
                    self.table_mut(table)?.add_column(&field.name);
                }
                FieldValue::Container(child) => {
                    self.discover(&field.name, Some(table), child)?;
                }
                FieldValue::ContainerList(children) => {
                    // Registered even when empty
                    self.table_mut(&field.name)?.add_parent(table);
                    for child in children {
                        self.discover(&field.name, Some(table), child)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut TableSchema> {
        let idx = match self.table_index.get(name) {
            Some(&idx) => idx,
            None => {
                validate_table_name(name)?;
                self.tables.push(TableSchema::new(name));
                let idx = self.tables.len() - 1;
                self.table_index.insert(name.to_string(), idx);
                idx
            }
        };
        Ok(&mut self.tables[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{json, xml};
    use serde_json::json;
    use std::path::Path;

    fn xml_doc(s: &str) -> Document {
        xml::parse_document(Path::new("t.xml"), s.as_bytes()).unwrap()
    }

    fn json_doc(v: serde_json::Value) -> Document {
        json::to_document(Path::new("t.json"), v).unwrap()
    }

    fn column_names(t: &TableSchema) -> Vec<&str> {
        t.columns().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_library_schema() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_document(&xml_doc(
                r#"<library><book id="1" title="Dune"><author>Herbert</author></book><book id="2" title="Foundation"><author>Asimov</author></book></library>"#,
            ))
            .unwrap();
        let schema = builder.build().unwrap();

        assert_eq!(schema.load_order(), &["library".to_string(), "book".to_string()]);

        let library = schema.table("library").unwrap();
        assert!(library.columns().is_empty());
        assert!(library.parents().is_empty());

        let book = schema.table("book").unwrap();
        assert_eq!(column_names(book), vec!["@id", "@title", "author"]);
        assert_eq!(book.column("@id").unwrap().sql_type, Some(SqlType::Integer));
        assert_eq!(book.column("@title").unwrap().sql_type, Some(SqlType::Text));
        assert_eq!(book.column("author").unwrap().sql_type, Some(SqlType::Text));
        assert_eq!(book.parents(), &["library".to_string()]);
    }

    #[test]
    fn test_repeated_leaf_is_text() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_document(&xml_doc("<tags><tag>1</tag><tag>2</tag></tags>"))
            .unwrap();
        let schema = builder.build().unwrap();

        let tags = schema.table("tags").unwrap();
        assert_eq!(column_names(tags), vec!["tag"]);
        assert_eq!(tags.column("tag").unwrap().sql_type, Some(SqlType::Text));
    }

    #[test]
    fn test_attribute_leaf_becomes_table() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_document(&xml_doc(
                r#"<item><price currency="EUR">12.50</price><name>Pen</name></item>"#,
            ))
            .unwrap();
        let schema = builder.build().unwrap();

        let price = schema.table("price").unwrap();
        assert_eq!(column_names(price), vec!["@currency", "#text"]);
        assert_eq!(
            price.column("#text").unwrap().sql_type,
            Some(SqlType::DoublePrecision)
        );
        assert_eq!(price.parents(), &["item".to_string()]);
        assert_eq!(column_names(schema.table("item").unwrap()), vec!["name"]);
    }

    #[test]
    fn test_order_schema() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_document(&json_doc(json!({
                "order": {
                    "id": "7",
                    "total": "19.99",
                    "items": [{"sku": "X1"}, {"sku": "X2"}]
                }
            })))
            .unwrap();
        let schema = builder.build().unwrap();

        let order = schema.table("order").unwrap();
        assert_eq!(column_names(order), vec!["id", "total"]);
        assert_eq!(order.column("id").unwrap().sql_type, Some(SqlType::Integer));
        assert_eq!(
            order.column("total").unwrap().sql_type,
            Some(SqlType::DoublePrecision)
        );

        let items = schema.table("items").unwrap();
        assert_eq!(column_names(items), vec!["sku"]);
        assert_eq!(items.parents(), &["order".to_string()]);
    }

    #[test]
    fn test_types_widen_across_documents() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_document(&json_doc(json!({"m": {"v": "1", "w": "x", "n": null}})))
            .unwrap();
        builder
            .add_document(&json_doc(json!({"m": {"v": "2.5", "w": "3"}})))
            .unwrap();
        let schema = builder.build().unwrap();

        let m = schema.table("m").unwrap();
        assert_eq!(m.column("v").unwrap().sql_type, Some(SqlType::DoublePrecision));
        assert_eq!(m.column("w").unwrap().sql_type, Some(SqlType::Text));
        assert_eq!(m.column("n").unwrap().sql_type, None);
    }

    #[test]
    fn test_multiple_parents() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_document(&json_doc(json!({
                "order": {"items": [{"sku": "A"}]},
                "cart": {"items": [{"sku": "B"}]}
            })))
            .unwrap();
        let schema = builder.build().unwrap();

        let items = schema.table("items").unwrap();
        assert_eq!(items.parents(), &["order".to_string(), "cart".to_string()]);
        assert_eq!(schema.load_order().last().unwrap(), "items");
    }

    #[test]
    fn test_empty_container_list_registers_table() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_document(&json_doc(json!({"a": {"b": [[]]}})))
            .unwrap();
        let schema = builder.build().unwrap();
        assert_eq!(schema.table("b").unwrap().parents(), &["a".to_string()]);
    }

    #[test]
    fn test_discovery_is_idempotent() {
        let docs = vec![
            json_doc(json!({"a": {"x": "1", "b": {"y": "t"}}})),
            json_doc(json!({"a": {"z": "2.0", "c": [{"k": "v"}]}})),
        ];

        let mut first = SchemaBuilder::new();
        first.add_documents(&docs).unwrap();
        let mut second = SchemaBuilder::new();
        second.add_documents(&docs).unwrap();

        assert_eq!(first.build().unwrap(), second.build().unwrap());
    }

    #[test]
    fn test_document_order_keeps_sets() {
        let d1 = json_doc(json!({"a": {"x": "1", "b": {"y": "t"}}}));
        let d2 = json_doc(json!({"a": {"z": "2", "c": {"k": "v"}}}));

        let mut forward = SchemaBuilder::new();
        forward.add_documents([&d1, &d2]).unwrap();
        let mut backward = SchemaBuilder::new();
        backward.add_documents([&d2, &d1]).unwrap();

        let forward = forward.build().unwrap();
        let backward = backward.build().unwrap();
        for table in forward.tables() {
            let other = backward.table(table.name()).unwrap();
            let mut a = column_names(table);
            let mut b = column_names(other);
            a.sort();
            b.sort();
            assert_eq!(a, b);
            assert_eq!(table.parents(), other.parents());
        }
        assert_eq!(forward.len(), backward.len());
    }

    #[test]
    fn test_top_level_scalar_rejected() {
        let doc = Document {
            source: "t.json".into(),
            roots: vec![crate::document::Field::new(
                "title",
                FieldValue::Scalar("x".to_string()),
            )],
        };
        let mut builder = SchemaBuilder::new();
        assert!(matches!(
            builder.add_document(&doc),
            Err(MeltError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_self_nesting_reports_cycle() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_document(&xml_doc(
                "<doc><section><title>A</title><section><title>B</title></section></section></doc>",
            ))
            .unwrap();
        assert!(matches!(
            builder.build(),
            Err(MeltError::ReferenceCycle { .. })
        ));
    }

    #[test]
    fn test_path_like_table_names_rejected() {
        for doc in [
            json_doc(json!({"../escaped": {"v": "1"}})),
            json_doc(json!({"/abs": {"v": "1"}})),
            json_doc(json!({"ok": {"nested/child": {"v": "1"}}})),
            json_doc(json!({"ok": {"list": [{"..": {"v": "1"}}]}})),
        ] {
            let mut builder = SchemaBuilder::new();
            assert!(matches!(
                builder.add_document(&doc),
                Err(MeltError::MalformedDocument(_))
            ));
        }
    }

    #[test]
    fn test_path_like_column_names_allowed() {
        let mut builder = SchemaBuilder::new();
        builder
            .add_document(&json_doc(json!({"p": {"a/b": "1", "..": "2"}})))
            .unwrap();
        let schema = builder.build().unwrap();
        assert_eq!(column_names(schema.table("p").unwrap()), vec!["a/b", ".."]);
    }
}
