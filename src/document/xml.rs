//! XML documents
//!
//! Every element carrying attributes or child elements is a container.
//! Attributes become `@name` scalars, an attribute-bearing leaf keeps its
//! text as a `#text` scalar, and attribute-free leaves are scalars of the
//! enclosing element. Attribute-free leaves repeated under one parent are
//! folded into a single text list.

use super::{Document, Field, FieldValue, Node};
use crate::error::{MeltError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Column name holding the text of an attribute-bearing leaf
pub const TEXT_FIELD: &str = "#text";

/// Raw element tree as read from the document
#[derive(Debug, Default)]
struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: Option<String>,
}

impl Element {
    fn is_plain_leaf(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }

    fn push_text(&mut self, s: &str) {
        self.text.get_or_insert_with(String::new).push_str(s);
    }
}

/// Parse one XML document
pub fn parse_document(source: &Path, bytes: &[u8]) -> Result<Document> {
    let root = read_tree(source, bytes)?;

    if root.children.is_empty() {
        return Err(MeltError::MalformedDocument(format!(
            "root element <{}> of {} has no child elements",
            root.tag,
            source.display()
        )));
    }

    let tag = root.tag.clone();
    Ok(Document {
        source: source.to_path_buf(),
        roots: vec![Field::new(tag, FieldValue::Container(to_node(root)))],
    })
}

fn read_tree(source: &Path, bytes: &[u8]) -> Result<Element> {
    let xml_error = |message: String| MeltError::Xml {
        path: source.to_path_buf(),
        message,
    };

    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(start_element(e).map_err(&xml_error)?);
            }
            Ok(Event::Empty(ref e)) => {
                let element = start_element(e).map_err(&xml_error)?;
                attach(element, &mut stack, &mut root).map_err(&xml_error)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| xml_error("unexpected closing tag".to_string()))?;
                attach(element, &mut stack, &mut root).map_err(&xml_error)?;
            }
            Ok(Event::Text(ref t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = t.unescape().map_err(|e| xml_error(e.to_string()))?;
                    top.push_text(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(top) = stack.last_mut() {
                    top.push_text(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(xml_error(format!(
                    "at position {}: {}",
                    reader.error_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(xml_error("unexpected end of document".to_string()));
    }

    root.ok_or_else(|| {
        MeltError::MalformedDocument(format!("{} has no root element", source.display()))
    })
}

fn start_element(e: &BytesStart) -> std::result::Result<Element, String> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        // Namespace declarations are not data
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr.unescape_value().map_err(|err| err.to_string())?;
        attributes.push((key, value.to_string()));
    }

    Ok(Element {
        tag,
        attributes,
        ..Element::default()
    })
}

fn attach(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> std::result::Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }

    if root.is_some() {
        return Err(format!("second root element <{}>", element.tag));
    }
    *root = Some(element);
    Ok(())
}

fn to_node(element: Element) -> Node {
    let mut fields: Vec<Field> = element
        .attributes
        .into_iter()
        .map(|(k, v)| Field::new(format!("@{}", k), FieldValue::Scalar(v)))
        .collect();

    if element.children.is_empty() {
        fields.push(Field::new(TEXT_FIELD, text_value(element.text)));
        return Node::new(fields);
    }

    // Attribute-free leaves sharing a tag collapse into one text list
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for child in element.children.iter().filter(|c| c.is_plain_leaf()) {
        *counts.entry(child.tag.as_str()).or_insert(0) += 1;
    }
    let repeated: HashSet<String> = counts
        .into_iter()
        .filter(|(_, n)| *n >= 2)
        .map(|(tag, _)| tag.to_string())
        .collect();

    let mut lists: HashMap<String, Vec<String>> = HashMap::new();
    for child in element.children.iter().filter(|c| c.is_plain_leaf()) {
        if repeated.contains(&child.tag) {
            lists
                .entry(child.tag.clone())
                .or_default()
                .push(child.text.clone().unwrap_or_default());
        }
    }

    for child in element.children {
        if !child.is_plain_leaf() {
            let tag = child.tag.clone();
            fields.push(Field::new(tag, FieldValue::Container(to_node(child))));
        } else if repeated.contains(&child.tag) {
            // Emitted once, at the first occurrence
            if let Some(values) = lists.remove(&child.tag) {
                fields.push(Field::new(child.tag, FieldValue::TextList(values)));
            }
        } else {
            fields.push(Field::new(child.tag, text_value(child.text)));
        }
    }

    Node::new(fields)
}

fn text_value(text: Option<String>) -> FieldValue {
    match text {
        Some(s) => FieldValue::Scalar(s),
        None => FieldValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Document {
        parse_document(Path::new("test.xml"), xml.as_bytes()).unwrap()
    }

    fn container(value: &FieldValue) -> &Node {
        match value {
            FieldValue::Container(node) => node,
            other => panic!("Expected container, got {:?}", other),
        }
    }

    #[test]
    fn test_library() {
        let d = parse(
            r#"<library><book id="1" title="Dune"><author>Herbert</author></book><book id="2" title="Foundation"><author>Asimov</author></book></library>"#,
        );

        assert_eq!(d.roots.len(), 1);
        assert_eq!(d.roots[0].name, "library");
        let library = container(&d.roots[0].value);
        assert_eq!(library.fields.len(), 2);

        let book = container(&library.fields[0].value);
        assert_eq!(
            book.fields,
            vec![
                Field::new("@id", FieldValue::Scalar("1".to_string())),
                Field::new("@title", FieldValue::Scalar("Dune".to_string())),
                Field::new("author", FieldValue::Scalar("Herbert".to_string())),
            ]
        );
    }

    #[test]
    fn test_repeated_leaves_collapse() {
        let d = parse("<tags><tag>a</tag><tag>b</tag></tags>");
        let tags = container(&d.roots[0].value);
        assert_eq!(
            tags.fields,
            vec![Field::new(
                "tag",
                FieldValue::TextList(vec!["a".to_string(), "b".to_string()])
            )]
        );
    }

    #[test]
    fn test_attribute_leaf_keeps_text() {
        let d = parse(r#"<doc><price currency="EUR">12.50</price><empty/></doc>"#);
        let doc = container(&d.roots[0].value);
        let price = container(&doc.fields[0].value);
        assert_eq!(
            price.fields,
            vec![
                Field::new("@currency", FieldValue::Scalar("EUR".to_string())),
                Field::new(TEXT_FIELD, FieldValue::Scalar("12.50".to_string())),
            ]
        );
        assert_eq!(doc.fields[1], Field::new("empty", FieldValue::Null));
    }

    #[test]
    fn test_entities_and_cdata() {
        let d = parse("<a><b>x &amp; y</b><c><![CDATA[<raw>]]></c></a>");
        let a = container(&d.roots[0].value);
        assert_eq!(a.fields[0].value, FieldValue::Scalar("x & y".to_string()));
        assert_eq!(a.fields[1].value, FieldValue::Scalar("<raw>".to_string()));
    }

    #[test]
    fn test_namespace_declarations_skipped() {
        let d = parse(r#"<a xmlns="urn:x" xmlns:dc="urn:dc"><dc:title>T</dc:title></a>"#);
        let a = container(&d.roots[0].value);
        assert_eq!(
            a.fields,
            vec![Field::new("dc:title", FieldValue::Scalar("T".to_string()))]
        );
    }

    #[test]
    fn test_childless_root_is_malformed() {
        let err = parse_document(Path::new("t.xml"), br#"<a id="1">x</a>"#).unwrap_err();
        assert!(matches!(err, MeltError::MalformedDocument(_)));
    }

    #[test]
    fn test_broken_xml() {
        let err = parse_document(Path::new("t.xml"), b"<a><b></a>").unwrap_err();
        assert!(matches!(err, MeltError::Xml { .. }));
    }
}
