//! JSON documents
//!
//! Objects become containers, strings and numbers become scalars, arrays
//! of scalars collapse into a text list (nulls left out) and arrays of
//! objects become a list of containers. Booleans, and arrays mixing
//! scalars with objects, have no mapping and abort the run.

use super::{Document, Field, FieldValue, Node};
use crate::error::{MeltError, Result};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Parse one JSON document with SIMD-accelerated parsing
pub fn parse_document(source: &Path, mut bytes: Vec<u8>) -> Result<Document> {
    let value: Value = simd_json::serde::from_slice(&mut bytes).map_err(|e| MeltError::Json {
        path: source.to_path_buf(),
        message: e.to_string(),
    })?;

    to_document(source, value)
}

/// Normalize an already parsed JSON value
pub fn to_document(source: &Path, value: Value) -> Result<Document> {
    let mut roots = Vec::new();
    collect_roots(value, &mut roots)?;

    Ok(Document {
        source: source.to_path_buf(),
        roots,
    })
}

fn collect_roots(value: Value, roots: &mut Vec<Field>) -> Result<()> {
    match value {
        Value::Object(obj) => {
            roots.extend(convert_object(obj)?.fields);
        }
        Value::Array(arr) => {
            // Top-level arrays are streams of documents
            for item in arr {
                collect_roots(item, roots)?;
            }
        }
        Value::Bool(b) => {
            return Err(MeltError::UnsupportedValue {
                field: "<root>".to_string(),
                found: format!("boolean {}", b),
            });
        }
        other => {
            return Err(MeltError::MalformedDocument(format!(
                "top-level value {} has no enclosing table",
                other
            )));
        }
    }
    Ok(())
}

fn convert_object(obj: Map<String, Value>) -> Result<Node> {
    let mut fields = Vec::with_capacity(obj.len());
    for (key, value) in obj {
        let value = convert_value(&key, value)?;
        fields.push(Field::new(key, value));
    }
    Ok(Node::new(fields))
}

fn convert_value(field: &str, value: Value) -> Result<FieldValue> {
    match value {
        Value::Null => Ok(FieldValue::Null),
        Value::String(s) => Ok(FieldValue::Scalar(s)),
        Value::Number(n) => Ok(FieldValue::Scalar(n.to_string())),
        Value::Bool(b) => Err(unsupported(field, b)),
        Value::Object(obj) => Ok(FieldValue::Container(convert_object(obj)?)),
        Value::Array(arr) => {
            if arr.iter().all(is_text_item) {
                let items = arr
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .collect();
                return Ok(FieldValue::TextList(items));
            }

            let mut nodes = Vec::new();
            collect_nodes(field, arr, &mut nodes)?;
            Ok(FieldValue::ContainerList(nodes))
        }
    }
}

fn collect_nodes(field: &str, arr: Vec<Value>, nodes: &mut Vec<Node>) -> Result<()> {
    for item in arr {
        match item {
            Value::Object(obj) => nodes.push(convert_object(obj)?),
            Value::Array(inner) => collect_nodes(field, inner, nodes)?,
            Value::Bool(b) => return Err(unsupported(field, b)),
            Value::Null => debug!(field, "Skipping null inside an array of objects"),
            other => {
                return Err(MeltError::MalformedDocument(format!(
                    "array '{}' mixes the scalar {} with objects",
                    field, other
                )));
            }
        }
    }
    Ok(())
}

fn is_text_item(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Null)
}

fn unsupported(field: &str, b: bool) -> MeltError {
    MeltError::UnsupportedValue {
        field: field.to_string(),
        found: format!("boolean {}", b),
    }
}
