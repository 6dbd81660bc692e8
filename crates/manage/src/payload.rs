//! Resource payload inspection
//!
//! Payloads are sent as-is; they are only read to find the resource id and
//! a few routing fields (an app server's group, a privilege's kind).

use crate::error::{Error, Result};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Json,
    Xml,
}

impl PayloadFormat {
    pub fn detect(payload: &str) -> Result<Self> {
        match payload.trim_start().chars().next() {
            Some('{' | '[') => Ok(Self::Json),
            Some('<') => Ok(Self::Xml),
            Some(_) => Err(Error::InvalidPayload(
                "expected a JSON object or array, or an XML document".into(),
            )),
            None => Err(Error::InvalidPayload("empty payload".into())),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }
}

/// Split a payload into one payload per resource
///
/// A JSON array yields its elements re-serialized; anything else is a single
/// resource and is returned verbatim.
pub fn split(payload: &str) -> Result<Vec<String>> {
    if PayloadFormat::detect(payload)? == PayloadFormat::Json && payload.trim_start().starts_with('[') {
        let Value::Array(items) = serde_json::from_str::<Value>(payload)? else {
            return Err(Error::InvalidPayload("expected a JSON array".into()));
        };
        return items
            .iter()
            .map(|item| serde_json::to_string(item).map_err(Error::from))
            .collect();
    }
    Ok(vec![payload.to_string()])
}

/// Value of a top-level field, if present
pub fn field(payload: &str, name: &str) -> Result<Option<String>> {
    match PayloadFormat::detect(payload)? {
        PayloadFormat::Json => {
            let value: Value = serde_json::from_str(payload)?;
            Ok(match value.get(name) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                Some(Value::Bool(b)) => Some(b.to_string()),
                _ => None,
            })
        }
        PayloadFormat::Xml => xml_element_text(payload, name),
    }
}

/// The resource id, read from `id_field`
pub fn resource_id(payload: &str, id_field: &str) -> Result<String> {
    field(payload, id_field)?
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::InvalidPayload(format!("payload has no '{id_field}'")))
}

/// Text of the first element named `name`, ignoring its namespace
///
/// Entities and CDATA sections are decoded.
fn xml_element_text(xml: &str, name: &str) -> Result<Option<String>> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| Error::InvalidPayload(format!("malformed XML: {e}")))?;
    Ok(doc
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == name)
        .map(|node| {
            node.children()
                .filter(|child| child.is_text())
                .filter_map(|child| child.text())
                .collect::<String>()
                .trim()
                .to_string()
        }))
}
