//! Blocks: the structural unit of document content.
//!
//! A block carries a fixed set of fields plus free-form attributes. On the
//! wire the attributes are inlined next to the fixed keys, so an attribute
//! may not reuse a fixed key name.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::block_id::BlockIdGenerator;
use crate::canonical::{entry, text, uint, MapView};
use crate::error::{CoreError, Result};

/// Attribute naming the list style of a block's children.
pub const CHILDREN_TYPE: &str = "childrenType";

/// Attribute naming the language of a code block.
pub const LANGUAGE: &str = "language";

/// Nesting limit when converting block trees to and from wire values.
pub const MAX_NESTING: usize = 256;

const BLOCK_KEYS: [&str; 6] = ["id", "type", "text", "link", "annotations", "children"];
const ANNOTATION_KEYS: [&str; 4] = ["type", "starts", "ends", "link"];

/// A primitive attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    /// The text payload, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn to_value(&self) -> Value {
        match self {
            AttrValue::Null => Value::Null,
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Int(i) => Value::Integer((*i).into()),
            AttrValue::Float(f) => Value::Float(*f),
            AttrValue::Text(s) => text(s),
        }
    }

    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(AttrValue::Null),
            Value::Bool(b) => Ok(AttrValue::Bool(*b)),
            Value::Integer(i) => {
                let n: i128 = (*i).into();
                i64::try_from(n)
                    .map(AttrValue::Int)
                    .map_err(|_| CoreError::MalformedBlob(format!("attribute integer {n} out of range")))
            }
            Value::Float(f) => Ok(AttrValue::Float(*f)),
            Value::Text(s) => Ok(AttrValue::Text(s.clone())),
            _ => Err(CoreError::MalformedBlob(
                "attribute values must be primitive".to_string(),
            )),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        AttrValue::Float(f)
    }
}

/// Free-form attributes, ordered by key.
pub type Attributes = BTreeMap<String, AttrValue>;

/// A formatting span over block text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(rename = "type")]
    pub annotation_type: String,
    #[serde(default)]
    pub starts: Vec<u32>,
    #[serde(default)]
    pub ends: Vec<u32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Annotation {
    /// A single span `[start, end)`.
    pub fn span(annotation_type: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            annotation_type: annotation_type.into(),
            starts: vec![start],
            ends: vec![end],
            ..Default::default()
        }
    }

    /// Set the link target.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    pub(crate) fn to_value(&self) -> Result<Value> {
        let offsets = |v: &[u32]| Value::Array(v.iter().map(|n| uint(u64::from(*n))).collect());
        let mut entries = vec![
            entry("type", text(&self.annotation_type)),
            entry("starts", offsets(&self.starts)),
            entry("ends", offsets(&self.ends)),
        ];
        if !self.link.is_empty() {
            entries.push(entry("link", text(&self.link)));
        }
        inline_attributes(&mut entries, &self.attributes, &ANNOTATION_KEYS)?;
        Ok(Value::Map(entries))
    }

    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, "annotation")?;
        let offsets = |key: &str| -> Result<Vec<u32>> {
            map.opt_array(key)?
                .iter()
                .map(|v| match v {
                    Value::Integer(i) => u32::try_from(i128::from(*i)).map_err(|_| {
                        CoreError::MalformedBlob(format!("annotation offset out of range in {key:?}"))
                    }),
                    _ => Err(CoreError::MalformedBlob(format!(
                        "annotation {key:?} must hold integers"
                    ))),
                })
                .collect()
        };
        Ok(Self {
            annotation_type: map.text("type")?.to_string(),
            starts: offsets("starts")?,
            ends: offsets("ends")?,
            link: map.opt_text("link")?.unwrap_or_default().to_string(),
            attributes: collect_attributes(&map, &ANNOTATION_KEYS)?,
        })
    }
}

/// A single block of document content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

impl Block {
    /// An empty block of the given type.
    pub fn new(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            ..Default::default()
        }
    }

    /// An empty block whose id is minted by `ids`.
    pub fn generated(ids: &mut impl BlockIdGenerator, block_type: impl Into<String>) -> Self {
        Self::new(ids.next_id(), block_type)
    }

    /// Shorthand for a paragraph with text.
    pub fn paragraph(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, "Paragraph").with_text(text)
    }

    /// Set the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the link target.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    /// Add an annotation.
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Set an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute.
    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Wire form: fixed keys plus inlined attributes.
    pub fn to_value(&self) -> Result<Value> {
        let mut entries = self.fixed_entries()?;
        inline_attributes(&mut entries, &self.attributes, &BLOCK_KEYS)?;
        Ok(Value::Map(entries))
    }

    /// Parse the wire form.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, "block")?;
        Self::from_map(&map)
    }

    fn fixed_entries(&self) -> Result<Vec<(Value, Value)>> {
        let annotations = self
            .annotations
            .iter()
            .map(Annotation::to_value)
            .collect::<Result<Vec<_>>>()?;
        let mut entries = vec![
            entry("id", text(&self.id)),
            entry("type", text(&self.block_type)),
            entry("text", text(&self.text)),
            entry("annotations", Value::Array(annotations)),
        ];
        if !self.link.is_empty() {
            entries.push(entry("link", text(&self.link)));
        }
        Ok(entries)
    }

    fn from_map(map: &MapView<'_>) -> Result<Self> {
        Ok(Self {
            id: map.text("id")?.to_string(),
            block_type: map.text("type")?.to_string(),
            text: map.opt_text("text")?.unwrap_or_default().to_string(),
            link: map.opt_text("link")?.unwrap_or_default().to_string(),
            annotations: map
                .opt_array("annotations")?
                .iter()
                .map(Annotation::from_value)
                .collect::<Result<_>>()?,
            attributes: collect_attributes(map, &BLOCK_KEYS)?,
        })
    }
}

/// A block with its children.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockNode {
    pub block: Block,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockNode>,
}

impl BlockNode {
    /// A leaf node.
    pub fn new(block: Block) -> Self {
        Self {
            block,
            children: Vec::new(),
        }
    }

    /// Replace the children.
    pub fn with_children(mut self, children: Vec<BlockNode>) -> Self {
        self.children = children;
        self
    }

    /// Pre-order walk over this node and every descendant.
    pub fn iter(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }

    /// Wire form: the block's map with a nested `children` array when non-empty.
    pub fn to_value(&self) -> Result<Value> {
        self.to_value_at(0)
    }

    /// Parse the wire form.
    pub fn from_value(value: &Value) -> Result<Self> {
        Self::from_value_at(value, 0)
    }

    fn to_value_at(&self, depth: usize) -> Result<Value> {
        if depth >= MAX_NESTING {
            return Err(CoreError::EncodingError(format!(
                "block tree nested deeper than {MAX_NESTING}"
            )));
        }
        let mut entries = self.block.fixed_entries()?;
        if !self.children.is_empty() {
            let children = self
                .children
                .iter()
                .map(|c| c.to_value_at(depth + 1))
                .collect::<Result<Vec<_>>>()?;
            entries.push(entry("children", Value::Array(children)));
        }
        inline_attributes(&mut entries, &self.block.attributes, &BLOCK_KEYS)?;
        Ok(Value::Map(entries))
    }

    fn from_value_at(value: &Value, depth: usize) -> Result<Self> {
        if depth >= MAX_NESTING {
            return Err(CoreError::MalformedBlob(format!(
                "block tree nested deeper than {MAX_NESTING}"
            )));
        }
        let map = MapView::new(value, "block")?;
        let children = map
            .opt_array("children")?
            .iter()
            .map(|c| Self::from_value_at(c, depth + 1))
            .collect::<Result<_>>()?;
        Ok(Self {
            block: Block::from_map(&map)?,
            children,
        })
    }
}

/// Iterator returned by [`BlockNode::iter`].
pub struct Preorder<'a> {
    stack: Vec<&'a BlockNode>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a BlockNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

fn inline_attributes(
    entries: &mut Vec<(Value, Value)>,
    attributes: &Attributes,
    reserved: &[&str],
) -> Result<()> {
    for (key, value) in attributes {
        if reserved.contains(&key.as_str()) {
            return Err(CoreError::EncodingError(format!(
                "attribute {key:?} collides with a reserved field"
            )));
        }
        entries.push(entry(key, value.to_value()));
    }
    Ok(())
}

fn collect_attributes(map: &MapView<'_>, reserved: &[&str]) -> Result<Attributes> {
    map.remaining(reserved)
        .into_iter()
        .map(|(k, v)| Ok((k.to_string(), AttrValue::from_value(v)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{decode_value, encode_canonical};

    fn sample() -> Block {
        Block::paragraph("b1", "hello world")
            .with_annotation(Annotation::span("Bold", 0, 5))
            .with_annotation(Annotation::span("Link", 6, 11).with_link("hm://abc"))
            .with_attribute(CHILDREN_TYPE, "Ordered")
    }

    #[test]
    fn test_generated_ids_come_from_generator() {
        use crate::block_id::{SeededIdGenerator, BLOCK_ID_LEN};

        let mut ids = SeededIdGenerator::from_label("doc");
        let a = Block::generated(&mut ids, "Paragraph");
        let b = Block::generated(&mut ids, "Heading");
        assert_eq!(a.id.len(), BLOCK_ID_LEN);
        assert_ne!(a.id, b.id);
        assert_eq!(b.block_type, "Heading");

        let mut again = SeededIdGenerator::from_label("doc");
        assert_eq!(Block::generated(&mut again, "Paragraph"), a);
    }

    #[test]
    fn test_attributes_are_inlined() {
        let value = sample().to_value().unwrap();
        let map = MapView::new(&value, "test").unwrap();
        assert_eq!(map.text(CHILDREN_TYPE).unwrap(), "Ordered");
        assert!(map.get("attributes").is_none());
        assert!(map.get("link").is_none());
    }

    #[test]
    fn test_block_wire_roundtrip() {
        let block = sample()
            .with_attribute("width", 640i64)
            .with_attribute("ratio", 0.5f64)
            .with_attribute("hidden", false);
        let bytes = encode_canonical(&block.to_value().unwrap()).unwrap();
        let decoded = Block::from_value(&decode_value(&bytes).unwrap()).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_reserved_attribute_rejected() {
        let block = Block::paragraph("b1", "x").with_attribute("text", "clash");
        assert!(matches!(
            block.to_value(),
            Err(CoreError::EncodingError(_))
        ));
    }

    #[test]
    fn test_node_children_nested() {
        let tree = BlockNode::new(Block::new("h", "Heading").with_text("Title")).with_children(vec![
            BlockNode::new(Block::paragraph("p1", "one")),
            BlockNode::new(Block::paragraph("p2", "two")),
        ]);
        let value = tree.to_value().unwrap();
        assert_eq!(BlockNode::from_value(&value).unwrap(), tree);

        let ids: Vec<_> = tree.iter().map(|n| n.block.id.as_str()).collect();
        assert_eq!(ids, vec!["h", "p1", "p2"]);
    }

    #[test]
    fn test_nesting_limit() {
        let mut node = BlockNode::new(Block::paragraph("leaf", ""));
        for i in 0..MAX_NESTING {
            node = BlockNode::new(Block::paragraph(format!("n{i}"), "")).with_children(vec![node]);
        }
        assert!(node.to_value().is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(Block::paragraph("b1", "hi")).unwrap();
        assert_eq!(json["type"], "Paragraph");
        assert!(json.get("link").is_none());
    }
}
