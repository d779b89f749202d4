//! Document operations: declarative instructions that transform a block tree.
//!
//! Wire form is a map tagged by `type`.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use crate::block::{AttrValue, Block};
use crate::canonical::{entry, text, MapView};
use crate::error::{CoreError, Result};

/// The parent id of top-level blocks.
pub const ROOT_PARENT: &str = "";

/// A single attribute assignment addressed by a key path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeEntry {
    pub key: Vec<String>,
    pub value: AttrValue,
}

impl AttributeEntry {
    /// Build an entry from a key path.
    pub fn new<K: Into<String>>(key: impl IntoIterator<Item = K>, value: impl Into<AttrValue>) -> Self {
        Self {
            key: key.into_iter().map(Into::into).collect(),
            value: value.into(),
        }
    }

    /// The key path joined with `.`.
    pub fn joined_key(&self) -> String {
        self.key.join(".")
    }

    fn to_value(&self) -> Value {
        Value::Map(vec![
            entry("key", Value::Array(self.key.iter().map(|k| text(k)).collect())),
            entry("value", self.value.to_value()),
        ])
    }

    fn from_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, "attribute")?;
        let key = map
            .array("key")?
            .iter()
            .map(|k| match k {
                Value::Text(s) => Ok(s.clone()),
                _ => Err(CoreError::MalformedBlob(
                    "attribute key segments must be text".to_string(),
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        let value = map
            .get("value")
            .ok_or_else(|| CoreError::MalformedBlob("attribute: field \"value\" is missing".into()))?;
        reject_unknown(&map, "attribute", &["key", "value"])?;
        Ok(Self {
            key,
            value: AttrValue::from_value(value)?,
        })
    }
}

/// An operation on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DocumentOperation {
    /// Set document-level attributes.
    SetAttributes { attrs: Vec<AttributeEntry> },
    /// Insert a block or replace its content.
    ReplaceBlock { block: Block },
    /// Place blocks, in order, under a parent.
    MoveBlocks { blocks: Vec<String>, parent: String },
    /// Remove blocks and their subtrees.
    DeleteBlocks { blocks: Vec<String> },
}

impl DocumentOperation {
    /// The wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentOperation::SetAttributes { .. } => "SetAttributes",
            DocumentOperation::ReplaceBlock { .. } => "ReplaceBlock",
            DocumentOperation::MoveBlocks { .. } => "MoveBlocks",
            DocumentOperation::DeleteBlocks { .. } => "DeleteBlocks",
        }
    }

    /// Wire form.
    pub fn to_value(&self) -> Result<Value> {
        let ids = |ids: &[String]| Value::Array(ids.iter().map(|id| text(id)).collect());
        let mut entries = vec![entry("type", text(self.kind()))];
        match self {
            DocumentOperation::SetAttributes { attrs } => {
                let attrs = attrs.iter().map(AttributeEntry::to_value).collect();
                entries.push(entry("attrs", Value::Array(attrs)));
            }
            DocumentOperation::ReplaceBlock { block } => {
                entries.push(entry("block", block.to_value()?));
            }
            DocumentOperation::MoveBlocks { blocks, parent } => {
                entries.push(entry("blocks", ids(blocks)));
                entries.push(entry("parent", text(parent)));
            }
            DocumentOperation::DeleteBlocks { blocks } => {
                entries.push(entry("blocks", ids(blocks)));
            }
        }
        Ok(Value::Map(entries))
    }

    /// Parse the wire form.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, "operation")?;
        let ids = |key: &str| -> Result<Vec<String>> {
            map.array(key)?
                .iter()
                .map(|v| match v {
                    Value::Text(s) => Ok(s.clone()),
                    _ => Err(CoreError::MalformedBlob(format!(
                        "operation {key:?} must hold block ids"
                    ))),
                })
                .collect()
        };
        let (op, known) = match map.text("type")? {
            "SetAttributes" => (
                DocumentOperation::SetAttributes {
                    attrs: map
                        .array("attrs")?
                        .iter()
                        .map(AttributeEntry::from_value)
                        .collect::<Result<_>>()?,
                },
                &["type", "attrs"][..],
            ),
            "ReplaceBlock" => {
                let block = map.get("block").ok_or_else(|| {
                    CoreError::MalformedBlob("operation: field \"block\" is missing".into())
                })?;
                (
                    DocumentOperation::ReplaceBlock {
                        block: Block::from_value(block)?,
                    },
                    &["type", "block"][..],
                )
            }
            "MoveBlocks" => (
                DocumentOperation::MoveBlocks {
                    blocks: ids("blocks")?,
                    parent: map.opt_text("parent")?.unwrap_or(ROOT_PARENT).to_string(),
                },
                &["type", "blocks", "parent"][..],
            ),
            "DeleteBlocks" => (
                DocumentOperation::DeleteBlocks {
                    blocks: ids("blocks")?,
                },
                &["type", "blocks"][..],
            ),
            other => {
                return Err(CoreError::MalformedBlob(format!(
                    "unknown operation type {other:?}"
                )))
            }
        };
        reject_unknown(&map, op.kind(), known)?;
        Ok(op)
    }
}

fn reject_unknown(map: &MapView<'_>, context: &str, known: &[&str]) -> Result<()> {
    match map.remaining(known).first() {
        Some((key, _)) => Err(CoreError::MalformedBlob(format!(
            "{context}: unexpected field {key:?}"
        ))),
        None => Ok(()),
    }
}

/// Well-known document metadata. Unset fields produce no attribute entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub icon: Option<String>,
    pub thumbnail: Option<String>,
    pub cover: Option<String>,
    pub site_url: Option<String>,
    pub layout: Option<String>,
    pub display_publish_time: Option<String>,
    pub content_width: Option<String>,
    pub header_layout: Option<String>,
    pub show_outline: Option<bool>,
    pub show_activity: Option<bool>,
}

impl DocumentMetadata {
    /// Metadata with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Attribute entries for every set field.
    pub fn entries(&self) -> Vec<AttributeEntry> {
        let strings = [
            ("name", &self.name),
            ("summary", &self.summary),
            ("icon", &self.icon),
            ("thumbnail", &self.thumbnail),
            ("cover", &self.cover),
            ("siteUrl", &self.site_url),
            ("layout", &self.layout),
            ("displayPublishTime", &self.display_publish_time),
        ];
        let mut out: Vec<_> = strings
            .into_iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| AttributeEntry::new([k], v.as_str())))
            .collect();
        if let Some(show) = self.show_outline {
            out.push(AttributeEntry::new(["showOutline"], show));
        }
        if let Some(layout) = &self.header_layout {
            out.push(AttributeEntry::new(["theme", "headerLayout"], layout.as_str()));
        }
        if let Some(width) = &self.content_width {
            out.push(AttributeEntry::new(["contentWidth"], width.as_str()));
        }
        if let Some(show) = self.show_activity {
            out.push(AttributeEntry::new(["showActivity"], show));
        }
        out
    }

    /// A `SetAttributes` operation, or `None` when nothing is set.
    pub fn to_operation(&self) -> Option<DocumentOperation> {
        let attrs = self.entries();
        (!attrs.is_empty()).then_some(DocumentOperation::SetAttributes { attrs })
    }
}
