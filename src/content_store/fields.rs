//! Field values stored on content entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::AssetId;

/// The named fields of an entry.
pub type Fields = BTreeMap<String, FieldValue>;

/// A single field value.
///
/// Links to other resources keep their structure so callers can tell a plain value
/// apart from a linked resource. Serialized untagged: a link serializes as
/// `{"sys": {"type": "Link", "linkType": "Asset", "id": "..."}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A link to another resource.
    Link(Link),
    /// A boolean flag.
    Bool(bool),
    /// A whole number.
    Integer(i64),
    /// A finite decimal number.
    Number(f64),
    /// Free text.
    Text(String),
}

impl FieldValue {
    /// The text of a [FieldValue::Text], `None` for other variants.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The value of a numeric field as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(number) => Some(*number),
            FieldValue::Integer(integer) => Some(*integer as f64),
            _ => None,
        }
    }

    /// The link of a [FieldValue::Link], `None` for other variants.
    pub fn as_link(&self) -> Option<&Link> {
        match self {
            FieldValue::Link(link) => Some(link),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<Link> for FieldValue {
    fn from(value: Link) -> Self {
        FieldValue::Link(value)
    }
}

/// A reference from an entry to another stored resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// The system metadata identifying the linked resource.
    pub sys: LinkSys,
}

/// The identifying part of a [Link].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSys {
    /// Always [LinkKind::Link].
    #[serde(rename = "type")]
    pub kind: LinkKind,
    /// The kind of resource linked to.
    #[serde(rename = "linkType")]
    pub link_type: LinkType,
    /// The ID of the linked resource.
    pub id: String,
}

/// Marks a JSON object as a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    /// The only kind.
    Link,
}

/// The kinds of resources that can be linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    /// A stored binary.
    Asset,
    /// Another entry.
    Entry,
}

impl Link {
    /// Create a link to an asset.
    pub fn asset(id: &AssetId) -> Self {
        Self {
            sys: LinkSys {
                kind: LinkKind::Link,
                link_type: LinkType::Asset,
                id: id.as_str().to_owned(),
            },
        }
    }

    /// The linked asset's ID, `None` if the link points at something else.
    pub fn asset_id(&self) -> Option<AssetId> {
        match self.sys.link_type {
            LinkType::Asset => Some(AssetId::new(self.sys.id.clone())),
            LinkType::Entry => None,
        }
    }
}
