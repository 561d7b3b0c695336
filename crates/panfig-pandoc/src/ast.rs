//! Typed views of the pandoc nodes panfig reads and writes.
//!
//! Pandoc encodes every node as `{"t": <tag>, "c": <contents>}`. Attributes
//! are the triple `[identifier, [classes], [[key, value], ...]]`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::PandocError;

/// Wire form of [`Attr`].
type AttrRepr = (String, Vec<String>, Vec<(String, String)>);

/// Node attributes: `{#identifier .class key="value"}`.
///
/// Attribute pairs keep their document order. Pandoc never produces duplicate
/// keys, so lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AttrRepr", into = "AttrRepr")]
pub struct Attr {
    /// Element identifier (empty when absent).
    pub identifier: String,
    /// Classes in document order.
    pub classes: Vec<String>,
    /// Key-value attributes in document order.
    pub attributes: Vec<(String, String)>,
}

impl From<AttrRepr> for Attr {
    fn from((identifier, classes, attributes): AttrRepr) -> Self {
        Self {
            identifier,
            classes,
            attributes,
        }
    }
}

impl From<Attr> for AttrRepr {
    fn from(attr: Attr) -> Self {
        (attr.identifier, attr.classes, attr.attributes)
    }
}

impl Attr {
    /// Check whether `class` is among the node's classes.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Get an attribute value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A fenced code block: attributes plus its literal text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBlock {
    /// Attributes from the fence info string.
    pub attr: Attr,
    /// Literal text between the fences.
    pub text: String,
}

impl CodeBlock {
    /// Decode the contents (`"c"`) of a `CodeBlock` node.
    pub(crate) fn from_contents(contents: &Value) -> Result<Self, PandocError> {
        let (attr, text): (Attr, String) = Deserialize::deserialize(contents)
            .map_err(|e| PandocError::Malformed(format!("CodeBlock: {e}")))?;
        Ok(Self { attr, text })
    }

    pub(crate) fn to_node(&self) -> Value {
        json!({ "t": "CodeBlock", "c": [self.attr, self.text] })
    }
}

/// What to put in place of a visited code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// Leave the node as it is.
    PassThrough,
    /// Drop the node from the document.
    Remove,
    /// Replace the node with a paragraph holding a single image.
    ///
    /// `alt_text` is rendered as inline code inside the image description, so
    /// non-image output formats still show something meaningful.
    Figure {
        /// Attributes carried by the image.
        attr: Attr,
        /// Textual fallback for formats that cannot show the image.
        alt_text: String,
        /// Image location.
        path: String,
    },
    /// Replace the node with a plain code block containing `body`.
    Text(String),
}

impl Replacement {
    /// Encode the replacement as the list of nodes to splice in.
    ///
    /// Returns `None` for [`Replacement::PassThrough`].
    pub(crate) fn into_nodes(self) -> Option<Vec<Value>> {
        match self {
            Self::PassThrough => None,
            Self::Remove => Some(Vec::new()),
            Self::Figure {
                attr,
                alt_text,
                path,
            } => {
                let alt = json!({ "t": "Code", "c": [Attr::default(), alt_text] });
                let image = json!({ "t": "Image", "c": [attr, [alt], [path, ""]] });
                Some(vec![json!({ "t": "Para", "c": [image] })])
            }
            Self::Text(body) => Some(vec![
                CodeBlock {
                    attr: Attr::default(),
                    text: body,
                }
                .to_node(),
            ]),
        }
    }
}
