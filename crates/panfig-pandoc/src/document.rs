//! Pandoc document and block walker.

use std::io::{Read, Write};
use std::str::FromStr;

use serde_json::Value;

use crate::{CodeBlock, PandocError, Replacement};

/// Tag of the only node kind offered to filter callbacks.
const CODE_BLOCK_TAG: &str = "CodeBlock";

/// A pandoc JSON document (`pandoc -t json`).
///
/// The document is kept as raw JSON so that node kinds panfig does not know
/// about survive the round trip unchanged.
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
}

impl FromStr for Document {
    type Err = PandocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_value(serde_json::from_str(s)?)
    }
}

impl Document {
    /// Wrap an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns `PandocError::Malformed` unless the value is an object with a
    /// `blocks` array.
    pub fn from_value(root: Value) -> Result<Self, PandocError> {
        match root.get("blocks") {
            Some(Value::Array(_)) => Ok(Self { root }),
            Some(_) => Err(PandocError::Malformed("`blocks` is not an array".to_owned())),
            None => Err(PandocError::Malformed(
                "missing `blocks` (pandoc 1.18 or newer is required)".to_owned(),
            )),
        }
    }

    /// Read a document from a reader (typically stdin).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PandocError> {
        Self::from_value(serde_json::from_reader(reader)?)
    }

    /// Write the document as compact JSON.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), PandocError> {
        serde_json::to_writer(&mut writer, &self.root)?;
        writer.flush()?;
        Ok(())
    }

    /// Serialize the document as a compact JSON string.
    pub fn to_json(&self) -> Result<String, PandocError> {
        Ok(serde_json::to_string(&self.root)?)
    }

    /// Pandoc API version the document was produced with, e.g. `[1, 23, 1]`.
    #[must_use]
    pub fn api_version(&self) -> Option<Vec<u64>> {
        self.root
            .get("pandoc-api-version")?
            .as_array()?
            .iter()
            .map(Value::as_u64)
            .collect()
    }

    /// Offer every code block to `filter`, in document order, and splice the
    /// returned [`Replacement`] in its place.
    ///
    /// Metadata is walked before the body, matching pandoc's own traversal.
    /// Replacement nodes are not walked again. Returns the number of code
    /// blocks visited.
    ///
    /// # Errors
    ///
    /// Returns `PandocError::Malformed` if a `CodeBlock` node has contents of
    /// the wrong shape. Blocks visited before the bad node keep their
    /// replacements.
    pub fn filter_code_blocks<F>(&mut self, mut filter: F) -> Result<usize, PandocError>
    where
        F: FnMut(&CodeBlock) -> Replacement,
    {
        let mut visited = 0;
        if let Some(meta) = self.root.get_mut("meta") {
            walk(meta, &mut filter, &mut visited)?;
        }
        if let Some(blocks) = self.root.get_mut("blocks") {
            walk(blocks, &mut filter, &mut visited)?;
        }
        tracing::debug!(visited, "walked pandoc document");
        Ok(visited)
    }
}

/// Depth-first walk over a JSON subtree.
///
/// Arrays are where node lists live, so splicing happens there; objects are
/// only descended into.
fn walk<F>(value: &mut Value, filter: &mut F, visited: &mut usize) -> Result<(), PandocError>
where
    F: FnMut(&CodeBlock) -> Replacement,
{
    match value {
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for mut item in items.drain(..) {
                if is_code_block(&item) {
                    let block = CodeBlock::from_contents(&item["c"])?;
                    *visited += 1;
                    match filter(&block).into_nodes() {
                        Some(nodes) => out.extend(nodes),
                        None => out.push(item),
                    }
                } else {
                    walk(&mut item, filter, visited)?;
                    out.push(item);
                }
            }
            *items = out;
        }
        Value::Object(map) => {
            for child in map.values_mut() {
                walk(child, filter, visited)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn is_code_block(value: &Value) -> bool {
    value.get("t").and_then(Value::as_str) == Some(CODE_BLOCK_TAG)
}
