//! Pandoc JSON AST support for panfig.
//!
//! This crate is the document side of the filter. It knows just enough of the
//! pandoc JSON format to:
//! - decode `CodeBlock` nodes into [`CodeBlock`] values
//! - walk every block list of a [`Document`] in document order
//! - splice a [`Replacement`] back in place of each visited code block
//!
//! Everything else in the document is carried through as opaque JSON.
//!
//! # Example
//!
//! ```
//! use panfig_pandoc::{Document, Replacement};
//!
//! let json = r#"{"pandoc-api-version":[1,23],"meta":{},"blocks":[
//!     {"t":"CodeBlock","c":[["",["drop-me"],[]],"x"]}
//! ]}"#;
//! let mut doc: Document = json.parse().unwrap();
//! doc.filter_code_blocks(|block| {
//!     if block.attr.has_class("drop-me") {
//!         Replacement::Remove
//!     } else {
//!         Replacement::PassThrough
//!     }
//! })
//! .unwrap();
//! assert!(doc.to_json().unwrap().contains(r#""blocks":[]"#));
//! ```

mod ast;
mod document;
mod error;

pub use ast::{Attr, CodeBlock, Replacement};
pub use document::Document;
pub use error::PandocError;
