//! Figure directives.

use panfig_cache::Fingerprint;
use panfig_pandoc::{Attr, CodeBlock};
use serde_json::json;

use crate::aliases::AliasTable;
use crate::consts::{ATTR_ALIAS, ATTR_SHELL, FIGURE_CLASS};
use crate::error::{FigureError, ParseError};

/// One "generate an image from this text" request.
///
/// Attributes are resolved against the alias table once, at construction.
/// The directive keeps no reference to the table, so later alias declarations
/// never change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    identifier: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    content: String,
}

impl Directive {
    /// Whether `block` carries the figure class.
    #[must_use]
    pub fn recognizes(block: &CodeBlock) -> bool {
        block.attr.has_class(FIGURE_CLASS)
    }

    /// Build a directive from a figure code block.
    ///
    /// Explicit attributes keep their order and shadow the alias preset; the
    /// preset's remaining attributes follow in the preset's order.
    ///
    /// # Errors
    ///
    /// - `ParseError::NotAFigure` if the block lacks the figure class
    /// - `FigureError::NoSuchAlias` if `alias` names an unknown preset
    /// - `ParseError::MissingShell` if no `shell` attribute results
    pub fn from_node(aliases: &AliasTable, block: &CodeBlock) -> Result<Self, FigureError> {
        if !Self::recognizes(block) {
            return Err(ParseError::NotAFigure.into());
        }

        let mut attributes = block.attr.attributes.clone();
        if let Some(name) = block.attr.get(ATTR_ALIAS) {
            let preset = aliases
                .get(name)
                .ok_or_else(|| FigureError::NoSuchAlias(name.to_owned()))?;
            for (key, value) in preset {
                if !attributes.iter().any(|(k, _)| k == key) {
                    attributes.push((key.clone(), value.clone()));
                }
            }
        }

        if !attributes.iter().any(|(k, _)| k == ATTR_SHELL) {
            return Err(ParseError::MissingShell.into());
        }

        Ok(Self {
            identifier: Some(block.attr.identifier.clone()).filter(|id| !id.is_empty()),
            classes: block.attr.classes.clone(),
            attributes,
            content: block.text.clone(),
        })
    }

    /// Document-unique identifier, if any.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Classes in document order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Resolved attributes.
    #[must_use]
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Resolved attribute value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Command template. Always present on a constructed directive.
    #[must_use]
    pub fn shell(&self) -> &str {
        self.get(ATTR_SHELL).unwrap_or_default()
    }

    /// Text fed to the command.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Node attributes carrying the resolved values.
    #[must_use]
    pub fn to_attr(&self) -> Attr {
        Attr {
            identifier: self.identifier.clone().unwrap_or_default(),
            classes: self.classes.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

impl Fingerprint for Directive {
    /// `[identifier, [classes], [[key, value], ...], content]` as compact JSON.
    fn canonical_form(&self) -> String {
        json!([self.identifier, self.classes, self.attributes, self.content]).to_string()
    }
}
