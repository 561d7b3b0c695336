//! Alias presets: named sets of default attributes.
//!
//! A figure with `alias="dot"` inherits every attribute of the `dot` preset
//! that it does not set itself. Presets come from three layers, later layers
//! replacing earlier ones per name:
//!
//! 1. built-in presets ([`AliasTable::with_builtins`])
//! 2. presets from configuration ([`AliasTable::extend`])
//! 3. alias blocks in the document, applied in document order
//!
//! ```text
//! ~~~ {.panfig-aliases}
//! {"neato": {"shell": "neato -Tpng -o %s"}}
//! ~~~
//! ```

use std::collections::BTreeMap;

use panfig_pandoc::CodeBlock;

use crate::consts::{
    ALIASES_CLASS, ATTR_DEDENT, ATTR_EPILOGUE, ATTR_PROLOGUE, ATTR_SHELL,
};
use crate::error::{FigureError, ParseError};

/// Attributes supplied by one alias.
pub type Preset = BTreeMap<String, String>;

/// Alias presets in effect at some point of a document traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    presets: BTreeMap<String, Preset>,
}

impl AliasTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table seeded with the built-in presets:
    ///
    /// - `dot`: Graphviz
    /// - `mathematica`: Wolfram kernel, exporting the last result
    /// - `matplotlib`: Python with pyplot imported and the figure saved
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table.insert("dot", preset(&[(ATTR_SHELL, "dot -Tpng -o %s")]));
        table.insert(
            "mathematica",
            preset(&[
                (ATTR_SHELL, "MathKernel -script /dev/stdin %s"),
                (ATTR_EPILOGUE, r#"Export[Last[$ScriptCommandLine], %, "png"]"#),
            ]),
        );
        table.insert(
            "matplotlib",
            preset(&[
                (ATTR_SHELL, "python3 - %s"),
                (
                    ATTR_PROLOGUE,
                    "import sys; from matplotlib import pyplot as plt",
                ),
                (ATTR_EPILOGUE, r#"plt.savefig(sys.argv[1], format="png")"#),
                (ATTR_DEDENT, "true"),
            ]),
        );
        table
    }

    /// Whether `block` is an alias declaration.
    #[must_use]
    pub fn recognizes(block: &CodeBlock) -> bool {
        block.attr.has_class(ALIASES_CLASS)
    }

    /// Apply an alias declaration block.
    ///
    /// The body must be a JSON object mapping alias names to objects of string
    /// attributes. Each declared alias replaces any existing alias of the same
    /// name entirely; attributes are not merged across declarations. The table
    /// is left untouched if the body does not parse.
    pub fn apply(&mut self, block: &CodeBlock) -> Result<(), FigureError> {
        if !Self::recognizes(block) {
            return Err(ParseError::NotAnAliasBlock.into());
        }
        let declared: BTreeMap<String, Preset> =
            serde_json::from_str(&block.text).map_err(ParseError::InvalidAliases)?;
        tracing::debug!(
            aliases = ?declared.keys().collect::<Vec<_>>(),
            "applying alias block"
        );
        self.extend(declared);
        Ok(())
    }

    /// Add presets, replacing existing presets with the same name.
    pub fn extend<I>(&mut self, presets: I)
    where
        I: IntoIterator<Item = (String, Preset)>,
    {
        self.presets.extend(presets);
    }

    /// Add or replace a single preset.
    pub fn insert(&mut self, name: impl Into<String>, preset: Preset) {
        self.presets.insert(name.into(), preset);
    }

    /// Look up a preset by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    /// Names of all presets, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }
}

fn preset(pairs: &[(&str, &str)]) -> Preset {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}
