//! Figure directives for panfig.
//!
//! A figure is a code block carrying the `.panfig` class. Its `shell`
//! attribute is a command template; the block content is sent to the command
//! on stdin and the command writes an image to the path substituted for `%s`.
//!
//! ```markdown
//! ~~~ {.panfig shell="dot -Tpng -o %s"}
//! digraph { a -> b }
//! ~~~
//! ```
//!
//! Attributes may be inherited from a named preset with `alias="name"`.
//! Presets come from the built-in table, the configuration file, and
//! `.panfig-aliases` blocks in the document itself:
//!
//! ```markdown
//! ~~~ {.panfig-aliases}
//! {"circo": {"shell": "circo -Tpng -o %s"}}
//! ~~~
//! ```
//!
//! Rendered figures are stored in a [`FigureCache`](panfig_cache::FigureCache)
//! keyed by the resolved directive, so an unchanged block never runs its
//! command twice. A block that cannot be rendered is replaced by a report
//! showing the block, the error and the command's output.
//!
//! # Example
//!
//! ```
//! use panfig_figures::{AliasTable, Directive, FIGURE_CLASS};
//! use panfig_pandoc::{Attr, CodeBlock};
//!
//! let block = CodeBlock {
//!     attr: Attr {
//!         classes: vec![FIGURE_CLASS.to_owned()],
//!         attributes: vec![("alias".to_owned(), "dot".to_owned())],
//!         ..Attr::default()
//!     },
//!     text: "digraph { a -> b }".to_owned(),
//! };
//!
//! let directive = Directive::from_node(&AliasTable::with_builtins(), &block).unwrap();
//! assert_eq!(directive.shell(), "dot -Tpng -o %s");
//! ```

mod aliases;
mod command;
mod consts;
mod diagnostic;
mod directive;
mod error;
mod executor;
mod filter;

pub use aliases::{AliasTable, Preset};
pub use command::{build_command, build_payload};
pub use consts::{ALIASES_CLASS, FIGURE_CLASS};
pub use diagnostic::{block_source, render_failure};
pub use directive::Directive;
pub use error::{FigureError, ParseError};
pub use executor::{FigureRenderer, ShellRenderer};
pub use filter::{FigureFilter, FilterContext, FilterStats, NodeKind};
