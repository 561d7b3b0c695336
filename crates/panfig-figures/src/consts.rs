//! Internal constants for figure handling.

/// Class marking a code block as a figure directive.
pub const FIGURE_CLASS: &str = "panfig";

/// Class marking a code block as an alias declaration.
pub const ALIASES_CLASS: &str = "panfig-aliases";

/// Command template attribute (`%s` is replaced by the output path).
pub(crate) const ATTR_SHELL: &str = "shell";

/// Name of the alias preset to inherit attributes from.
pub(crate) const ATTR_ALIAS: &str = "alias";

/// Line sent to the command before the block content.
pub(crate) const ATTR_PROLOGUE: &str = "prologue";

/// Line sent to the command after the block content.
pub(crate) const ATTR_EPILOGUE: &str = "epilogue";

/// When `"true"`, the block content is dedented before it is sent.
pub(crate) const ATTR_DEDENT: &str = "dedent";

/// Fence character used when echoing a block back in diagnostics.
pub(crate) const FENCE_CHAR: char = '~';

/// Narrowest fence used when echoing a block back in diagnostics.
pub(crate) const MIN_FENCE_WIDTH: usize = 8;
