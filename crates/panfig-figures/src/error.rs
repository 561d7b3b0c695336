//! Figure error types.

use std::io;
use std::path::PathBuf;

/// A code block that panfig cannot interpret.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The block lacks the `.panfig` class.
    #[error("code block is not a panfig figure (missing `.panfig` class)")]
    NotAFigure,
    /// The block lacks the `.panfig-aliases` class.
    #[error("code block is not a panfig alias block (missing `.panfig-aliases` class)")]
    NotAnAliasBlock,
    /// No `shell` attribute, neither explicit nor from an alias.
    #[error("figure has no `shell` attribute, and no alias providing one")]
    MissingShell,
    /// Alias block body is not `{"name": {"key": "value", ...}, ...}`.
    #[error("alias block must be a JSON object mapping names to string attributes")]
    InvalidAliases(#[source] serde_json::Error),
    /// The `shell` template cannot be expanded.
    #[error("invalid shell template `{template}`: {reason}")]
    InvalidTemplate {
        /// Template as written.
        template: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Error raised while resolving or rendering a figure.
#[derive(Debug, thiserror::Error)]
pub enum FigureError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no such alias: `{0}`")]
    NoSuchAlias(String),

    /// The command exited non-zero, or exited zero without writing the figure.
    #[error("command `{command}` {}", describe_exit(*.exit_code))]
    SubprocessFailed {
        /// Command line as passed to the interpreter.
        command: String,
        /// Captured standard output.
        stdout: Vec<u8>,
        /// Captured standard error.
        stderr: Vec<u8>,
        /// Exit code, `None` if the process was killed by a signal.
        exit_code: Option<i32>,
    },

    /// The renderer reported success but the figure is missing.
    #[error("rendering reported success but no figure exists at {}", .0.display())]
    NoFigureProduced(PathBuf),

    #[error("failed to start command `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Figure paths end up in a shell command and a JSON document.
    #[error("figure path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("failed to create cache directory {}", .path.display())]
    CacheRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_exit(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(0) => "exited successfully but did not produce a figure".to_owned(),
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_owned(),
    }
}
