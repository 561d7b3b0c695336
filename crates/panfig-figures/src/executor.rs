//! Figure rendering through external commands.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use crate::command::{build_command, build_payload};
use crate::directive::Directive;
use crate::error::FigureError;

/// Produces the artifact for a directive.
///
/// On `Ok(())` the figure is expected at `target`; callers still check.
pub trait FigureRenderer {
    /// Render `directive` into `target`.
    fn render(&self, directive: &Directive, target: &Path) -> Result<(), FigureError>;
}

/// Runs the directive's `shell` template through a command interpreter.
///
/// The interpreter defaults to `sh -c` (`cmd /C` on Windows); the expanded
/// command line is appended as its last argument.
#[derive(Debug, Clone)]
pub struct ShellRenderer {
    program: String,
    args: Vec<String>,
}

impl Default for ShellRenderer {
    fn default() -> Self {
        if cfg!(windows) {
            Self::new("cmd", ["/C"])
        } else {
            Self::new("sh", ["-c"])
        }
    }
}

impl ShellRenderer {
    /// Use `program` with leading `args` as the interpreter.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl FigureRenderer for ShellRenderer {
    /// Run the command, feeding the payload on stdin.
    ///
    /// Stdin is written from a separate thread while stdout and stderr are
    /// drained together, so a command producing lots of output before reading
    /// its input cannot deadlock. Succeeds only if the command exits zero and
    /// `target` exists afterwards; otherwise any partial file is removed.
    fn render(&self, directive: &Directive, target: &Path) -> Result<(), FigureError> {
        let command = build_command(directive.shell(), target)?;
        let payload = build_payload(directive);
        tracing::debug!(%command, bytes = payload.len(), "running figure command");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| FigureError::Spawn {
                command: command.clone(),
                source,
            })?;

        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || -> io::Result<()> {
                stdin.write_all(payload.as_bytes())?;
                // Dropping `stdin` closes the pipe.
                Ok(())
            })
        });

        let output = child.wait_with_output().map_err(|source| FigureError::Spawn {
            command: command.clone(),
            source,
        })?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The command is free to exit without reading its input.
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                    tracing::debug!("command closed stdin before reading all input");
                }
                Ok(Err(e)) => tracing::warn!("failed to write figure source to stdin: {e}"),
                Err(_) => tracing::warn!("stdin writer thread panicked"),
            }
        }

        let exit_code = output.status.code();
        if output.status.success() && target.exists() {
            return Ok(());
        }

        if target.exists()
            && let Err(e) = fs::remove_file(target)
        {
            tracing::warn!("failed to remove partial figure {}: {e}", target.display());
        }

        Err(FigureError::SubprocessFailed {
            command,
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code,
        })
    }
}
