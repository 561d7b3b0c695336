//! Failure reports shown in place of figures that could not be rendered.
//!
//! A report echoes the offending block back in fenced form, followed by the
//! error chain and, for failed commands, everything the command printed.
//! Building a report never fails.

use std::error::Error;
use std::fmt::Write;

use panfig_pandoc::Attr;

use crate::consts::{FENCE_CHAR, MIN_FENCE_WIDTH};
use crate::error::FigureError;

const INDENT: &str = "    ";

/// Re-serialize a block as a fenced code block.
///
/// ```text
/// ~~~~~~~~ {#id .panfig shell="dot -Tpng -o %s"}
/// a -> b
/// ~~~~~~~~
/// ```
///
/// The fence is longer than any run of `~` that makes up a whole line of the
/// content, and at least eight characters wide.
pub fn block_source(attr: &Attr, content: &str) -> String {
    let fence = FENCE_CHAR.to_string().repeat(fence_width(content));
    let info = attr_syntax(attr);

    let mut out = String::with_capacity(content.len() + 2 * fence.len() + info.len() + 4);
    out.push_str(&fence);
    if !info.is_empty() {
        out.push(' ');
        out.push_str(&info);
    }
    out.push('\n');
    out.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&fence);
    out
}

/// Build the failure report for a block.
///
/// `attr` and `content` describe the block as far as it was understood:
/// the resolved directive when it could be built, the raw node otherwise.
pub fn render_failure(attr: &Attr, content: &str, error: &FigureError) -> String {
    let mut out = String::from("panfig failed to render this block:\n\n");
    out.push_str(&block_source(attr, content));
    out.push_str("\n\n");
    out.push_str(&error_trace(error));

    if let FigureError::SubprocessFailed {
        command,
        stdout,
        stderr,
        exit_code,
    } = error
    {
        let exit = exit_code.map_or_else(|| "none (killed by signal)".to_owned(), |c| c.to_string());
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "\n\nCommand:\n\n{}\n\nExit code: {exit}\n\nStdout:\n\n{}\n\nStderr:\n\n{}",
            indent(command),
            indent(&String::from_utf8_lossy(stdout)),
            indent(&String::from_utf8_lossy(stderr)),
        );
    }

    out
}

/// The error followed by its chain of sources.
fn error_trace(error: &FigureError) -> String {
    let mut out = format!("Error: {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(out, "\nCaused by: {cause}");
        source = cause.source();
    }
    out
}

/// `{#id .class key="value"}`, or an empty string for empty attributes.
fn attr_syntax(attr: &Attr) -> String {
    let mut parts = Vec::with_capacity(1 + attr.classes.len() + attr.attributes.len());
    if !attr.identifier.is_empty() {
        parts.push(format!("#{}", attr.identifier));
    }
    for class in &attr.classes {
        parts.push(format!(".{class}"));
    }
    for (key, value) in &attr.attributes {
        // A JSON string literal is a valid double-quoted attribute value.
        let quoted = serde_json::Value::from(value.as_str()).to_string();
        parts.push(format!("{key}={quoted}"));
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(" "))
    }
}

fn fence_width(content: &str) -> usize {
    let longest = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.chars().all(|c| c == FENCE_CHAR))
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);
    MIN_FENCE_WIDTH.max(longest + 1)
}

fn indent(text: &str) -> String {
    text.trim_end_matches('\n')
        .split('\n')
        .map(|line| format!("{INDENT}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
