//! Command line and stdin payload construction.
//!
//! The output path is the only value substituted into the command line, and
//! it is shell-quoted. Block content only ever reaches the command on stdin.

use std::path::Path;

use crate::consts::{ATTR_DEDENT, ATTR_EPILOGUE, ATTR_PROLOGUE};
use crate::directive::Directive;
use crate::error::ParseError;

/// Expand a `shell` template for `target`.
///
/// The template must contain exactly one `%s`, which is replaced by the
/// shell-quoted target path. `%%` stands for a literal `%`; any other `%`
/// sequence is rejected, as is a target path that is not valid UTF-8.
pub fn build_command(template: &str, target: &Path) -> Result<String, ParseError> {
    let invalid = |reason: &str| ParseError::InvalidTemplate {
        template: template.to_owned(),
        reason: reason.to_owned(),
    };

    let target = target
        .to_str()
        .ok_or_else(|| invalid("output path is not valid UTF-8"))?;
    let quoted = shlex::try_quote(target).map_err(|_| invalid("output path cannot be quoted"))?;

    let mut command = String::with_capacity(template.len() + quoted.len());
    let mut substitutions = 0;
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            command.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => {
                command.push_str(&quoted);
                substitutions += 1;
            }
            Some('%') => command.push('%'),
            Some(other) => {
                return Err(invalid(&format!(
                    "unsupported `%{other}` (use `%s` for the output path, `%%` for `%`)"
                )));
            }
            None => return Err(invalid("dangling `%` at end of template")),
        }
    }

    match substitutions {
        1 => Ok(command),
        0 => Err(invalid("no `%s` placeholder for the output path")),
        _ => Err(invalid("more than one `%s` placeholder")),
    }
}

/// Text written to the command's stdin.
///
/// `prologue`, the (optionally dedented) content and `epilogue`, joined by
/// newlines. Absent sections are skipped entirely.
pub fn build_payload(directive: &Directive) -> String {
    let content = if directive.get(ATTR_DEDENT) == Some("true") {
        dedent(directive.content())
    } else {
        directive.content().to_owned()
    };

    let mut sections = Vec::with_capacity(3);
    if let Some(prologue) = directive.get(ATTR_PROLOGUE) {
        sections.push(prologue.to_owned());
    }
    sections.push(content);
    if let Some(epilogue) = directive.get(ATTR_EPILOGUE) {
        sections.push(epilogue.to_owned());
    }
    sections.join("\n")
}

/// Remove the leading whitespace common to all non-blank lines.
///
/// Blank lines do not take part in computing the common prefix and come out
/// empty.
pub(crate) fn dedent(text: &str) -> String {
    let mut common: Option<&str> = None;
    for line in text.split('\n').filter(|l| !l.trim().is_empty()) {
        let indent = &line[..line.len() - line.trim_start().len()];
        common = Some(match common {
            None => indent,
            Some(prev) => common_prefix(prev, indent),
        });
    }
    let common = common.unwrap_or_default();

    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                line.strip_prefix(common).unwrap_or(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, x), y)| x == y)
        .last()
        .map_or(0, |((i, x), _)| i + x.len_utf8());
    &a[..len]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aliases::AliasTable;
    use crate::consts::FIGURE_CLASS;
    use panfig_pandoc::{Attr, CodeBlock};
    use pretty_assertions::assert_eq;

    fn directive(attributes: &[(&str, &str)], text: &str) -> Directive {
        let block = CodeBlock {
            attr: Attr {
                identifier: String::new(),
                classes: vec![FIGURE_CLASS.to_owned()],
                attributes: attributes
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                    .collect(),
            },
            text: text.to_owned(),
        };
        Directive::from_node(&AliasTable::with_builtins(), &block).unwrap()
    }

    #[test]
    fn test_build_command_substitutes_path() {
        let command = build_command("dot -Tpng -o %s", Path::new("/cache/abc")).unwrap();
        assert_eq!(command, "dot -Tpng -o /cache/abc");
    }

    #[test]
    fn test_build_command_quotes_path() {
        let command = build_command("convert - %s", Path::new("/my cache/it's")).unwrap();
        assert!(command.starts_with("convert - "));
        assert_eq!(shlex::split(&command).unwrap(), vec!["convert", "-", "/my cache/it's"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_build_command_rejects_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let target = Path::new("/tmp").join(OsStr::from_bytes(b"cache\xff")).join("fig");
        let err = build_command("cat > %s", &target).unwrap_err();

        assert!(matches!(err, ParseError::InvalidTemplate { .. }));
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_build_command_literal_percent() {
        let command = build_command("date +%%Y > /dev/null; touch %s", Path::new("/c/f")).unwrap();
        assert_eq!(command, "date +%Y > /dev/null; touch /c/f");
    }

    #[test]
    fn test_build_command_requires_placeholder() {
        let err = build_command("dot -Tpng", Path::new("/c/f")).unwrap_err();
        assert!(err.to_string().contains("no `%s`"));
    }

    #[test]
    fn test_build_command_rejects_two_placeholders() {
        let err = build_command("cp %s %s", Path::new("/c/f")).unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }

    #[test]
    fn test_build_command_rejects_other_conversions() {
        assert!(build_command("x %d %s", Path::new("/c/f")).is_err());
        assert!(build_command("x %s %", Path::new("/c/f")).is_err());
    }

    #[test]
    fn test_payload_composition() {
        let directive = directive(
            &[
                ("shell", "python - %s"),
                ("prologue", "import x"),
                ("epilogue", "save()"),
            ],
            "plot(x)",
        );
        assert_eq!(build_payload(&directive), "import x\nplot(x)\nsave()");
    }

    #[test]
    fn test_payload_content_only() {
        let directive = directive(&[("shell", "dot -o %s")], "a -> b");
        assert_eq!(build_payload(&directive), "a -> b");
    }

    #[test]
    fn test_payload_dedent_only_when_true() {
        let text = "    a\n      b";

        let kept = directive(&[("shell", "x %s"), ("dedent", "yes")], text);
        assert_eq!(build_payload(&kept), text);

        let dedented = directive(&[("shell", "x %s"), ("dedent", "true")], text);
        assert_eq!(build_payload(&dedented), "a\n  b");
    }

    #[test]
    fn test_payload_from_alias() {
        let directive = directive(&[("alias", "matplotlib")], "  plt.plot([1, 2])");
        assert_eq!(
            build_payload(&directive),
            "import sys; from matplotlib import pyplot as plt\n\
             plt.plot([1, 2])\n\
             plt.savefig(sys.argv[1], format=\"png\")"
        );
    }

    #[test]
    fn test_dedent_ignores_blank_lines() {
        assert_eq!(dedent("    a\n\n  \n    b"), "a\n\n\nb");
    }

    #[test]
    fn test_dedent_mixed_indent() {
        assert_eq!(dedent("\tx\n\t\ty"), "x\n\ty");
        assert_eq!(dedent(" \tx\n\t y"), " \tx\n\t y");
    }

    #[test]
    fn test_dedent_no_common_indent() {
        assert_eq!(dedent("a\n  b"), "a\n  b");
    }

    #[test]
    fn test_dedent_all_blank() {
        assert_eq!(dedent("  \n"), "\n");
    }
}
