//! Per-node dispatch: alias blocks, figures, and everything else.

use panfig_cache::FigureCache;
use panfig_pandoc::{CodeBlock, Document, PandocError, Replacement};

use crate::aliases::AliasTable;
use crate::diagnostic::{block_source, render_failure};
use crate::directive::Directive;
use crate::error::FigureError;
use crate::executor::{FigureRenderer, ShellRenderer};

/// What a code block is, as far as panfig is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Alias declaration block.
    Aliases,
    /// Figure directive block.
    Figure,
    /// Anything else; passed through untouched.
    Other,
}

impl NodeKind {
    /// Classify a code block. Alias declarations take precedence.
    #[must_use]
    pub fn of(block: &CodeBlock) -> Self {
        if AliasTable::recognizes(block) {
            Self::Aliases
        } else if Directive::recognizes(block) {
            Self::Figure
        } else {
            Self::Other
        }
    }
}

/// Counters for one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Alias blocks applied.
    pub aliases: usize,
    /// Figures rendered by running their command.
    pub rendered: usize,
    /// Figures served from the cache.
    pub cached: usize,
    /// Blocks replaced by a failure report.
    pub failed: usize,
}

/// State that lives for exactly one document traversal.
///
/// Alias declarations mutate the table in document order, so a figure only
/// sees aliases declared before it.
#[derive(Debug, Default)]
pub struct FilterContext {
    aliases: AliasTable,
    stats: FilterStats,
}

impl FilterContext {
    /// Start a traversal with the given alias presets.
    #[must_use]
    pub fn new(aliases: AliasTable) -> Self {
        Self {
            aliases,
            stats: FilterStats::default(),
        }
    }

    /// Aliases in effect at this point of the traversal.
    #[must_use]
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> FilterStats {
        self.stats
    }
}

/// Replaces figure code blocks with cached, generated images.
///
/// # Example
///
/// ```no_run
/// use panfig_cache::FigureCache;
/// use panfig_figures::{AliasTable, FigureFilter};
/// use panfig_pandoc::Document;
///
/// let mut document = Document::from_reader(std::io::stdin()).unwrap();
/// let filter = FigureFilter::new(FigureCache::new("/tmp/panfig/figures"));
/// let stats = filter.run(AliasTable::with_builtins(), &mut document).unwrap();
/// eprintln!("{} rendered, {} cached", stats.rendered, stats.cached);
/// ```
#[derive(Debug)]
pub struct FigureFilter<R = ShellRenderer> {
    cache: FigureCache,
    renderer: R,
}

impl FigureFilter {
    /// Create a filter storing figures in `cache`, rendering with `sh -c`.
    #[must_use]
    pub fn new(cache: FigureCache) -> Self {
        Self {
            cache,
            renderer: ShellRenderer::default(),
        }
    }
}

impl<R: FigureRenderer> FigureFilter<R> {
    /// Replace the renderer.
    #[must_use]
    pub fn with_renderer<T: FigureRenderer>(self, renderer: T) -> FigureFilter<T> {
        FigureFilter {
            cache: self.cache,
            renderer,
        }
    }

    /// Figure cache.
    #[must_use]
    pub fn cache(&self) -> &FigureCache {
        &self.cache
    }

    /// Renderer in use.
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Filter every code block of `document`, in document order.
    ///
    /// A fresh [`FilterContext`] is built from `aliases` and discarded when the
    /// traversal ends.
    ///
    /// # Errors
    ///
    /// Only document structure errors are returned. Figure failures become
    /// failure reports inside the document.
    pub fn run(
        &self,
        aliases: AliasTable,
        document: &mut Document,
    ) -> Result<FilterStats, PandocError> {
        let mut ctx = FilterContext::new(aliases);
        document.filter_code_blocks(|block| self.dispatch(&mut ctx, block))?;
        Ok(ctx.stats)
    }

    /// Handle one code block.
    ///
    /// Never fails: errors for alias and figure blocks are turned into a
    /// failure report replacing the block.
    pub fn dispatch(&self, ctx: &mut FilterContext, block: &CodeBlock) -> Replacement {
        match NodeKind::of(block) {
            NodeKind::Other => Replacement::PassThrough,
            NodeKind::Aliases => match ctx.aliases.apply(block) {
                Ok(()) => {
                    ctx.stats.aliases += 1;
                    // Pandoc has no Null block; dropping the node is the no-op.
                    Replacement::Remove
                }
                Err(e) => {
                    tracing::warn!("invalid alias block: {e}");
                    ctx.stats.failed += 1;
                    Replacement::Text(render_failure(&block.attr, &block.text, &e))
                }
            },
            NodeKind::Figure => {
                let directive = match Directive::from_node(&ctx.aliases, block) {
                    Ok(directive) => directive,
                    Err(e) => {
                        tracing::warn!("invalid figure block: {e}");
                        ctx.stats.failed += 1;
                        return Replacement::Text(render_failure(&block.attr, &block.text, &e));
                    }
                };
                match self.produce(&directive) {
                    Ok((path, fresh)) => {
                        if fresh {
                            ctx.stats.rendered += 1;
                        } else {
                            ctx.stats.cached += 1;
                        }
                        let attr = directive.to_attr();
                        Replacement::Figure {
                            alt_text: block_source(&attr, directive.content()),
                            attr,
                            path,
                        }
                    }
                    Err(e) => {
                        tracing::warn!("figure failed: {e}");
                        ctx.stats.failed += 1;
                        Replacement::Text(render_failure(
                            &directive.to_attr(),
                            directive.content(),
                            &e,
                        ))
                    }
                }
            }
        }
    }

    /// Make sure the figure for `directive` exists in the cache.
    ///
    /// Returns its path and whether it was rendered just now.
    fn produce(&self, directive: &Directive) -> Result<(String, bool), FigureError> {
        let path = self.cache.path_for(directive);
        let Some(text) = path.to_str().map(str::to_owned) else {
            return Err(FigureError::NonUtf8Path(path));
        };
        if self.cache.is_present(&path) {
            tracing::debug!("cache hit: {text}");
            return Ok((text, false));
        }

        tracing::debug!("cache miss: {text}");
        self.cache
            .ensure_root()
            .map_err(|source| FigureError::CacheRoot {
                path: self.cache.root().to_path_buf(),
                source,
            })?;
        self.renderer.render(directive, &path)?;
        if !self.cache.is_present(&path) {
            return Err(FigureError::NoFigureProduced(path));
        }

        tracing::info!("rendered figure {text}");
        Ok((text, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    use panfig_pandoc::Attr;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::consts::{ALIASES_CLASS, FIGURE_CLASS};
    use crate::error::ParseError;

    /// Records each directive's `shell` and writes a dummy figure.
    #[derive(Default)]
    struct RecordingRenderer {
        calls: RefCell<Vec<String>>,
    }

    impl FigureRenderer for RecordingRenderer {
        fn render(&self, directive: &Directive, target: &Path) -> Result<(), FigureError> {
            self.calls.borrow_mut().push(directive.shell().to_owned());
            fs::write(target, b"png").unwrap();
            Ok(())
        }
    }

    /// Claims success without writing anything.
    struct LyingRenderer;

    impl FigureRenderer for LyingRenderer {
        fn render(&self, _directive: &Directive, _target: &Path) -> Result<(), FigureError> {
            Ok(())
        }
    }

    fn figure(attributes: &[(&str, &str)], text: &str) -> CodeBlock {
        CodeBlock {
            attr: Attr {
                identifier: String::new(),
                classes: vec![FIGURE_CLASS.to_owned()],
                attributes: attributes
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                    .collect(),
            },
            text: text.to_owned(),
        }
    }

    fn alias_block(text: &str) -> CodeBlock {
        CodeBlock {
            attr: Attr {
                classes: vec![ALIASES_CLASS.to_owned()],
                ..Attr::default()
            },
            text: text.to_owned(),
        }
    }

    fn recording_filter(tmp: &TempDir) -> FigureFilter<RecordingRenderer> {
        FigureFilter::new(FigureCache::new(tmp.path().join("figures")))
            .with_renderer(RecordingRenderer::default())
    }

    #[test]
    fn test_node_kind() {
        assert_eq!(NodeKind::of(&alias_block("{}")), NodeKind::Aliases);
        assert_eq!(NodeKind::of(&figure(&[], "")), NodeKind::Figure);
        assert_eq!(NodeKind::of(&CodeBlock::default()), NodeKind::Other);
    }

    #[test]
    fn test_other_blocks_pass_through() {
        let tmp = TempDir::new().unwrap();
        let filter = recording_filter(&tmp);
        let mut ctx = FilterContext::new(AliasTable::with_builtins());

        let block = CodeBlock {
            attr: Attr {
                classes: vec!["python".to_owned()],
                ..Attr::default()
            },
            text: "print(1)".to_owned(),
        };

        assert_eq!(filter.dispatch(&mut ctx, &block), Replacement::PassThrough);
        assert_eq!(ctx.stats(), FilterStats::default());
    }

    #[test]
    fn test_figure_becomes_image() {
        let tmp = TempDir::new().unwrap();
        let filter = recording_filter(&tmp);
        let mut ctx = FilterContext::new(AliasTable::with_builtins());
        let block = figure(&[("alias", "dot")], "a -> b");

        let replacement = filter.dispatch(&mut ctx, &block);

        let directive = Directive::from_node(&AliasTable::with_builtins(), &block).unwrap();
        let expected_path = filter.cache().path_for(&directive);
        match replacement {
            Replacement::Figure {
                attr,
                alt_text,
                path,
            } => {
                assert_eq!(attr, directive.to_attr());
                assert_eq!(path, expected_path.to_string_lossy());
                assert!(alt_text.contains("a -> b"));
                assert!(alt_text.contains(r#"shell="dot -Tpng -o %s""#));
            }
            other => panic!("expected figure, got {other:?}"),
        }
        assert!(expected_path.exists());
        assert_eq!(ctx.stats().rendered, 1);
    }

    #[test]
    fn test_same_directive_renders_once() {
        let tmp = TempDir::new().unwrap();
        let filter = recording_filter(&tmp);
        let mut ctx = FilterContext::new(AliasTable::with_builtins());
        let block = figure(&[("shell", "dot -Tpng -o %s")], "a -> b");

        let first = filter.dispatch(&mut ctx, &block);
        let second = filter.dispatch(&mut ctx, &block);

        assert_eq!(first, second);
        assert_eq!(filter.renderer().calls.borrow().len(), 1);
        assert_eq!(ctx.stats().rendered, 1);
        assert_eq!(ctx.stats().cached, 1);
    }

    #[test]
    fn test_cache_survives_filters() {
        let tmp = TempDir::new().unwrap();
        let block = figure(&[("shell", "dot -Tpng -o %s")], "a -> b");

        let first = recording_filter(&tmp);
        first.dispatch(&mut FilterContext::new(AliasTable::new()), &block);

        let second = recording_filter(&tmp);
        second.dispatch(&mut FilterContext::new(AliasTable::new()), &block);

        assert_eq!(first.renderer().calls.borrow().len(), 1);
        assert!(second.renderer().calls.borrow().is_empty());
    }

    #[test]
    fn test_alias_block_is_removed_and_applied() {
        let tmp = TempDir::new().unwrap();
        let filter = recording_filter(&tmp);
        let mut ctx = FilterContext::new(AliasTable::new());

        let replacement =
            filter.dispatch(&mut ctx, &alias_block(r#"{"g": {"shell": "g %s"}}"#));

        assert_eq!(replacement, Replacement::Remove);
        assert!(ctx.aliases().get("g").is_some());
        assert_eq!(ctx.stats().aliases, 1);
    }

    #[test]
    fn test_alias_redefinition_affects_only_later_figures() {
        let tmp = TempDir::new().unwrap();
        let filter = recording_filter(&tmp);
        let mut ctx = FilterContext::new(AliasTable::new());
        let block = figure(&[("alias", "g")], "same content");

        filter.dispatch(&mut ctx, &alias_block(r#"{"g": {"shell": "first %s"}}"#));
        filter.dispatch(&mut ctx, &block);
        filter.dispatch(&mut ctx, &alias_block(r#"{"g": {"shell": "second %s"}}"#));
        filter.dispatch(&mut ctx, &block);

        assert_eq!(
            *filter.renderer().calls.borrow(),
            vec!["first %s".to_owned(), "second %s".to_owned()]
        );
    }

    #[test]
    fn test_invalid_alias_block_reports() {
        let tmp = TempDir::new().unwrap();
        let filter = recording_filter(&tmp);
        let mut ctx = FilterContext::new(AliasTable::new());

        let replacement = filter.dispatch(&mut ctx, &alias_block("not json"));

        match replacement {
            Replacement::Text(report) => {
                assert!(report.contains("not json"));
                assert!(report.contains("alias block must be a JSON object"));
            }
            other => panic!("expected report, got {other:?}"),
        }
        assert_eq!(ctx.stats().failed, 1);
    }

    #[test]
    fn test_unknown_alias_reports() {
        let tmp = TempDir::new().unwrap();
        let filter = recording_filter(&tmp);
        let mut ctx = FilterContext::new(AliasTable::new());

        let replacement = filter.dispatch(&mut ctx, &figure(&[("alias", "dot")], "a"));

        match replacement {
            Replacement::Text(report) => assert!(report.contains("no such alias: `dot`")),
            other => panic!("expected report, got {other:?}"),
        }
        assert!(filter.renderer().calls.borrow().is_empty());
    }

    #[test]
    fn test_missing_shell_reports() {
        let tmp = TempDir::new().unwrap();
        let filter = recording_filter(&tmp);
        let mut ctx = FilterContext::new(AliasTable::new());

        let replacement = filter.dispatch(&mut ctx, &figure(&[], "a"));

        assert!(matches!(replacement, Replacement::Text(ref r)
            if r.contains(&ParseError::MissingShell.to_string())));
    }

    #[test]
    fn test_renderer_success_without_file_is_no_figure_produced() {
        let tmp = TempDir::new().unwrap();
        let filter =
            FigureFilter::new(FigureCache::new(tmp.path().join("figures"))).with_renderer(LyingRenderer);
        let mut ctx = FilterContext::new(AliasTable::new());

        let replacement = filter.dispatch(&mut ctx, &figure(&[("shell", "x %s")], ""));

        match replacement {
            Replacement::Text(report) => {
                assert!(report.contains("rendering reported success but no figure exists"));
            }
            other => panic!("expected report, got {other:?}"),
        }
    }

    #[test]
    fn test_cache_root_failure_reports() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("figures");
        fs::write(&root, b"in the way").unwrap();
        let filter = FigureFilter::new(FigureCache::new(root)).with_renderer(RecordingRenderer::default());

        let replacement = filter.dispatch(
            &mut FilterContext::new(AliasTable::new()),
            &figure(&[("shell", "x %s")], ""),
        );

        assert!(matches!(replacement, Replacement::Text(ref r)
            if r.contains("failed to create cache directory")));
        assert!(filter.renderer().calls.borrow().is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_cache_root_reports_without_rendering() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join(OsStr::from_bytes(b"cache\xff"));
        fs::create_dir(&root).unwrap();
        let filter = FigureFilter::new(FigureCache::new(&root))
            .with_renderer(RecordingRenderer::default());

        let replacement = filter.dispatch(
            &mut FilterContext::new(AliasTable::new()),
            &figure(&[("shell", "cat > %s")], "x"),
        );

        assert!(matches!(replacement, Replacement::Text(ref r)
            if r.contains("figure path is not valid UTF-8")));
        assert!(filter.renderer().calls.borrow().is_empty());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_true_command_yields_report_and_no_cache_file() {
        let tmp = TempDir::new().unwrap();
        let filter = FigureFilter::new(FigureCache::new(tmp.path().join("figures")));
        let mut ctx = FilterContext::new(AliasTable::with_builtins());
        let block = figure(&[("shell", "true %s")], "");

        let replacement = filter.dispatch(&mut ctx, &block);

        let directive = Directive::from_node(ctx.aliases(), &block).unwrap();
        let path = filter.cache().path_for(&directive);
        match replacement {
            Replacement::Text(report) => {
                assert!(report.contains("exited successfully but did not produce a figure"));
                assert!(report.contains("Exit code: 0"));
            }
            other => panic!("expected report, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_renders_once_across_runs() {
        let tmp = TempDir::new().unwrap();
        let counter = tmp.path().join("count");
        let shell = format!(
            "echo run >> {}; cat > %s",
            shlex::try_quote(&counter.to_string_lossy()).unwrap()
        );
        let block = figure(&[("shell", &shell)], "digraph {}");

        for _ in 0..2 {
            let filter = FigureFilter::new(FigureCache::new(tmp.path().join("figures")));
            let replacement = filter.dispatch(&mut FilterContext::new(AliasTable::new()), &block);
            assert!(matches!(replacement, Replacement::Figure { .. }));
        }

        assert_eq!(fs::read_to_string(&counter).unwrap(), "run\n");
    }

    #[test]
    fn test_run_over_document() {
        let tmp = TempDir::new().unwrap();
        let filter = recording_filter(&tmp);
        let mut document = Document::from_value(json!({
            "pandoc-api-version": [1, 23, 1],
            "meta": {},
            "blocks": [
                {"t": "CodeBlock", "c": [["", ["panfig-aliases"], []], r#"{"g": {"shell": "g %s"}}"#]},
                {"t": "CodeBlock", "c": [["fig", ["panfig"], [["alias", "g"]]], "x"]},
                {"t": "CodeBlock", "c": [["", ["panfig"], [["alias", "missing"]]], "y"]},
                {"t": "CodeBlock", "c": [["", ["sh"], []], "ls"]},
            ]
        }))
        .unwrap();

        let stats = filter.run(AliasTable::new(), &mut document).unwrap();

        assert_eq!(
            stats,
            FilterStats {
                aliases: 1,
                rendered: 1,
                cached: 0,
                failed: 1,
            }
        );
        let json: serde_json::Value = serde_json::from_str(&document.to_json().unwrap()).unwrap();
        let blocks = json["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0]["t"], "Para");
        assert_eq!(blocks[0]["c"][0]["t"], "Image");
        assert_eq!(blocks[1]["t"], "CodeBlock");
        assert_eq!(blocks[2], json!({"t": "CodeBlock", "c": [["", ["sh"], []], "ls"]}));
    }
}
