//! Filter a pandoc document read from stdin.

use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;

use clap::Args;
use panfig_cache::FigureCache;
use panfig_config::{CliSettings, Config};
use panfig_figures::{AliasTable, FigureFilter, FilterStats, ShellRenderer};
use panfig_pandoc::Document;

use crate::error::CliError;

/// Arguments for running the filter.
#[derive(Args, Debug)]
pub(crate) struct FilterArgs {
    /// Output format, passed by pandoc. Figures are PNG regardless.
    pub format: Option<String>,

    /// Path to configuration file (default: auto-discover panfig.toml).
    #[arg(short, long, env = "PANFIG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory to store rendered figures in (overrides config).
    #[arg(long, env = "PANFIG_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Log cache hits, misses and rendered figures.
    #[arg(short, long)]
    pub verbose: bool,
}

impl FilterArgs {
    /// Read a document from `input`, filter it, write it to `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the document cannot be
    /// read or written. Figure failures are reported inside the document.
    pub(crate) fn execute<R: Read, W: Write>(
        self,
        input: R,
        output: W,
    ) -> Result<FilterStats, CliError> {
        let cli_settings = CliSettings {
            cache_dir: self.cache_dir,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::debug!("using config {}", path.display());
        }
        if let Some(format) = &self.format {
            tracing::debug!("output format: {format}");
        }

        let renderer = renderer_from_config(&config)?;
        let mut aliases = AliasTable::with_builtins();
        aliases.extend(config.aliases);

        let cache = FigureCache::new(config.cache_resolved.dir);
        tracing::debug!("figure cache: {}", cache.root().display());
        let filter = FigureFilter::new(cache).with_renderer(renderer);

        let mut document = Document::from_reader(input)?;
        let stats = filter.run(aliases, &mut document)?;

        let mut writer = BufWriter::new(output);
        document.write_to(&mut writer)?;
        writer.flush()?;

        tracing::info!(
            rendered = stats.rendered,
            cached = stats.cached,
            failed = stats.failed,
            "filtered document"
        );
        Ok(stats)
    }
}

fn renderer_from_config(config: &Config) -> Result<ShellRenderer, CliError> {
    let (program, args) = config
        .execution
        .interpreter
        .split_first()
        .ok_or_else(|| CliError::Validation("execution.interpreter is empty".to_owned()))?;
    Ok(ShellRenderer::new(program.as_str(), args.iter().cloned()))
}
