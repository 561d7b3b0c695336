//! panfig - pandoc filter rendering figures from code blocks.
//!
//! Pandoc runs filters as `panfig <output-format>`, with the document as JSON
//! on stdin and the filtered document expected on stdout:
//!
//! ```sh
//! pandoc --filter panfig input.md -o output.html
//! ```

mod error;
mod filter;
mod output;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use filter::FilterArgs;
use output::Output;

/// Log level used when `RUST_LOG` is unset.
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Pandoc filter that renders `.panfig` code blocks into cached images.
#[derive(Parser)]
#[command(name = "panfig", version, about)]
struct Cli {
    #[command(flatten)]
    args: FilterArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.args.verbose {
        EnvFilter::new("info")
    } else {
        default_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.args.execute(io::stdin().lock(), io::stdout().lock()) {
        Ok(stats) => {
            if stats.failed > 0 {
                output.warning(&format!(
                    "panfig: {} block(s) could not be rendered, see the document for details",
                    stats.failed
                ));
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            output.error(&format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` if set and valid, otherwise `warn`.
fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}
