//! Configuration management for panfig.
//!
//! Parses `panfig.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Example
//!
//! ```toml
//! [cache]
//! dir = "${XDG_CACHE_HOME:-~/.cache}/panfig/figures"
//!
//! [execution]
//! interpreter = ["bash", "-c"]
//!
//! [aliases.mermaid]
//! shell = "mmdc -i /dev/stdin -o %s"
//! ```
//!
//! ## Path Expansion
//!
//! `cache.dir` supports `${VAR}`, `${VAR:-default}` and a leading `~`.
//! Relative paths are resolved against the directory of the config file.

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "panfig.toml";

/// Fallback cache directory when the platform has no user cache directory.
const FALLBACK_CACHE_DIR: &str = "panfig-figures";

/// Named attribute presets: alias name to `{attribute: value}`.
pub type AliasPresets = BTreeMap<String, BTreeMap<String, String>>;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the figure cache directory.
    pub cache_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache configuration (paths are unexpanded strings from TOML).
    cache: CacheConfigRaw,
    /// Command execution configuration.
    pub execution: ExecutionConfig,
    /// Extra alias presets, layered over the built-in ones.
    pub aliases: AliasPresets,

    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw cache configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    dir: Option<String>,
}

/// Resolved cache configuration with an absolute (or fallback) path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding generated figures.
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

/// `<user-cache-dir>/panfig/figures`, or `./panfig-figures` without one.
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(
        || PathBuf::from(FALLBACK_CACHE_DIR),
        |dir| dir.join("panfig").join("figures"),
    )
}

/// Command execution configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Interpreter program and arguments; the command line is appended last.
    pub interpreter: Vec<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        let interpreter: &[&str] = if cfg!(windows) {
            &["cmd", "/C"]
        } else {
            &["sh", "-c"]
        };
        Self {
            interpreter: interpreter.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`cache.dir`").
        field: String,
        /// Error message (e.g., "${`XDG_CACHE_HOME`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `panfig.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        config.validate_cache_dir()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(cache_dir) = &settings.cache_dir {
            self.cache_resolved.dir.clone_from(cache_dir);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.execution.interpreter.first() {
            None => {
                return Err(ConfigError::Validation(
                    "execution.interpreter cannot be empty".to_owned(),
                ));
            }
            Some(program) if program.trim().is_empty() => {
                return Err(ConfigError::Validation(
                    "execution.interpreter program cannot be blank".to_owned(),
                ));
            }
            Some(_) => {}
        }

        for (name, preset) in &self.aliases {
            if name.is_empty() {
                return Err(ConfigError::Validation(
                    "aliases: alias name cannot be empty".to_owned(),
                ));
            }
            if preset.contains_key("alias") {
                return Err(ConfigError::Validation(format!(
                    "aliases.{name}: presets cannot refer to other aliases"
                )));
            }
        }

        Ok(())
    }

    /// Check the final cache directory, after CLI overrides.
    ///
    /// Figure paths are spliced into shell commands and into the JSON
    /// document, both of which need them as text.
    fn validate_cache_dir(&self) -> Result<(), ConfigError> {
        if self.cache_resolved.dir.to_str().is_none() {
            return Err(ConfigError::Validation(format!(
                "cache directory is not valid UTF-8: {}",
                self.cache_resolved.dir.display()
            )));
        }
        Ok(())
    }

    /// Expand and resolve `cache.dir` relative to the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        self.cache_resolved = match &self.cache.dir {
            Some(dir) => {
                let expanded = expand::expand_path(dir, "cache.dir")?;
                if expanded.is_empty() {
                    return Err(ConfigError::Validation(
                        "cache.dir cannot be empty".to_owned(),
                    ));
                }
                CacheConfig {
                    dir: config_dir.join(expanded),
                }
            }
            None => CacheConfig::default(),
        };
        Ok(())
    }
}
