//! Environment variable and home directory expansion for configuration paths.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//! - a leading `~` - expands to the user's home directory

use crate::ConfigError;

/// Expand environment variable references in a string.
///
/// Returns the original string unchanged if no `${}` patterns are present.
/// Bare `$VAR` syntax is not expanded (only `${VAR}` with braces).
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| {
        std::env::var(var).map(Some).map_err(|_| UnsetVar(var.to_owned()))
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

/// Expand environment variables, then a leading `~`.
///
/// Variables are expanded first so that `${XDG_CACHE_HOME:-~/.cache}` works.
pub(crate) fn expand_path(value: &str, field: &str) -> Result<String, ConfigError> {
    let expanded = expand_env(value, field)?;
    Ok(shellexpand::tilde(&expanded).into_owned())
}

/// Lookup failure for a variable that is not set.
struct UnsetVar(String);
