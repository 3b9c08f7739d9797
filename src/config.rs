use crate::core::db::ConnectOptions;
use crate::core::{DbAssertError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub connection: Option<ConnectionConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Defaults for `Connect To Database`.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectionConfig {
    /// URL used when the keyword is called without one
    pub url: Option<String>,
    #[serde(flatten)]
    pub options: ConnectOptions,
}

/// Logging configuration for the command-line front end.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

/// Location searched when no `--config` is given:
/// `<config_dir>/dbassert/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dbassert").join("config.toml"))
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = dbassert::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| DbAssertError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    parse_config(&content)
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| DbAssertError::Config(e.to_string()))
}

/// Loads the explicitly given file, or the default file when it exists, or
/// falls back to an empty configuration.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => match default_config_path() {
            Some(default) if default.exists() => load_config(default),
            _ => Ok(Config::default()),
        },
    }
}
