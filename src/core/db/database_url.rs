/// Connection URL parsing
///
/// Connection strings use the `dialect[+driver]://...` form. Only the
/// `sqlite` dialect can be opened; its database path follows the usual
/// three/four slash convention (`sqlite:///relative.db`,
/// `sqlite:////absolute.db`, `sqlite://` for an in-memory database).

use crate::core::{DbAssertError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Dialects that are valid connection-string schemes but have no driver here
const UNSUPPORTED_DIALECTS: &[&str] = &[
    "postgresql",
    "postgres",
    "mysql",
    "mariadb",
    "oracle",
    "mssql",
];

/// Where a SQLite URL points
#[derive(Debug, Clone, PartialEq)]
pub enum SqliteTarget {
    Memory,
    File(PathBuf),
}

/// A parsed, validated connection URL
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseUrl {
    raw: String,
    dialect: String,
    driver: Option<String>,
    target: SqliteTarget,
    query: Vec<(String, String)>,
}

impl DatabaseUrl {
    /// Parses a connection URL.
    ///
    /// # Errors
    ///
    /// Returns `DbAssertError::Connection` if the text is not a URL, names an
    /// unknown or unsupported dialect, or carries a host for SQLite.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let url = Url::parse(raw).map_err(|e| {
            DbAssertError::Connection(format!("invalid database URL '{}': {}", raw, e))
        })?;

        let scheme = url.scheme();
        let (dialect, driver) = match scheme.split_once('+') {
            Some((dialect, driver)) => (dialect, Some(driver.to_string())),
            None => (scheme, None),
        };

        if UNSUPPORTED_DIALECTS.contains(&dialect) {
            return Err(DbAssertError::Connection(format!(
                "dialect '{}' is not supported, only sqlite URLs can be opened",
                dialect
            )));
        }
        if dialect != "sqlite" {
            return Err(DbAssertError::Connection(format!(
                "unknown database dialect '{}' in URL '{}'",
                dialect, raw
            )));
        }

        let has_host = url.host_str().map_or(false, |h| !h.is_empty());
        if has_host || !url.username().is_empty() || url.port().is_some() {
            return Err(DbAssertError::Connection(format!(
                "sqlite URL '{}' must not name a host, use sqlite:///relative.db or sqlite:////absolute.db",
                raw
            )));
        }

        let path = url.path();
        let path = path.strip_prefix('/').unwrap_or(path);
        let path = urlencoding::decode(path).map_err(|e| {
            DbAssertError::Connection(format!("invalid path in database URL '{}': {}", raw, e))
        })?;

        let target = if path.is_empty() || path == ":memory:" {
            SqliteTarget::Memory
        } else {
            SqliteTarget::File(PathBuf::from(path.as_ref()))
        };

        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(DatabaseUrl {
            raw: raw.to_string(),
            dialect: dialect.to_string(),
            driver,
            target,
            query,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    /// Driver suffix from `dialect+driver://`, if any
    pub fn driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    pub fn target(&self) -> &SqliteTarget {
        &self.target
    }

    /// The database file, or `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        match &self.target {
            SqliteTarget::Memory => None,
            SqliteTarget::File(p) => Some(p),
        }
    }

    /// `?key=value` pairs, in URL order
    pub fn query_options(&self) -> &[(String, String)] {
        &self.query
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
