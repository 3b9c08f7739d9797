/// Connection Management Module
///
/// This module owns the single database connection of a library instance:
/// opening it from a connection URL and engine options, handing it to query
/// execution, and closing it.

use crate::core::db::database_url::{DatabaseUrl, SqliteTarget};
use crate::core::db::params::NamedParams;
use crate::core::db::query::{QueryExecutor, QueryResult, QueryRunner};
use crate::core::db::schema;
use crate::core::db::value::parse_bool;
use crate::core::{DbAssertError, Result};
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// Engine options applied when a connection is opened
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// Log every statement and its bindings at INFO
    pub echo: bool,
    /// Open the database read-only
    pub read_only: bool,
    /// Create the database file when it does not exist
    pub create: bool,
    /// How long SQLite waits on a locked database before failing
    pub busy_timeout_ms: Option<u64>,
    /// Value for `PRAGMA foreign_keys`
    pub foreign_keys: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            echo: false,
            read_only: false,
            create: true,
            busy_timeout_ms: None,
            foreign_keys: true,
        }
    }
}

impl ConnectOptions {
    /// Builds options from text pairs, starting from the defaults
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = ConnectOptions::default();
        for (key, value) in pairs {
            options.set(key.as_ref(), value.as_ref())?;
        }
        Ok(options)
    }

    /// Sets one option from its text form.
    ///
    /// Besides the field names this accepts the SQLite URL spellings
    /// `mode=ro|rw|rwc` and `timeout=<seconds>`.
    ///
    /// # Errors
    ///
    /// `DbAssertError::Value` for a malformed value, `DbAssertError::Connection`
    /// for an unknown key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.to_ascii_lowercase().as_str() {
            "echo" => self.echo = flag(key, value)?,
            "read_only" | "readonly" => self.read_only = flag(key, value)?,
            "create" => self.create = flag(key, value)?,
            "foreign_keys" => self.foreign_keys = flag(key, value)?,
            "busy_timeout_ms" => {
                let ms = value.trim().parse::<u64>().map_err(|_| {
                    DbAssertError::Value(format!("'{}' expects milliseconds, got '{}'", key, value))
                })?;
                self.busy_timeout_ms = Some(ms);
            }
            "timeout" => {
                let secs = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite() && *s >= 0.0)
                    .ok_or_else(|| {
                        DbAssertError::Value(format!("'timeout' expects seconds, got '{}'", value))
                    })?;
                self.busy_timeout_ms = Some((secs * 1000.0).round() as u64);
            }
            "mode" => match value.trim() {
                "ro" => self.read_only = true,
                "rw" => {
                    self.read_only = false;
                    self.create = false;
                }
                "rwc" => {
                    self.read_only = false;
                    self.create = true;
                }
                other => {
                    return Err(DbAssertError::Value(format!(
                        "'mode' expects ro, rw or rwc, got '{}'",
                        other
                    )))
                }
            },
            _ => {
                return Err(DbAssertError::Connection(format!(
                    "unrecognized engine option '{}'",
                    key
                )))
            }
        }
        Ok(())
    }

    fn open_flags(&self) -> OpenFlags {
        let base = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else if self.create {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        base | OpenFlags::SQLITE_OPEN_NO_MUTEX
    }
}

fn flag(key: &str, value: &str) -> Result<bool> {
    parse_bool(value).ok_or_else(|| {
        DbAssertError::Value(format!("'{}' expects a boolean, got '{}'", key, value))
    })
}

/// The open connection and what it was opened with
#[derive(Debug)]
struct ActiveConnection {
    connection: Connection,
    url: DatabaseUrl,
    options: ConnectOptions,
}

/// Connection manager holding at most one open connection.
///
/// There is no global state: whoever runs the keywords owns the manager and
/// passes it (or a `QueryRunner` borrowed from it) to the assertions.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    active: Option<ActiveConnection>,
}

impl ConnectionManager {
    /// Creates a manager with no open connection
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a connection to the database named by `url`.
    ///
    /// Query options in the URL are applied on top of `options`. An already
    /// open connection is replaced (and closed when dropped).
    ///
    /// # Examples
    ///
    /// ```
    /// use dbassert::core::db::{ConnectOptions, ConnectionManager};
    ///
    /// let mut manager = ConnectionManager::new();
    /// manager.connect("sqlite:///:memory:", &ConnectOptions::default()).unwrap();
    /// assert!(manager.is_connected());
    /// ```
    pub fn connect(&mut self, url: &str, options: &ConnectOptions) -> Result<()> {
        let url = DatabaseUrl::parse(url)?;

        let mut options = options.clone();
        for (key, value) in url.query_options() {
            options.set(key, value)?;
        }

        let flags = options.open_flags();
        let opened = match url.target() {
            SqliteTarget::Memory => Connection::open_in_memory_with_flags(flags),
            SqliteTarget::File(path) => Connection::open_with_flags(path, flags),
        };
        let connection = opened.map_err(|e| {
            DbAssertError::Connection(format!("could not open '{}': {}", url, e))
        })?;

        connection
            .pragma_update(None, "foreign_keys", options.foreign_keys)
            .map_err(|e| DbAssertError::Connection(format!("could not configure '{}': {}", url, e)))?;
        if let Some(ms) = options.busy_timeout_ms {
            connection
                .busy_timeout(Duration::from_millis(ms))
                .map_err(|e| DbAssertError::Connection(format!("could not configure '{}': {}", url, e)))?;
        }

        if let Some(previous) = self.active.take() {
            warn!(
                url = %previous.url,
                "replacing an open connection that was not disconnected"
            );
        }

        info!(url = %url, read_only = options.read_only, "connected to database");
        self.active = Some(ActiveConnection {
            connection,
            url,
            options,
        });
        Ok(())
    }

    /// Closes the current connection.
    ///
    /// # Errors
    ///
    /// `DbAssertError::NotConnected` if no connection is open.
    pub fn disconnect(&mut self) -> Result<()> {
        let active = self.active.take().ok_or(DbAssertError::NotConnected)?;
        let url = active.url;
        active.connection.close().map_err(|(_, e)| {
            DbAssertError::Connection(format!("could not close '{}': {}", url, e))
        })?;
        info!(url = %url, "disconnected from database");
        Ok(())
    }

    /// Checks if there's an active database connection
    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    /// URL of the open connection
    pub fn url(&self) -> Option<&DatabaseUrl> {
        self.active.as_ref().map(|a| &a.url)
    }

    /// Options the open connection was opened with
    pub fn options(&self) -> Option<&ConnectOptions> {
        self.active.as_ref().map(|a| &a.options)
    }

    /// Name of the driver behind the open connection
    pub fn driver_name(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|a| a.url.driver().unwrap_or("rusqlite"))
    }

    /// The open connection, or `NotConnected`
    pub fn connection(&self) -> Result<&Connection> {
        self.active
            .as_ref()
            .map(|a| &a.connection)
            .ok_or(DbAssertError::NotConnected)
    }

    /// A query executor over the open connection, honoring `echo`
    pub fn executor(&self) -> Result<QueryExecutor<'_>> {
        let active = self.active.as_ref().ok_or(DbAssertError::NotConnected)?;
        Ok(QueryExecutor::new(&active.connection).with_echo(active.options.echo))
    }
}

impl QueryRunner for ConnectionManager {
    fn query(&self, sql: &str, params: &NamedParams) -> Result<QueryResult> {
        self.executor()?.query(sql, params)
    }

    fn table_exists(&self, table: &str, schema_name: Option<&str>) -> Result<bool> {
        schema::table_exists(self.connection()?, table, schema_name)
    }
}
