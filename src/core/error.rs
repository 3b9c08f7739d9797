/// dbassert Error Module
///
/// This module defines the error taxonomy shared by the connection, query,
/// assertion and keyword layers. Every failure surfaces immediately to the
/// caller; nothing is retried or swallowed.
use thiserror::Error;

/// Error type for every dbassert operation.
///
/// The variants a test author sees most are:
/// - `AssertionFailed` when a predicate over query results is false
/// - `NotConnected` when a keyword runs before `Connect To Database`
/// - `Connection` for malformed URLs and unreachable databases
/// - `Value` for arguments that do not parse (row-count thresholds, flags)
#[derive(Error, Debug)]
pub enum DbAssertError {
    /// Malformed URL, unsupported dialect, unknown engine option or an
    /// endpoint that could not be opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// An operation needed a connection but none is open
    #[error("No open database connection. Call 'Connect To Database' first")]
    NotConnected,

    /// A query predicate did not hold. The message is shown to the test
    /// author verbatim.
    #[error("{0}")]
    AssertionFailed(String),

    /// An argument could not be converted (e.g. a non-numeric row count)
    #[error("Value error: {0}")]
    Value(String),

    /// SQL preparation, binding or execution errors
    #[error("Query error: {0}")]
    Query(String),

    /// Other errors raised by the SQLite driver
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown keyword or keyword called with the wrong arguments
    #[error("Keyword error: {0}")]
    Keyword(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbAssertError {
    /// Returns true for failures of a query predicate, as opposed to errors
    /// that prevented the predicate from being evaluated.
    pub fn is_assertion(&self) -> bool {
        matches!(self, DbAssertError::AssertionFailed(_))
    }
}

/// Type alias for Result to use DbAssertError as the error type.
pub type Result<T> = std::result::Result<T, DbAssertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let db_err = DbAssertError::Database(rusqlite::Error::ExecuteReturnedResults);
        assert!(db_err.to_string().contains("Database error"));

        let conn_err = DbAssertError::Connection("bad url".to_string());
        assert_eq!(conn_err.to_string(), "Connection error: bad url");

        let assertion = DbAssertError::AssertionFailed("Expected rows".to_string());
        assert_eq!(assertion.to_string(), "Expected rows");
        assert!(assertion.is_assertion());

        assert!(DbAssertError::NotConnected
            .to_string()
            .contains("Connect To Database"));
        assert!(!DbAssertError::NotConnected.is_assertion());
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DbAssertError = io_err.into();
        match err {
            DbAssertError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }

        let json_err: std::result::Result<serde_json::Value, serde_json::Error> =
            serde_json::from_str("{ invalid json }");
        let err: DbAssertError = json_err.unwrap_err().into();
        match err {
            DbAssertError::Json(_) => {}
            _ => panic!("Expected JSON error"),
        }
    }
}
