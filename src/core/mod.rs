/// Core Module for dbassert
///
/// This module contains the database plumbing the assertion and keyword
/// layers are built on: connection handling, query execution, value types,
/// schema metadata and the shared error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DbAssertError, Result};
