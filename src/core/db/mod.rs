/// Database Module
///
/// This module provides the database layer for dbassert, organized into
/// focused submodules.
///
/// ## Architecture
///
/// - **Connection Management** (`connection.rs`, `database_url.rs`): parses connection
///   URLs and owns the single open connection
/// - **Query Execution** (`query.rs`, `params.rs`, `value.rs`): runs SQL with
///   named bindings and materializes rows of typed values
/// - **Schema Introspection** (`schema.rs`): table metadata lookups
///
/// ## Error Handling
///
/// All database operations use the standardized `DbAssertError` type.
pub mod connection;
pub mod database_url;
pub mod params;
pub mod query;
pub mod schema;
pub mod value;

pub use connection::*;
pub use database_url::*;
pub use params::*;
pub use query::*;
pub use schema::*;
pub use value::*;
