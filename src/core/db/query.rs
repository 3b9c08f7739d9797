/// Query Execution Module
///
/// This module executes SQL with named bind parameters and materializes the
/// result rows as `DbValue`s. It is the only place the crate talks to the
/// SQLite driver for data; every call is a fresh execution, nothing is cached.

use crate::core::db::params::NamedParams;
use crate::core::db::schema;
use crate::core::db::value::{DbValue, Row};
use crate::core::{DbAssertError, Result};
use rusqlite::{Connection, Statement};
use serde::Serialize;
use tracing::{debug, info};

/// Represents the result of a SQL query execution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names from the query projection
    pub columns: Vec<String>,
    /// Rows of data, each in projection order
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Creates a new QueryResult from column names and row data
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        QueryResult { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column across all rows. Rows too short for `index`
    /// contribute `Null`.
    pub fn column(&self, index: usize) -> Vec<DbValue> {
        self.rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or(DbValue::Null))
            .collect()
    }
}

/// Capability the assertions need: run a query, look up a table.
///
/// Implemented by `QueryExecutor` for a borrowed connection and by
/// `ConnectionManager`, which fails with `NotConnected` when no connection
/// is open.
pub trait QueryRunner {
    fn query(&self, sql: &str, params: &NamedParams) -> Result<QueryResult>;

    fn table_exists(&self, table: &str, schema: Option<&str>) -> Result<bool>;
}

/// Query execution service that operates on a database connection
pub struct QueryExecutor<'a> {
    connection: &'a Connection,
    echo: bool,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new QueryExecutor for the given connection
    pub fn new(connection: &'a Connection) -> Self {
        QueryExecutor {
            connection,
            echo: false,
        }
    }

    /// Log every statement at INFO instead of DEBUG
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn connection(&self) -> &'a Connection {
        self.connection
    }

    /// Executes a SQL query and materializes every row.
    ///
    /// # Errors
    ///
    /// Returns `DbAssertError::Query` if the statement cannot be prepared,
    /// a declared bind parameter has no value, or execution fails.
    pub fn query(&self, sql: &str, params: &NamedParams) -> Result<QueryResult> {
        self.log_statement(sql, params);

        let mut stmt = self.prepare(sql)?;
        bind_named(&mut stmt, sql, params)?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let decl_types: Vec<Option<String>> = stmt
            .columns()
            .iter()
            .map(|c| c.decl_type().map(str::to_string))
            .collect();

        let mut collected = Vec::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows
            .next()
            .map_err(|e| query_error("Query execution failed", sql, e))?
        {
            let mut values = Vec::with_capacity(decl_types.len());
            for (i, decl) in decl_types.iter().enumerate() {
                let value_ref = row
                    .get_ref(i)
                    .map_err(|e| query_error("Result processing failed", sql, e))?;
                values.push(DbValue::from_sql_value(value_ref, decl.as_deref()));
            }
            collected.push(values);
        }

        debug!(rows = collected.len(), "query returned");
        Ok(QueryResult::new(columns, collected))
    }

    /// Executes a data-changing statement and returns the number of affected rows.
    pub fn execute(&self, sql: &str, params: &NamedParams) -> Result<usize> {
        self.log_statement(sql, params);

        let mut stmt = self.prepare(sql)?;
        bind_named(&mut stmt, sql, params)?;
        let affected = stmt.raw_execute().map_err(|e| match e {
            rusqlite::Error::ExecuteReturnedResults => DbAssertError::Query(format!(
                "Statement '{}' returns rows, use Query instead",
                sql
            )),
            e => query_error("Statement execution failed", sql, e),
        })?;

        debug!(affected, "statement executed");
        Ok(affected)
    }

    /// Executes several `;`-separated statements without bindings
    pub fn execute_script(&self, script: &str) -> Result<()> {
        if self.echo {
            info!(target: "dbassert::sql", "{}", script);
        } else {
            debug!(target: "dbassert::sql", "{}", script);
        }
        self.connection
            .execute_batch(script)
            .map_err(|e| DbAssertError::Query(format!("Script execution failed: {}", e)))
    }

    /// Prepares a SQL statement for execution without running it
    ///
    /// # Errors
    ///
    /// Returns `DbAssertError::Query` if the SQL statement cannot be prepared.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'a>> {
        self.connection
            .prepare(sql)
            .map_err(|e| query_error("Failed to prepare statement", sql, e))
    }

    fn log_statement(&self, sql: &str, params: &NamedParams) {
        let kind = StatementType::from_sql(sql);
        if self.echo {
            info!(target: "dbassert::sql", ?kind, "{} {}", sql, params);
        } else {
            debug!(target: "dbassert::sql", ?kind, "{} {}", sql, params);
        }
    }
}

impl QueryRunner for QueryExecutor<'_> {
    fn query(&self, sql: &str, params: &NamedParams) -> Result<QueryResult> {
        QueryExecutor::query(self, sql, params)
    }

    fn table_exists(&self, table: &str, schema_name: Option<&str>) -> Result<bool> {
        schema::table_exists(self.connection, table, schema_name)
    }
}

/// Binds every named placeholder the statement declares from `params`.
fn bind_named(stmt: &mut Statement<'_>, sql: &str, params: &NamedParams) -> Result<()> {
    let mut referenced = Vec::new();

    for index in 1..=stmt.parameter_count() {
        let name = match stmt.parameter_name(index) {
            Some(name) if !name.starts_with('?') => name.to_string(),
            _ => {
                return Err(DbAssertError::Query(format!(
                    "Positional parameter #{} in '{}' is not supported, use :name placeholders",
                    index, sql
                )))
            }
        };
        let value = params.get(&name).ok_or_else(|| {
            DbAssertError::Query(format!(
                "No value supplied for bind parameter {} in '{}'",
                name, sql
            ))
        })?;
        stmt.raw_bind_parameter(index, value)
            .map_err(|e| query_error("Failed to bind parameter", sql, e))?;
        referenced.push(name);
    }

    for (name, _) in params.iter() {
        if !referenced.iter().any(|r| &r[1..] == name) {
            debug!(parameter = name, "binding not referenced by statement");
        }
    }
    Ok(())
}

fn query_error(context: &str, sql: &str, e: rusqlite::Error) -> DbAssertError {
    DbAssertError::Query(format!("{} '{}': {}", context, sql, e))
}

/// Represents different SQL statement types for introspection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementType {
    /// SELECT statement
    Select,
    /// WITH ... (common table expression)
    With,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// CREATE statement
    Create,
    /// DROP statement
    Drop,
    /// ALTER statement
    Alter,
    /// PRAGMA statement
    Pragma,
    /// BEGIN/COMMIT/ROLLBACK transaction commands
    Transaction,
    /// Other statement types
    Other,
}

impl StatementType {
    /// Determines the statement type from a SQL string
    pub fn from_sql(sql: &str) -> Self {
        let sql_upper = sql.trim().to_uppercase();
        let first = sql_upper.split_whitespace().next().unwrap_or("");

        match first {
            "SELECT" | "VALUES" => StatementType::Select,
            "WITH" => StatementType::With,
            "INSERT" | "REPLACE" => StatementType::Insert,
            "UPDATE" => StatementType::Update,
            "DELETE" => StatementType::Delete,
            "CREATE" => StatementType::Create,
            "DROP" => StatementType::Drop,
            "ALTER" => StatementType::Alter,
            "PRAGMA" => StatementType::Pragma,
            "BEGIN" | "COMMIT" | "ROLLBACK" | "END" | "SAVEPOINT" | "RELEASE" => {
                StatementType::Transaction
            }
            _ => StatementType::Other,
        }
    }
}
