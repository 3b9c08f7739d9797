/// Schema Introspection Module
///
/// Metadata lookups against `sqlite_master`. In SQLite a "schema" is an
/// attached database name (`main`, `temp`, or an `ATTACH ... AS name` alias).

use crate::core::Result;
use rusqlite::{Connection, OptionalExtension};

const DEFAULT_SCHEMA: &str = "main";

/// Checks whether a table or view exists in the given schema (default `main`).
///
/// A schema that is not attached yields `false` rather than an error.
pub fn table_exists(conn: &Connection, table: &str, schema: Option<&str>) -> Result<bool> {
    let schema = schema.unwrap_or(DEFAULT_SCHEMA);
    if !schema_attached(conn, schema)? {
        return Ok(false);
    }

    let sql = format!(
        "SELECT 1 FROM {}.sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
        quote_identifier(schema)
    );
    let found = conn
        .query_row(&sql, [table], |_| Ok(()))
        .optional()?
        .is_some();
    Ok(found)
}

/// Lists user tables of a schema (default `main`), sorted by name
pub fn list_tables(conn: &Connection, schema: Option<&str>) -> Result<Vec<String>> {
    let schema = schema.unwrap_or(DEFAULT_SCHEMA);
    let sql = format!(
        "SELECT name FROM {}.sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
        quote_identifier(schema)
    );

    let mut stmt = conn.prepare(&sql)?;
    let table_iter = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut tables = Vec::new();
    for table_result in table_iter {
        tables.push(table_result?);
    }
    Ok(tables)
}

fn schema_attached(conn: &Connection, schema: &str) -> Result<bool> {
    let mut stmt = conn.prepare("PRAGMA database_list")?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;

    for name in names {
        if name?.eq_ignore_ascii_case(schema) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
