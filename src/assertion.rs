//! Query assertions
//!
//! Each assertion runs one statement through a [`QueryRunner`] and checks a
//! predicate over the materialized rows. A false predicate is returned as
//! `DbAssertError::AssertionFailed` with the statement and the observed data
//! in the message.
//!
//! Row counts are always the length of the fully materialized result; a
//! statement is never rewritten into `SELECT COUNT(*)`.

use crate::core::db::{format_rows, DbValue, NamedParams, QueryRunner};
use crate::core::{DbAssertError, Result};
use tracing::{debug, warn};

/// Fails unless `select_statement` returns at least one row.
pub fn check_if_exists_in_database<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    params: &NamedParams,
) -> Result<()> {
    let result = runner.query(select_statement, params)?;
    if result.is_empty() {
        return Err(DbAssertError::AssertionFailed(format!(
            "Expected to have at least one row from '{}' but got 0 rows.",
            select_statement
        )));
    }
    Ok(())
}

/// Fails if `select_statement` returns any row; the rows are listed in the
/// failure message.
pub fn check_if_not_exists_in_database<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    params: &NamedParams,
) -> Result<()> {
    let result = runner.query(select_statement, params)?;
    if !result.is_empty() {
        return Err(DbAssertError::AssertionFailed(format!(
            "Expected to have no rows from '{}' but got some rows : {}.",
            select_statement,
            format_rows(&result.rows)
        )));
    }
    Ok(())
}

/// Number of rows `select_statement` returns, counted after materializing them.
pub fn row_count<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    params: &NamedParams,
) -> Result<usize> {
    let count = runner.query(select_statement, params)?.row_count();
    debug!(count, "row count");
    Ok(count)
}

pub fn row_count_is_0<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    params: &NamedParams,
) -> Result<()> {
    let num_rows = row_count(runner, select_statement, params)?;
    if num_rows > 0 {
        return Err(DbAssertError::AssertionFailed(format!(
            "Expected zero rows to be returned from '{}' but got rows back. Number of rows returned was {}",
            select_statement, num_rows
        )));
    }
    Ok(())
}

pub fn row_count_is_equal_to_x<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    num_rows: &str,
    params: &NamedParams,
) -> Result<()> {
    let expected = parse_row_count(num_rows)?;
    let actual = row_count(runner, select_statement, params)? as i64;
    if actual != expected {
        return Err(DbAssertError::AssertionFailed(format!(
            "Expected same number of rows to be returned from '{}' than the returned rows of {}",
            select_statement, actual
        )));
    }
    Ok(())
}

pub fn row_count_is_greater_than_x<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    num_rows: &str,
    params: &NamedParams,
) -> Result<()> {
    let threshold = parse_row_count(num_rows)?;
    let actual = row_count(runner, select_statement, params)? as i64;
    if actual <= threshold {
        return Err(DbAssertError::AssertionFailed(format!(
            "Expected more rows to be returned from '{}' than the returned rows of {}",
            select_statement, actual
        )));
    }
    Ok(())
}

pub fn row_count_is_less_than_x<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    num_rows: &str,
    params: &NamedParams,
) -> Result<()> {
    let threshold = parse_row_count(num_rows)?;
    let actual = row_count(runner, select_statement, params)? as i64;
    if actual >= threshold {
        return Err(DbAssertError::AssertionFailed(format!(
            "Expected less rows to be returned from '{}' than the returned rows of {}",
            select_statement, actual
        )));
    }
    Ok(())
}

/// Parses a row-count threshold typed into a test table
pub fn parse_row_count(text: &str) -> Result<i64> {
    text.trim().parse::<i64>().map_err(|_| {
        DbAssertError::Value(format!("invalid row count '{}', expected an integer", text))
    })
}

/// Fails unless `table` exists in `schema` (default schema when `None`).
/// `message` is appended to the failure message.
pub fn table_should_exist<R: QueryRunner + ?Sized>(
    runner: &R,
    table: &str,
    schema: Option<&str>,
    message: Option<&str>,
) -> Result<()> {
    if runner.table_exists(table, schema)? {
        return Ok(());
    }

    let name = match schema {
        Some(schema) => format!("{}.{}", schema, table),
        None => table.to_string(),
    };
    let mut failure = format!("Table '{}' does not exist in the db", name);
    if let Some(message) = message {
        failure.push_str(": ");
        failure.push_str(message);
    }
    Err(DbAssertError::AssertionFailed(failure))
}

#[deprecated(note = "use table_should_exist")]
pub fn table_must_exist<R: QueryRunner + ?Sized>(
    runner: &R,
    table: &str,
    schema: Option<&str>,
    message: Option<&str>,
) -> Result<()> {
    warn!("'Table Must Exist' is deprecated, use 'Table Should Exist'");
    table_should_exist(runner, table, schema, message)
}

/// Returns the first column of every row.
///
/// When `expected` is non-empty the column must hold exactly those values
/// in any order (duplicates count).
pub fn query_for_single_column<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    expected: &[DbValue],
    params: &NamedParams,
) -> Result<Vec<DbValue>> {
    let values = runner.query(select_statement, params)?.column(0);
    if expected.is_empty() {
        return Ok(values);
    }

    if let Some(wanted) = unpaired_expected(&values, expected) {
        return Err(DbAssertError::AssertionFailed(format!(
            "Expected value {} not found in column from '{}': {}",
            wanted.repr(),
            select_statement,
            format_values(&values)
        )));
    }

    if values.len() != expected.len() {
        return Err(DbAssertError::AssertionFailed(format!(
            "Expected {} values from '{}' but got {}: {}",
            expected.len(),
            select_statement,
            values.len(),
            format_values(&values)
        )));
    }
    Ok(values)
}

/// Returns the only value of a one-row, one-column result, optionally
/// checking it against `expected`.
pub fn query_for_single_value<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    expected: Option<&DbValue>,
    message: Option<&str>,
    params: &NamedParams,
) -> Result<DbValue> {
    let value = single_value(runner, select_statement, params)?;
    if let Some(expected) = expected {
        if !value.matches(expected) {
            return Err(mismatch(select_statement, message, &value, expected));
        }
    }
    Ok(value)
}

/// Like [`query_for_single_value`], comparing numerically (`"5"` equals `5`).
///
/// # Errors
///
/// `DbAssertError::Value` when an expected value is given and either side is
/// not a number.
pub fn query_for_single_number<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    expected: Option<&DbValue>,
    message: Option<&str>,
    params: &NamedParams,
) -> Result<DbValue> {
    let value = single_value(runner, select_statement, params)?;
    if let Some(expected) = expected {
        if value.as_number().is_none() {
            return Err(DbAssertError::Value(format!(
                "value {} from '{}' is not a number",
                value.repr(),
                select_statement
            )));
        }
        let equal = value.numeric_eq(expected).ok_or_else(|| {
            DbAssertError::Value(format!("expected value {} is not a number", expected.repr()))
        })?;
        if !equal {
            return Err(mismatch(select_statement, message, &value, expected));
        }
    }
    Ok(value)
}

/// Alias of [`query_for_single_number`] for `SELECT COUNT(*)` style queries
pub fn query_for_count<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    expected: Option<&DbValue>,
    message: Option<&str>,
    params: &NamedParams,
) -> Result<DbValue> {
    query_for_single_number(runner, select_statement, expected, message, params)
}

fn single_value<R: QueryRunner + ?Sized>(
    runner: &R,
    select_statement: &str,
    params: &NamedParams,
) -> Result<DbValue> {
    let result = runner.query(select_statement, params)?;
    if result.row_count() != 1 {
        return Err(DbAssertError::AssertionFailed(format!(
            "Expected exactly one row from '{}' but got {}",
            select_statement,
            result.row_count()
        )));
    }

    let mut row = result.rows.into_iter().next().unwrap_or_default();
    if row.len() != 1 {
        return Err(DbAssertError::AssertionFailed(format!(
            "Expected exactly one column from '{}' but got {}",
            select_statement,
            row.len()
        )));
    }
    Ok(row.remove(0))
}

/// Pairs each expected value with its own matching row value (augmenting
/// paths, so an early loose match can be moved to make room for a later one).
/// Returns the first expected value left without a partner.
fn unpaired_expected<'a>(values: &[DbValue], expected: &'a [DbValue]) -> Option<&'a DbValue> {
    let mut partner: Vec<Option<usize>> = vec![None; values.len()];
    for (index, wanted) in expected.iter().enumerate() {
        let mut visited = vec![false; values.len()];
        if !place(index, values, expected, &mut partner, &mut visited) {
            return Some(wanted);
        }
    }
    None
}

fn place(
    index: usize,
    values: &[DbValue],
    expected: &[DbValue],
    partner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for (slot, value) in values.iter().enumerate() {
        if visited[slot] || !value.matches(&expected[index]) {
            continue;
        }
        visited[slot] = true;
        let free = match partner[slot] {
            None => true,
            Some(other) => place(other, values, expected, partner, visited),
        };
        if free {
            partner[slot] = Some(index);
            return true;
        }
    }
    false
}

fn mismatch(
    select_statement: &str,
    message: Option<&str>,
    actual: &DbValue,
    expected: &DbValue,
) -> DbAssertError {
    let prefix = match message {
        Some(message) => message.to_string(),
        None => format!("Unexpected value from '{}'", select_statement),
    };
    DbAssertError::AssertionFailed(format!("{}: {} != {}", prefix, actual, expected))
}

fn format_values(values: &[DbValue]) -> String {
    let rendered: Vec<String> = values.iter().map(DbValue::repr).collect();
    format!("[{}]", rendered.join(", "))
}
