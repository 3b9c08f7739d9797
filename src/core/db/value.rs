/// Database Value Module
///
/// Values coming out of (and going into) the database are dynamically typed.
/// `DbValue` is the tagged union the rest of the crate works with.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::Serialize;
use std::fmt;

/// One row of a result set, in projection order
pub type Row = Vec<DbValue>;

/// Timestamp layouts recognized in text columns and expected-value arguments
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A single column value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DbValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Blob(Vec<u8>),
}

impl DbValue {
    /// Converts a raw SQLite value, using the column's declared type to
    /// recover booleans and timestamps that SQLite stores as integers and text.
    pub fn from_sql_value(value: ValueRef<'_>, decl_type: Option<&str>) -> Self {
        let decl = decl_type.map(|d| d.trim().to_ascii_uppercase());
        let decl = decl.as_deref();

        match value {
            ValueRef::Null => DbValue::Null,
            ValueRef::Integer(i) => {
                if is_boolean_decl(decl) && (i == 0 || i == 1) {
                    DbValue::Boolean(i == 1)
                } else {
                    DbValue::Integer(i)
                }
            }
            ValueRef::Real(f) => DbValue::Float(f),
            ValueRef::Text(t) => {
                let text = String::from_utf8_lossy(t).into_owned();
                if is_temporal_decl(decl) {
                    match parse_datetime(&text) {
                        Some(dt) => DbValue::DateTime(dt),
                        None => DbValue::Text(text),
                    }
                } else {
                    DbValue::Text(text)
                }
            }
            ValueRef::Blob(b) => DbValue::Blob(b.to_vec()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    /// Numeric view of the value. Text is parsed, booleans count as 1 and 0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            DbValue::Integer(i) => Some(*i as f64),
            DbValue::Float(f) => Some(*f),
            DbValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            DbValue::Text(s) => s.trim().parse::<f64>().ok(),
            DbValue::Null | DbValue::DateTime(_) | DbValue::Blob(_) => None,
        }
    }

    /// Exact integer view: integers, booleans and integer text. Floats are
    /// left to [`DbValue::as_number`].
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            DbValue::Integer(i) => Some(*i),
            DbValue::Boolean(b) => Some(i64::from(*b)),
            DbValue::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Numeric equality, exact when both sides are integral.
    /// `None` when either side is not a number.
    pub fn numeric_eq(&self, other: &DbValue) -> Option<bool> {
        if let (Some(a), Some(b)) = (self.as_integer(), other.as_integer()) {
            return Some(a == b);
        }
        Some(self.as_number()? == other.as_number()?)
    }

    /// Loose equality used by the value assertions.
    ///
    /// Numbers compare numerically across Integer, Float and Boolean. When
    /// either side is text the other side is compared through its textual
    /// form, so arguments typed into a test table match typed columns.
    pub fn matches(&self, other: &DbValue) -> bool {
        use DbValue::*;

        match (self, other) {
            (Text(a), Text(b)) => a == b,
            (Text(t), v) | (v, Text(t)) => v.matches_text(t),
            (Integer(_) | Float(_) | Boolean(_), Integer(_) | Float(_) | Boolean(_)) => {
                self.numeric_eq(other).unwrap_or(false)
            }
            _ => self == other,
        }
    }

    fn matches_text(&self, text: &str) -> bool {
        match self {
            DbValue::Text(s) => s == text,
            DbValue::Null => text.eq_ignore_ascii_case("NULL") || text.eq_ignore_ascii_case("None"),
            DbValue::Boolean(b) => parse_bool(text) == Some(*b),
            DbValue::DateTime(dt) => parse_datetime(text).map_or(false, |other| other == *dt),
            // Integer columns only match integer text ("5", not "5.0")
            DbValue::Integer(i) => text.trim().parse::<i64>().map_or(false, |t| t == *i),
            DbValue::Float(x) => text.trim().parse::<f64>().map_or(false, |t| t == *x),
            _ => self.to_string() == text,
        }
    }

    /// Quoted rendering used inside failure messages
    pub fn repr(&self) -> String {
        match self {
            DbValue::Text(s) => format!("'{}'", s.replace('\'', "\\'")),
            DbValue::DateTime(_) => format!("'{}'", self),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbValue::Null => write!(f, "NULL"),
            DbValue::Integer(i) => write!(f, "{}", i),
            // 5.0, not 5
            DbValue::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            DbValue::Float(x) => write!(f, "{}", x),
            DbValue::Text(s) => write!(f, "{}", s),
            DbValue::Boolean(b) => write!(f, "{}", b),
            DbValue::DateTime(dt) => write!(f, "{}", format_datetime(dt)),
            DbValue::Blob(b) => write!(f, "<BLOB: {} bytes>", b.len()),
        }
    }
}

impl ToSql for DbValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            DbValue::Null => ToSqlOutput::Owned(Value::Null),
            DbValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            DbValue::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            DbValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            DbValue::Boolean(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            DbValue::DateTime(dt) => ToSqlOutput::Owned(Value::Text(format_datetime(dt))),
            DbValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::Text(value.to_string())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::Text(value)
    }
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        DbValue::Integer(value)
    }
}

impl From<i32> for DbValue {
    fn from(value: i32) -> Self {
        DbValue::Integer(i64::from(value))
    }
}

impl From<f64> for DbValue {
    fn from(value: f64) -> Self {
        DbValue::Float(value)
    }
}

impl From<bool> for DbValue {
    fn from(value: bool) -> Self {
        DbValue::Boolean(value)
    }
}

impl From<NaiveDateTime> for DbValue {
    fn from(value: NaiveDateTime) -> Self {
        DbValue::DateTime(value)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DbValue::Null, Into::into)
    }
}

/// Renders rows as `[(1, 'Franz Allan'), (2, 'Jerry')]`
pub fn format_rows(rows: &[Row]) -> String {
    let rendered: Vec<String> = rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = row.iter().map(DbValue::repr).collect();
            format!("({})", cells.join(", "))
        })
        .collect();
    format!("[{}]", rendered.join(", "))
}

/// Parses the boolean spellings accepted in test tables and option maps
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Parses an ISO-style timestamp or a bare date (taken as midnight)
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

fn is_boolean_decl(decl: Option<&str>) -> bool {
    matches!(decl, Some("BOOLEAN") | Some("BOOL"))
}

fn is_temporal_decl(decl: Option<&str>) -> bool {
    decl.map_or(false, |d| d.starts_with("DATE") || d.contains("TIMESTAMP"))
}
