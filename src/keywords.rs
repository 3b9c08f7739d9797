//! Keyword surface
//!
//! Test tables hand every argument over as text. `KeywordLibrary` maps the
//! public keyword names onto the connection, query and assertion layers and
//! turns those text cells into typed arguments: positional cells in order,
//! plus `name=value` cells for bind parameters and options.

use crate::assertion;
use crate::config::Config;
use crate::core::db::{format_rows, ConnectOptions, ConnectionManager, DbValue, NamedParams, QueryResult, QueryRunner};
use crate::core::{DbAssertError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::fs;
use tracing::debug;

/// A cell that starts with an identifier followed by `=` is a named argument
static NAMED_ARG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)=(.*)$").expect("valid named-argument regex"));

/// The public keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    ConnectToDatabase,
    DisconnectFromDatabase,
    Query,
    ExecuteSqlString,
    ExecuteSqlScript,
    CheckIfExistsInDatabase,
    CheckIfNotExistsInDatabase,
    RowCountIs0,
    RowCountIsEqualToX,
    RowCountIsGreaterThanX,
    RowCountIsLessThanX,
    TableShouldExist,
    TableMustExist,
    QueryForSingleColumn,
    QueryForSingleValue,
    QueryForSingleNumber,
    QueryForCount,
}

impl Keyword {
    pub const ALL: [Keyword; 17] = [
        Keyword::ConnectToDatabase,
        Keyword::DisconnectFromDatabase,
        Keyword::Query,
        Keyword::ExecuteSqlString,
        Keyword::ExecuteSqlScript,
        Keyword::CheckIfExistsInDatabase,
        Keyword::CheckIfNotExistsInDatabase,
        Keyword::RowCountIs0,
        Keyword::RowCountIsEqualToX,
        Keyword::RowCountIsGreaterThanX,
        Keyword::RowCountIsLessThanX,
        Keyword::TableShouldExist,
        Keyword::TableMustExist,
        Keyword::QueryForSingleColumn,
        Keyword::QueryForSingleValue,
        Keyword::QueryForSingleNumber,
        Keyword::QueryForCount,
    ];

    /// Display name as written in test tables
    pub fn name(self) -> &'static str {
        match self {
            Keyword::ConnectToDatabase => "Connect To Database",
            Keyword::DisconnectFromDatabase => "Disconnect From Database",
            Keyword::Query => "Query",
            Keyword::ExecuteSqlString => "Execute Sql String",
            Keyword::ExecuteSqlScript => "Execute Sql Script",
            Keyword::CheckIfExistsInDatabase => "Check If Exists In Database",
            Keyword::CheckIfNotExistsInDatabase => "Check If Not Exists In Database",
            Keyword::RowCountIs0 => "Row Count Is 0",
            Keyword::RowCountIsEqualToX => "Row Count Is Equal To X",
            Keyword::RowCountIsGreaterThanX => "Row Count Is Greater Than X",
            Keyword::RowCountIsLessThanX => "Row Count Is Less Than X",
            Keyword::TableShouldExist => "Table Should Exist",
            Keyword::TableMustExist => "Table Must Exist",
            Keyword::QueryForSingleColumn => "Query For Single Column",
            Keyword::QueryForSingleValue => "Query For Single Value",
            Keyword::QueryForSingleNumber => "Query For Single Number",
            Keyword::QueryForCount => "Query For Count",
        }
    }

    /// Looks a keyword up by name, ignoring case, spaces and underscores
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = normalize(name);
        Keyword::ALL
            .iter()
            .copied()
            .find(|keyword| normalize(keyword.name()) == wanted)
    }

    pub fn is_deprecated(self) -> bool {
        self == Keyword::TableMustExist
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// What a keyword hands back to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum KeywordOutput {
    None,
    Rows(QueryResult),
    Value(DbValue),
    Values(Vec<DbValue>),
    Affected(usize),
}

impl fmt::Display for KeywordOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywordOutput::None => Ok(()),
            KeywordOutput::Rows(result) => f.write_str(&format_rows(&result.rows)),
            KeywordOutput::Value(value) => write!(f, "{}", value),
            KeywordOutput::Values(values) => {
                let rendered: Vec<String> = values.iter().map(DbValue::repr).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            KeywordOutput::Affected(n) => write!(f, "{} row(s) affected", n),
        }
    }
}

/// Text arguments of one keyword call, split into positional and named cells
#[derive(Debug, Default)]
struct KeywordArgs {
    keyword: Option<Keyword>,
    positional: Vec<String>,
    named: Vec<(String, String)>,
}

impl KeywordArgs {
    fn parse(keyword: Keyword, args: &[String]) -> Self {
        let mut parsed = KeywordArgs {
            keyword: Some(keyword),
            ..KeywordArgs::default()
        };
        for arg in args {
            match NAMED_ARG.captures(arg) {
                Some(caps) => parsed.named.push((caps[1].to_string(), caps[2].to_string())),
                None => parsed.positional.push(arg.replace("\\=", "=")),
            }
        }
        parsed
    }

    fn keyword_name(&self) -> &'static str {
        self.keyword.map_or("keyword", Keyword::name)
    }

    fn required(&self, index: usize, what: &str) -> Result<String> {
        self.positional.get(index).cloned().ok_or_else(|| {
            DbAssertError::Keyword(format!(
                "'{}' requires argument '{}'",
                self.keyword_name(),
                what
            ))
        })
    }

    fn optional(&self, index: usize) -> Option<String> {
        self.positional.get(index).cloned()
    }

    /// Removes and returns the first named argument matching one of `names`
    fn take_named(&mut self, names: &[&str]) -> Option<String> {
        let index = self
            .named
            .iter()
            .position(|(name, _)| names.iter().any(|n| n.eq_ignore_ascii_case(name)))?;
        Some(self.named.remove(index).1)
    }

    fn max_positional(&self, max: usize) -> Result<()> {
        if self.positional.len() > max {
            return Err(DbAssertError::Keyword(format!(
                "'{}' expects at most {} positional argument(s), got {}",
                self.keyword_name(),
                max,
                self.positional.len()
            )));
        }
        Ok(())
    }

    fn no_named(&self) -> Result<()> {
        match self.named.first() {
            Some((name, _)) => Err(DbAssertError::Keyword(format!(
                "'{}' got unexpected named argument '{}'",
                self.keyword_name(),
                name
            ))),
            None => Ok(()),
        }
    }

    /// Remaining named cells become bind parameters (values bound as text)
    fn into_params(self) -> NamedParams {
        self.named.into_iter().collect()
    }
}

/// Keyword dispatcher owning the connection of one test run.
#[derive(Debug, Default)]
pub struct KeywordLibrary {
    connection: ConnectionManager,
    default_url: Option<String>,
    default_options: ConnectOptions,
}

impl KeywordLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the configured URL and options as defaults for `Connect To Database`
    pub fn with_config(config: &Config) -> Self {
        let mut library = Self::default();
        if let Some(connection) = &config.connection {
            library.default_url = connection.url.clone();
            library.default_options = connection.options.clone();
        }
        library
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn keyword_names() -> Vec<&'static str> {
        Keyword::ALL.iter().map(|k| k.name()).collect()
    }

    /// Runs a keyword by name with text arguments.
    ///
    /// # Errors
    ///
    /// `DbAssertError::Keyword` for an unknown keyword or missing arguments,
    /// otherwise whatever the underlying operation raises.
    pub fn run_keyword(&mut self, name: &str, args: &[String]) -> Result<KeywordOutput> {
        let keyword = Keyword::from_name(name)
            .ok_or_else(|| DbAssertError::Keyword(format!("No keyword with name '{}' found", name)))?;
        debug!(keyword = keyword.name(), ?args, "running keyword");

        let args = KeywordArgs::parse(keyword, args);
        match keyword {
            Keyword::ConnectToDatabase => self.connect(args),
            Keyword::DisconnectFromDatabase => {
                args.max_positional(0)?;
                args.no_named()?;
                self.connection.disconnect()?;
                Ok(KeywordOutput::None)
            }
            Keyword::Query => {
                args.max_positional(1)?;
                let sql = args.required(0, "select_statement")?;
                let result = self.connection.query(&sql, &args.into_params())?;
                Ok(KeywordOutput::Rows(result))
            }
            Keyword::ExecuteSqlString => {
                args.max_positional(1)?;
                let sql = args.required(0, "sql_string")?;
                let affected = self.connection.executor()?.execute(&sql, &args.into_params())?;
                Ok(KeywordOutput::Affected(affected))
            }
            Keyword::ExecuteSqlScript => {
                args.max_positional(1)?;
                args.no_named()?;
                let path = args.required(0, "sql_script_file")?;
                let executor = self.connection.executor()?;
                let script = fs::read_to_string(&path)?;
                executor.execute_script(&script)?;
                Ok(KeywordOutput::None)
            }
            Keyword::CheckIfExistsInDatabase => {
                args.max_positional(1)?;
                let sql = args.required(0, "select_statement")?;
                assertion::check_if_exists_in_database(&self.connection, &sql, &args.into_params())?;
                Ok(KeywordOutput::None)
            }
            Keyword::CheckIfNotExistsInDatabase => {
                args.max_positional(1)?;
                let sql = args.required(0, "select_statement")?;
                assertion::check_if_not_exists_in_database(&self.connection, &sql, &args.into_params())?;
                Ok(KeywordOutput::None)
            }
            Keyword::RowCountIs0 => {
                args.max_positional(1)?;
                let sql = args.required(0, "select_statement")?;
                assertion::row_count_is_0(&self.connection, &sql, &args.into_params())?;
                Ok(KeywordOutput::None)
            }
            Keyword::RowCountIsEqualToX
            | Keyword::RowCountIsGreaterThanX
            | Keyword::RowCountIsLessThanX => {
                args.max_positional(2)?;
                let sql = args.required(0, "select_statement")?;
                let num_rows = args.required(1, "num_rows")?;
                let params = args.into_params();
                let check: fn(&ConnectionManager, &str, &str, &NamedParams) -> Result<()> = match keyword {
                    Keyword::RowCountIsEqualToX => assertion::row_count_is_equal_to_x,
                    Keyword::RowCountIsGreaterThanX => assertion::row_count_is_greater_than_x,
                    _ => assertion::row_count_is_less_than_x,
                };
                check(&self.connection, &sql, &num_rows, &params)?;
                Ok(KeywordOutput::None)
            }
            Keyword::TableShouldExist | Keyword::TableMustExist => {
                self.table_exists(keyword, args)?;
                Ok(KeywordOutput::None)
            }
            Keyword::QueryForSingleColumn => {
                let sql = args.required(0, "select_statement")?;
                let expected: Vec<DbValue> = args
                    .positional
                    .iter()
                    .skip(1)
                    .map(|v| DbValue::from(v.as_str()))
                    .collect();
                let values = assertion::query_for_single_column(
                    &self.connection,
                    &sql,
                    &expected,
                    &args.into_params(),
                )?;
                Ok(KeywordOutput::Values(values))
            }
            Keyword::QueryForSingleValue | Keyword::QueryForSingleNumber | Keyword::QueryForCount => {
                self.single_value(keyword, args)
            }
        }
    }

    fn connect(&mut self, args: KeywordArgs) -> Result<KeywordOutput> {
        args.max_positional(1)?;
        let url = match args.optional(0).or_else(|| self.default_url.clone()) {
            Some(url) => url,
            None => {
                return Err(DbAssertError::Keyword(
                    "'Connect To Database' needs a URL when none is configured".to_string(),
                ))
            }
        };

        let mut options = self.default_options.clone();
        for (key, value) in &args.named {
            options.set(key, value)?;
        }
        self.connection.connect(&url, &options)?;
        Ok(KeywordOutput::None)
    }

    #[allow(deprecated)]
    fn table_exists(&self, keyword: Keyword, mut args: KeywordArgs) -> Result<()> {
        let schema = args.take_named(&["schema", "schema_name"]).or_else(|| args.optional(1));
        let message = args.take_named(&["message", "msg"]).or_else(|| args.optional(2));
        args.max_positional(3)?;
        args.no_named()?;

        let table = args.required(0, "table_name")?;
        let schema = schema.filter(|s| !s.is_empty());
        let message = message.filter(|m| !m.is_empty());

        if keyword.is_deprecated() {
            assertion::table_must_exist(&self.connection, &table, schema.as_deref(), message.as_deref())
        } else {
            assertion::table_should_exist(&self.connection, &table, schema.as_deref(), message.as_deref())
        }
    }

    fn single_value(&self, keyword: Keyword, mut args: KeywordArgs) -> Result<KeywordOutput> {
        let expected = args
            .take_named(&["expected", "expected_value"])
            .or_else(|| args.optional(1));
        let message = args.take_named(&["message", "msg"]).or_else(|| args.optional(2));
        args.max_positional(3)?;

        let sql = args.required(0, "select_statement")?;
        let expected = expected.map(DbValue::from);
        let params = args.into_params();

        let value = match keyword {
            Keyword::QueryForSingleValue => assertion::query_for_single_value(
                &self.connection,
                &sql,
                expected.as_ref(),
                message.as_deref(),
                &params,
            )?,
            Keyword::QueryForCount => assertion::query_for_count(
                &self.connection,
                &sql,
                expected.as_ref(),
                message.as_deref(),
                &params,
            )?,
            _ => assertion::query_for_single_number(
                &self.connection,
                &sql,
                expected.as_ref(),
                message.as_deref(),
                &params,
            )?,
        };
        Ok(KeywordOutput::Value(value))
    }
}
