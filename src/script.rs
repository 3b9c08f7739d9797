//! Keyword scripts
//!
//! A script is a plain-text test table, one keyword per line:
//!
//! ```text
//! | Connect To Database         | sqlite:///:memory:                      |
//! | Execute Sql String          | create table person (id integer)        |
//! | Row Count Is 0              | select id from person                   |
//! | Disconnect From Database    |                                         |
//! ```
//!
//! Cells are separated by `|` (`\|` is a literal pipe) or, on lines without
//! pipes, by a tab or two or more spaces. Blank lines, `#` comments and
//! `***` section headers are skipped.

use crate::keywords::{KeywordLibrary, KeywordOutput};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

static SPACE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\t+|\s{2,}").expect("valid separator regex"));

/// One keyword call from a script
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    /// 1-based line number in the script
    pub line: usize,
    pub keyword: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Passed { output: KeywordOutput },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub outcome: StepOutcome,
}

/// Result of running a script. Execution stops at the first failing step,
/// so at most the last report is a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScriptReport {
    pub steps: Vec<StepReport>,
}

impl ScriptReport {
    pub fn passed(&self) -> bool {
        self.failure().is_none()
    }

    pub fn failure(&self) -> Option<&StepReport> {
        self.steps
            .iter()
            .find(|report| matches!(report.outcome, StepOutcome::Failed { .. }))
    }
}

/// Splits one line into cells, or `None` for lines without a keyword
pub fn parse_line(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("***") {
        return None;
    }

    let mut cells = if trimmed.contains('|') {
        split_pipes(trimmed)
    } else {
        SPACE_SEPARATOR
            .split(trimmed)
            .map(|cell| cell.trim().to_string())
            .collect()
    };

    while cells.last().map_or(false, String::is_empty) {
        cells.pop();
    }
    match cells.first() {
        None => None,
        Some(first) if first.is_empty() || first.starts_with('#') => None,
        Some(_) => Some(cells),
    }
}

fn split_pipes(line: &str) -> Vec<String> {
    let line = line.strip_prefix('|').unwrap_or(line);
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Parses a whole script into steps
pub fn parse_script(text: &str) -> Vec<Step> {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let mut cells = parse_line(line)?;
            let keyword = cells.remove(0);
            Some(Step {
                line: index + 1,
                keyword,
                args: cells,
            })
        })
        .collect()
}

/// Runs steps in order against `library`, stopping at the first failure
pub fn run_script(library: &mut KeywordLibrary, steps: &[Step]) -> ScriptReport {
    let mut report = ScriptReport::default();

    for step in steps {
        let outcome = match library.run_keyword(&step.keyword, &step.args) {
            Ok(output) => {
                info!(line = step.line, keyword = %step.keyword, "PASS");
                StepOutcome::Passed { output }
            }
            Err(e) => {
                warn!(line = step.line, keyword = %step.keyword, error = %e, "FAIL");
                StepOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        let failed = matches!(outcome, StepOutcome::Failed { .. });
        report.steps.push(StepReport {
            step: step.clone(),
            outcome,
        });
        if failed {
            break;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pipe_line() {
        assert_eq!(
            parse_line("| Row Count Is Equal To X | select id from person | 1 |"),
            Some(vec![
                "Row Count Is Equal To X".to_string(),
                "select id from person".to_string(),
                "1".to_string()
            ])
        );
        assert_eq!(
            parse_line("Table Should Exist | person |  | custom message"),
            Some(vec![
                "Table Should Exist".to_string(),
                "person".to_string(),
                "".to_string(),
                "custom message".to_string()
            ])
        );
        assert_eq!(
            parse_line(r"| Query | select 'a\|b' |"),
            Some(vec!["Query".to_string(), "select 'a|b'".to_string()])
        );
    }

    #[test]
    fn test_parse_space_separated_line() {
        assert_eq!(
            parse_line("Check If Exists In Database    select id from person where id = :id    id=1"),
            Some(vec![
                "Check If Exists In Database".to_string(),
                "select id from person where id = :id".to_string(),
                "id=1".to_string()
            ])
        );
        assert_eq!(
            parse_line("Disconnect From Database"),
            Some(vec!["Disconnect From Database".to_string()])
        );
    }

    #[test]
    fn test_skipped_lines() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("# setup"), None);
        assert_eq!(parse_line("| # setup |"), None);
        assert_eq!(parse_line("*** Test Cases ***"), None);
        assert_eq!(parse_line("| | |"), None);
    }

    #[test]
    fn test_parse_script_line_numbers() {
        let steps = parse_script("# comment\n| Connect To Database | sqlite:// |\n\n| Disconnect From Database |\n");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].line, 2);
        assert_eq!(steps[0].keyword, "Connect To Database");
        assert_eq!(steps[0].args, vec!["sqlite://".to_string()]);
        assert_eq!(steps[1].line, 4);
        assert!(steps[1].args.is_empty());
    }

    #[test]
    fn test_run_script_stops_at_first_failure() {
        let steps = parse_script(
            "
| Connect To Database      | sqlite://                      |
| Execute Sql String       | create table person (id integer) |
| Check If Exists In Database | select id from person       |
| Disconnect From Database |                                |
",
        );
        let mut library = KeywordLibrary::new();
        let report = run_script(&mut library, &steps);

        assert!(!report.passed());
        assert_eq!(report.steps.len(), 3);
        let failure = report.failure().unwrap();
        assert_eq!(failure.step.keyword, "Check If Exists In Database");
        match &failure.outcome {
            StepOutcome::Failed { error } => assert!(error.contains("got 0 rows")),
            other => panic!("Expected failure, got {:?}", other),
        }
        // The disconnect step never ran
        assert!(library.connection().is_connected());
    }
}
