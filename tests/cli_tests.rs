//! Command-line tests for `dbassert run` and `dbassert keywords`

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PASSING_SCRIPT: &str = "\
*** Test Cases ***
# set up a person table
| Connect To Database         | sqlite:///:memory:                                   |
| Execute Sql String          | CREATE TABLE person (id INTEGER, first_name TEXT)    |
| Execute Sql String          | INSERT INTO person VALUES (1, 'Franz Allan')         |
| Check If Exists In Database | SELECT id FROM person WHERE first_name = :name | name=Franz Allan |
| Row Count Is Equal To X     | SELECT * FROM person                                 | 1 |
| Table Should Exist          | person                                               |
| Query For Single Value      | SELECT first_name FROM person                        | Franz Allan |
| Disconnect From Database    |                                                      |
";

const FAILING_SCRIPT: &str = "\
| Connect To Database       | sqlite:// |
| Execute Sql String        | CREATE TABLE person (id INTEGER) |
| Table Should Exist        | ghost_table |
| Disconnect From Database  |           |
";

/// Writes the script and an empty config into a temp dir
fn setup(script: &str) -> (TempDir, String, String) {
    let dir = tempfile::tempdir().unwrap();
    let script_path = dir.path().join("checks.robot");
    let config_path = dir.path().join("config.toml");
    fs::write(&script_path, script).unwrap();
    fs::write(&config_path, "").unwrap();
    (
        dir,
        script_path.to_string_lossy().to_string(),
        config_path.to_string_lossy().to_string(),
    )
}

fn dbassert(config: &str) -> Command {
    let mut cmd = Command::cargo_bin("dbassert").unwrap();
    cmd.env_remove("RUST_LOG").arg("--config").arg(config);
    cmd
}

#[test]
fn test_run_passing_script() {
    let (_dir, script, config) = setup(PASSING_SCRIPT);

    dbassert(&config)
        .arg("run")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS  line 6: Check If Exists In Database"))
        .stdout(predicate::str::contains("=> Franz Allan"))
        .stdout(predicate::str::contains("8 of 8 step(s) passed"));
}

#[test]
fn test_run_failing_script_exits_with_failure() {
    let (_dir, script, config) = setup(FAILING_SCRIPT);

    dbassert(&config)
        .arg("run")
        .arg(&script)
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "FAIL  line 3: Table Should Exist: Table 'ghost_table' does not exist in the db",
        ))
        .stdout(predicate::str::contains("Disconnect From Database").not())
        .stdout(predicate::str::contains("stopped at first failure"));
}

#[test]
fn test_run_json_report() {
    let (_dir, script, config) = setup(FAILING_SCRIPT);

    let output = dbassert(&config)
        .arg("run")
        .arg(&script)
        .arg("--json")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let steps = report["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0]["outcome"]["status"], "passed");
    assert_eq!(steps[1]["outcome"]["output"]["kind"], "affected");
    assert_eq!(steps[2]["outcome"]["status"], "failed");
    assert_eq!(steps[2]["step"]["keyword"], "Table Should Exist");
}

#[test]
fn test_missing_script_file() {
    let (dir, _script, config) = setup("");
    let missing = dir.path().join("missing.robot");

    dbassert(&config)
        .arg("run")
        .arg(missing)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn test_invalid_config_file() {
    let (dir, script, _config) = setup(PASSING_SCRIPT);
    let bad_config = dir.path().join("bad.toml");
    fs::write(&bad_config, "[connection]\necho = \"loud\"\n").unwrap();

    Command::cargo_bin("dbassert")
        .unwrap()
        .arg("--config")
        .arg(&bad_config)
        .arg("run")
        .arg(&script)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_keywords_lists_names() {
    let (_dir, _script, config) = setup("");

    dbassert(&config)
        .arg("keywords")
        .assert()
        .success()
        .stdout(predicate::str::contains("Connect To Database"))
        .stdout(predicate::str::contains("Row Count Is Greater Than X"))
        .stdout(predicate::str::contains("Query For Single Number"));
}

#[test]
fn test_configured_url_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let script_path = dir.path().join("checks.robot");
    let config_path = dir.path().join("config.toml");
    fs::write(
        &script_path,
        "| Connect To Database |\n| Row Count Is 0 | SELECT 1 WHERE 0 |\n",
    )
    .unwrap();
    fs::write(&config_path, "[connection]\nurl = \"sqlite://\"\n").unwrap();

    Command::cargo_bin("dbassert")
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .arg("run")
        .arg(&script_path)
        .assert()
        .success();
}
