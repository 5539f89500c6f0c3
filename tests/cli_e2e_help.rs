//! End-to-end tests for the help output of `replicate-tasks` and its
//! subcommands.

#[allow(dead_code)]
mod common;
use common::prelude::*;

#[test]
fn test_top_level_help_lists_commands() {
    let mut cmd = cargo_bin_cmd!("replicate-tasks");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("replicate"))
        .stdout(predicate::str::contains("select"))
        .stdout(predicate::str::contains("completions"))
        .stdout(predicate::str::contains("--hub-url"))
        .stdout(predicate::str::contains("--log-level"));
}

#[test]
fn test_replicate_help_lists_options() {
    let mut cmd = cargo_bin_cmd!("replicate-tasks");
    cmd.args(["replicate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TASK_ID"))
        .stdout(predicate::str::contains("--strategy"))
        .stdout(predicate::str::contains("--override-tag"))
        .stdout(predicate::str::contains("--channel-override"))
        .stdout(predicate::str::contains("--include-scratch"))
        .stdout(predicate::str::contains("--arch"))
        .stdout(predicate::str::contains("--weight"))
        .stdout(predicate::str::contains("--quiet"));
}

#[test]
fn test_select_help_lists_filters() {
    let mut cmd = cargo_bin_cmd!("replicate-tasks");
    cmd.args(["select", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--channel"))
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("--method"))
        .stdout(predicate::str::contains("--state"))
        .stdout(predicate::str::contains("--limit"))
        .stdout(predicate::str::contains("--offset"))
        .stdout(predicate::str::contains("--strategy").not());
}

#[test]
fn test_invalid_log_level_is_usage_error() {
    let mut cmd = cargo_bin_cmd!("replicate-tasks");
    cmd.args(["--log-level", "loud", "select"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_subcommand_is_usage_error() {
    let mut cmd = cargo_bin_cmd!("replicate-tasks");
    cmd.assert().code(2);
}
