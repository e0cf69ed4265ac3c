//! Semántica del parser de argumentos.

use phase_cli::CliArgs;

fn parse(tokens: &[&str]) -> CliArgs {
    let owned: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    CliArgs::parse(&owned)
}

#[test]
fn key_equals_value_and_key_space_value_are_equivalent() {
    let eq = parse(&["run", "--run-id=run-vn-001", "--through=3"]);
    let sp = parse(&["run", "--run-id", "run-vn-001", "--through", "3"]);
    for args in [&eq, &sp] {
        assert_eq!(args.command.as_deref(), Some("run"));
        assert_eq!(args.get("run-id"), Some("run-vn-001"));
        assert_eq!(args.get("through"), Some("3"));
    }
}

#[test]
fn bare_flag_means_true() {
    let args = parse(&["status", "--run-id", "run-a", "--json"]);
    assert!(args.get_bool("json"));
    assert_eq!(args.get("json"), Some("true"));
    assert!(!args.get_bool("missing"));
}

#[test]
fn bare_flag_followed_by_another_flag_stays_true() {
    let args = parse(&["run", "--strict-template", "--run-id", "run-a"]);
    assert!(args.get_bool("strict-template"));
    assert_eq!(args.get("run-id"), Some("run-a"));
}

#[test]
fn explicit_boolean_values_are_honored() {
    let args = parse(&["run", "--strict-template", "false", "--run-id=run-a"]);
    assert_eq!(args.get("strict-template"), Some("false"));
    assert!(!args.get_bool("strict-template"));
}

#[test]
fn numeric_values_parse_on_demand() {
    let args = parse(&["list", "--limit", "10"]);
    assert_eq!(args.get_i64("limit"), Some(10));
    let bad = parse(&["list", "--limit", "many"]);
    assert_eq!(bad.get_i64("limit"), None);
}

#[test]
fn require_reports_the_missing_flag() {
    let args = parse(&["status"]);
    let err = args.require("run-id").unwrap_err();
    assert!(err.contains("--run-id"), "error message names the flag: {err}");
}

#[test]
fn first_non_flag_token_is_the_command() {
    let args = parse(&["--db-path", "x.db", "list"]);
    assert_eq!(args.command.as_deref(), Some("list"));
    assert_eq!(args.get("db-path"), Some("x.db"));
}
