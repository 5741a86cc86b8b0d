//! Tests for argument parsing and configuration resolution.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use hotwire::cli::{Cli, CliError};
use hotwire::config::FileConfig;

fn parse(args: &[&str]) -> Cli {
    Cli::parse_args(args.iter().copied()).expect("arguments should parse")
}

#[test]
fn parses_entry_and_child_arguments() {
    let cli = parse(&["hotwire", "server.js", "--port", "8080"]);
    assert_eq!(cli.entry, PathBuf::from("server.js"));
    assert_eq!(cli.args, vec!["--port", "8080"]);
    assert!(cli.forwarded.is_empty());
}

#[test]
fn node_modules_is_an_alias() {
    let cli = parse(&["hotwire", "--node-modules", "app.js"]);
    assert!(cli.dependency_trees);
}

#[test]
fn counts_verbosity() {
    let cli = parse(&["hotwire", "-vv", "app.js"]);
    assert_eq!(cli.verbose, 2);
}

#[test]
fn missing_entry_is_an_error() {
    assert!(Cli::parse_args(["hotwire", "--debounce", "10"]).is_err());
}

#[test]
fn forwarded_flags_reach_the_runtime_before_reporter_flags() {
    let cli = parse(&[
        "hotwire",
        "--inspect",
        "--runtime",
        "node",
        "app.js",
        "serve",
    ]);
    let file = FileConfig {
        reporter_args: vec!["--require".to_string(), "/opt/reporter.js".to_string()],
        ..FileConfig::default()
    };
    let config = cli.resolve(&file, PathBuf::from("/p")).unwrap();
    let command = config.child_command();

    assert_eq!(command.program(), OsString::from("node"));
    assert_eq!(
        command.build_args(),
        ["--inspect", "--require", "/opt/reporter.js", "app.js", "serve"]
            .iter()
            .map(OsString::from)
            .collect::<Vec<_>>()
    );
}

#[test]
fn command_line_overrides_file() {
    let cli = parse(&[
        "hotwire",
        "--debounce",
        "250",
        "--kill-timeout=3000",
        "app.js",
    ]);
    let file = FileConfig {
        debounce_ms: 5000,
        runtime: Some("python3".to_string()),
        ..FileConfig::default()
    };
    let config = cli.resolve(&file, PathBuf::from("/p")).unwrap();

    assert_eq!(config.debounce, Duration::from_millis(250));
    assert_eq!(config.kill_timeout, Some(Duration::from_millis(3000)));
    assert_eq!(config.runtime.as_deref(), Some("python3"));
}

#[test]
fn non_numeric_debounce_is_a_cast_error() {
    let cli = parse(&["hotwire", "--debounce", "soon", "app.js"]);
    let err = cli.resolve(&FileConfig::default(), PathBuf::from("/p")).unwrap_err();

    assert!(matches!(err, CliError::Cast { option: "debounce", .. }));
}

#[test]
fn defaults_without_file_or_flags() {
    let cli = parse(&["hotwire", "app.js"]);
    let config = cli.resolve(&FileConfig::default(), PathBuf::from("/p")).unwrap();

    assert_eq!(config.debounce, Duration::from_millis(1000));
    assert!(!config.dependency_trees);
    assert_eq!(config.kill_timeout, None);
    assert_eq!(config.entry_path(), PathBuf::from("/p/app.js"));
}
