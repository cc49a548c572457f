use super::check_cmd::{check_paths, CheckOptions};
use super::*;
use pretty_assertions::assert_eq;

fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, text) in files {
        let full = dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, text).unwrap();
    }
    dir
}

fn options(strict: bool, suggestions: bool) -> CheckOptions {
    CheckOptions { strict, suggestions }
}

const CLEAN: &str = "module Main exposing (..)\n\nmain : Int\nmain =\n    1\n";

#[test]
fn test_parse_check_command() {
    let cli = Cli::try_parse_from(["elmcheck", "check", "src", "--strict", "--json", "-vv"]).unwrap();
    assert_eq!(cli.verbose, 2);
    assert!(cli.json);
    match cli.command {
        Command::Check {
            paths,
            strict,
            suggestions,
        } => {
            assert_eq!(paths, vec![PathBuf::from("src")]);
            assert!(strict);
            assert!(!suggestions);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_parse_type_command() {
    let cli = Cli::try_parse_from(["elmcheck", "type", "src/Main.elm", "main"]).unwrap();
    assert!(matches!(cli.command, Command::Type { ref name, .. } if name == "main"));
}

#[test]
fn test_elm_files_are_sorted_and_skip_elm_stuff() {
    let dir = project(&[
        ("src/B.elm", CLEAN),
        ("src/A.elm", CLEAN),
        ("src/notes.txt", "x"),
        ("src/elm-stuff/Cached.elm", CLEAN),
    ]);
    let found = elm_files(&dir.path().join("src")).unwrap();
    let names: Vec<String> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["A.elm".to_string(), "B.elm".to_string()]);
}

#[test]
fn test_check_clean_project() {
    let dir = project(&[("src/Main.elm", CLEAN)]);
    let (reports, summary) = check_paths(&[dir.path().join("src")], options(false, false)).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(
        summary,
        CheckSummary {
            files: 1,
            errors: 0,
            warnings: 0,
            failed: false,
        }
    );
}

#[test]
fn test_check_reports_errors() {
    let dir = project(&[("src/Main.elm", "module Main exposing (..)\n\nmain : Int\nmain =\n    \"one\"\n")]);
    let (reports, summary) = check_paths(&[dir.path().join("src")], options(false, false)).unwrap();
    assert!(summary.failed);
    assert_eq!(summary.errors, 1);
    assert!(reports[0].path.ends_with("Main.elm"));
}

#[test]
fn test_suggestions_from_config() {
    let dir = project(&[
        ("elmcheck.toml", "[check]\nsuggestions = true\n"),
        ("src/Main.elm", "module Main exposing (..)\n\nmain =\n    1\n"),
    ]);
    let (reports, summary) = check_paths(&[dir.path().join("src")], options(false, false)).unwrap();
    assert!(!summary.failed);
    assert!(reports[0]
        .diagnostics
        .iter()
        .any(|d| d.code == crate::diagnostics::error_codes::suggestions::MISSING_TYPE_ANNOTATION));
}

#[test]
fn test_imports_between_project_files() {
    let dir = project(&[
        ("src/Util.elm", "module Util exposing (double)\n\ndouble : Int -> Int\ndouble n =\n    n * 2\n"),
        ("src/Main.elm", "module Main exposing (..)\n\nimport Util\n\nmain : Int\nmain =\n    Util.double 2\n"),
    ]);
    let (_, summary) = check_paths(&[dir.path().join("src")], options(true, false)).unwrap();
    assert_eq!(summary.errors, 0);
    assert!(!summary.failed);
}

#[test]
fn test_missing_path_is_an_error() {
    let dir = project(&[]);
    let outcome = check_paths(&[dir.path().join("nope")], options(false, false));
    assert!(matches!(outcome, Err(CheckError::Io { .. })));
}

#[test]
fn test_type_command_output() {
    let dir = project(&[("src/Main.elm", "module Main exposing (..)\n\ntwice f x =\n    f (f x)\n")]);
    let line = type_cmd::run_type(&dir.path().join("src/Main.elm"), "twice").unwrap();
    assert_eq!(line, "twice : (a -> a) -> a -> a");
}

#[test]
fn test_type_command_unknown_name() {
    let dir = project(&[("src/Main.elm", CLEAN)]);
    let outcome = type_cmd::run_type(&dir.path().join("src/Main.elm"), "nope");
    assert!(matches!(outcome, Err(CheckError::UnknownDeclaration { .. })));
}
