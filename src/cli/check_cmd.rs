//! Handler for the `elmcheck check` subcommand.

use std::path::PathBuf;

use indexmap::IndexSet;

use crate::config::Config;
use crate::diagnostics::{Diagnostic, Severity};
use crate::error::CheckError;

use super::{elm_files, load_program};

/// Totals over every checked file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub files: usize,
    pub errors: usize,
    pub warnings: usize,
    /// Errors were found, or warnings while warnings are denied
    pub failed: bool,
}

/// Diagnostics of one checked file
pub(super) struct FileReport {
    pub(super) path: PathBuf,
    pub(super) source: String,
    pub(super) diagnostics: Vec<Diagnostic>,
}

pub(super) struct CheckOptions {
    pub(super) strict: bool,
    pub(super) suggestions: bool,
}

pub(crate) fn run_check(
    paths: &[PathBuf],
    strict: bool,
    suggestions: bool,
    json: bool,
) -> Result<CheckSummary, CheckError> {
    let (reports, summary) = check_paths(paths, CheckOptions { strict, suggestions })?;

    for report in &reports {
        for d in &report.diagnostics {
            if json {
                println!("{}", d.to_json());
            } else {
                eprintln!("{}", d.to_human_readable(&report.source));
            }
        }
    }
    if !json {
        print_summary(&summary);
    }
    Ok(summary)
}

/// Check `paths` (or the configured source directories) without printing
pub(super) fn check_paths(
    paths: &[PathBuf],
    options: CheckOptions,
) -> Result<(Vec<FileReport>, CheckSummary), CheckError> {
    let start = match paths.first() {
        Some(path) => path.clone(),
        None => std::env::current_dir().map_err(|e| CheckError::io(".", e))?,
    };
    let loaded = Config::discover(&start)?;
    let settings = &loaded.config.check;
    let strict = options.strict || settings.deny_warnings;
    let suggestions = options.suggestions || settings.suggestions;

    let mut files = IndexSet::new();
    if paths.is_empty() {
        for dir in loaded.source_directories() {
            if dir.exists() {
                files.extend(elm_files(&dir)?);
            } else {
                tracing::warn!(path = %dir.display(), "source directory does not exist");
            }
        }
    } else {
        for path in paths {
            if !path.exists() {
                return Err(CheckError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
                ));
            }
            files.extend(elm_files(path)?);
        }
    }

    let files: Vec<PathBuf> = files.into_iter().collect();
    let (program, ids) = load_program(&files)?;
    let checker = program.type_checker();

    let mut reports = Vec::new();
    let mut summary = CheckSummary::default();
    for (id, path) in ids {
        let Some(file) = program.file(id) else {
            continue;
        };
        tracing::debug!(path = %path.display(), "checking");
        let mut diagnostics = checker.get_syntactic_diagnostics(file);
        diagnostics.extend(checker.get_diagnostics(file, None)?);
        if suggestions {
            diagnostics.extend(checker.get_suggestion_diagnostics(file));
        }

        summary.files += 1;
        summary.errors += diagnostics.iter().filter(|d| d.is_error()).count();
        summary.warnings += diagnostics
            .iter()
            .filter(|d| matches!(d.severity, Severity::Warning))
            .count();
        reports.push(FileReport {
            path,
            source: file.tree().source().to_string(),
            diagnostics,
        });
    }
    summary.failed = summary.errors > 0 || (strict && summary.warnings > 0);
    Ok((reports, summary))
}

fn print_summary(summary: &CheckSummary) {
    if summary.failed {
        let mut parts = Vec::new();
        if summary.errors > 0 {
            parts.push(format!("{} error(s)", summary.errors));
        }
        if summary.warnings > 0 {
            parts.push(format!("{} warning(s)", summary.warnings));
        }
        eprintln!("\nChecked {} file(s), found {}", summary.files, parts.join(", "));
    } else if summary.warnings > 0 {
        println!(
            "Checked {} file(s), no errors ({} warning(s))",
            summary.files, summary.warnings
        );
    } else {
        println!("Checked {} file(s), no errors found", summary.files);
    }
}
