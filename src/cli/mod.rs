//! Command-line interface
//!
//! Provides commands: check, type

mod check_cmd;
mod type_cmd;

#[cfg(test)]
mod tests;

pub use check_cmd::CheckSummary;

use crate::error::CheckError;
use crate::program::{FileOptions, Program};
use crate::syntax::FileId;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Type check Elm sources
#[derive(Parser, Debug)]
#[command(name = "elmcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output diagnostics as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report errors and warnings in Elm files
    Check {
        /// Files or directories to check (defaults to the configured
        /// source directories)
        paths: Vec<PathBuf>,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Include hints such as missing type annotations
        #[arg(long)]
        suggestions: bool,
    },

    /// Print the type of a top-level declaration
    Type {
        /// File declaring the value
        file: PathBuf,

        /// Name of the declaration
        name: String,
    },
}

impl Cli {
    /// Run the parsed command
    pub fn run(self) -> Result<ExitCode, CheckError> {
        match self.command {
            Command::Check {
                paths,
                strict,
                suggestions,
            } => {
                let summary = check_cmd::run_check(&paths, strict, suggestions, self.json)?;
                Ok(if summary.failed {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                })
            }
            Command::Type { file, name } => {
                let line = type_cmd::run_type(&file, &name)?;
                println!("{}", line);
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Every `.elm` file under `path`, in a stable order
fn elm_files(path: &Path) -> Result<Vec<PathBuf>, CheckError> {
    if path.is_file() {
        return Ok(if is_elm(path) { vec![path.to_path_buf()] } else { Vec::new() });
    }
    let mut results = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|e| CheckError::io(path, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    for entry in entries {
        if entry.is_dir() {
            if entry.file_name().map(|n| n == "elm-stuff").unwrap_or(false) {
                continue;
            }
            results.extend(elm_files(&entry)?);
        } else if is_elm(&entry) {
            results.push(entry);
        }
    }
    Ok(results)
}

fn is_elm(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "elm")
}

/// A program holding the core package plus every file in `paths`
fn load_program(paths: &[PathBuf]) -> Result<(Program, Vec<(FileId, PathBuf)>), CheckError> {
    let mut program = Program::with_core();
    let mut loaded = Vec::new();
    for path in paths {
        let text = std::fs::read_to_string(path).map_err(|e| CheckError::io(path, e))?;
        let id = program.add_file(path.display().to_string(), text, FileOptions::project());
        loaded.push((id, path.clone()));
    }
    tracing::debug!(files = loaded.len(), "loaded project files");
    Ok((program, loaded))
}
