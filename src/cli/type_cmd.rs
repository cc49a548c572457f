//! Handler for the `elmcheck type` subcommand.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::CheckError;

use super::{elm_files, load_program};

/// `NAME : TYPE` for a top-level declaration of `path`. The other files of
/// the configured source directories are loaded too so that imports
/// resolve.
pub(super) fn run_type(path: &Path, name: &str) -> Result<String, CheckError> {
    let loaded = Config::discover(path)?;
    let target = path.to_path_buf();
    let mut files: Vec<PathBuf> = vec![target.clone()];
    for dir in loaded.source_directories() {
        if !dir.is_dir() {
            continue;
        }
        for file in elm_files(&dir)? {
            if !same_file(&file, &target) {
                files.push(file);
            }
        }
    }

    let (program, ids) = load_program(&files)?;
    let Some(file) = ids.first().and_then(|(id, _)| program.file(*id)) else {
        return Err(CheckError::UnknownDeclaration {
            name: name.to_string(),
            path: target,
        });
    };
    let checker = program.type_checker();
    let ty = checker.find_type_of_declaration(file, name)?;
    Ok(format!("{} : {}", name, checker.type_to_string(&ty, Some(file))))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
