//! Host-facing failures
//!
//! Problems in the checked sources are never errors here; they are
//! [`Diagnostic`](crate::diagnostics::Diagnostic)s. `CheckError` covers what
//! stops a run: cancellation, unreadable files, a broken config file.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CheckError {
    #[error("the check was cancelled")]
    #[diagnostic(code(elmcheck::cancelled))]
    Cancelled,

    #[error("cannot read `{}`", path.display())]
    #[diagnostic(code(elmcheck::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in `{}`", path.display())]
    #[diagnostic(code(elmcheck::config), help("see the [check] table in elmcheck.toml"))]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("`{name}` is not a top-level declaration of `{}`", path.display())]
    #[diagnostic(code(elmcheck::unknown_declaration))]
    UnknownDeclaration { name: String, path: PathBuf },
}

impl CheckError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CheckError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
