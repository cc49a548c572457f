//! elmcheck
//!
//! Name binding, Hindley-Milner type inference and pattern exhaustiveness
//! checking for Elm sources. A [`program::Program`] holds the parsed files;
//! its [`typeck::TypeChecker`] answers type, definition and diagnostic
//! queries on demand.

pub mod binder;
pub mod cli;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod error;
pub mod expression;
pub mod imports;
pub mod logger;
pub mod patterns;
pub mod program;
pub mod syntax;
pub mod typeck;
pub mod types;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::diagnostics::{Diagnostic, Severity, Span};
    pub use crate::error::CheckError;
    pub use crate::program::{FileOptions, Program, SourceFile};
    pub use crate::typeck::{CancellationToken, TypeChecker};
    pub use crate::types::Type;
}
