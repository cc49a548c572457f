//! Name resolution shared by inference and go-to-definition
//!
//! Local containers are searched innermost first; whatever they do not
//! define falls through to the file's import tables.

use crate::binder::{is_record_alias, Symbol, SymbolKind};
use crate::core::KERNEL_PREFIX;
use crate::diagnostics::error_codes::resolution;
use crate::diagnostics::{Diagnostic, Span};
use crate::imports::Resolution;
use crate::program::{Program, SourceFile};
use crate::syntax::NodeId;

/// Outcome of resolving one name
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(Symbol),
    /// Visible through this many distinct modules
    Ambiguous(usize),
    /// A runtime-implemented value; it has no declaration to find
    Kernel,
    Missing,
}

impl Lookup {
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Lookup::Found(symbol) => Some(symbol),
            _ => None,
        }
    }

    fn from_imports(resolution: Resolution<'_>) -> Lookup {
        match resolution {
            Resolution::Found(import) => Lookup::Found(import.symbol.clone()),
            Resolution::Ambiguous(count) => Lookup::Ambiguous(count),
            Resolution::Missing => Lookup::Missing,
        }
    }
}

/// Which namespace a name lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Value,
    Constructor,
    Type,
    Operator,
}

impl Namespace {
    fn noun(self) -> &'static str {
        match self {
            Namespace::Value => "variable",
            Namespace::Constructor => "constructor",
            Namespace::Type => "type",
            Namespace::Operator => "operator",
        }
    }
}

/// Split `Module.name` into its qualifier and base name
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => (Some(&name[..dot]), &name[dot + 1..]),
        _ => (None, name),
    }
}

/// Resolve `name` as seen from `node` in `file`
pub fn resolve(program: &Program, file: &SourceFile, node: NodeId, name: &str, namespace: Namespace) -> Lookup {
    let bind = program.bind(file);
    let imports = program.imports(file);
    let (qualifier, _) = split_qualified(name);

    if qualifier.is_none() || namespace == Namespace::Operator {
        let local = match namespace {
            Namespace::Value => bind.lookup(node, name, |s| s.kind.is_value()),
            Namespace::Constructor => bind.root_table().find(name, |s| {
                s.kind == SymbolKind::UnionConstructor
                    || (s.kind == SymbolKind::TypeAlias && is_record_alias_symbol(program, s))
            }),
            Namespace::Type => bind.root_table().find(name, |s| s.kind.is_type()),
            Namespace::Operator => bind.root_table().find(name, |s| s.kind == SymbolKind::Operator),
        };
        if let Some(symbol) = local {
            return Lookup::Found(symbol.clone());
        }
    } else if namespace == Namespace::Value && name.starts_with(KERNEL_PREFIX) {
        return Lookup::Kernel;
    }

    let found = match namespace {
        Namespace::Value | Namespace::Operator => imports.var(name),
        Namespace::Constructor => imports.constructor(name),
        Namespace::Type => imports.type_(name),
    };
    Lookup::from_imports(found)
}

fn is_record_alias_symbol(program: &Program, symbol: &Symbol) -> bool {
    program.node(symbol.node).map(is_record_alias).unwrap_or(false)
}

/// The diagnostic for a name that resolved to nothing or to several
/// candidates, if any
pub fn lookup_diagnostic(lookup: &Lookup, name: &str, namespace: Namespace, span: Span) -> Option<Diagnostic> {
    match lookup {
        Lookup::Ambiguous(count) => {
            let code = match namespace {
                Namespace::Value | Namespace::Operator => resolution::AMBIGUOUS_VAR,
                Namespace::Constructor => resolution::AMBIGUOUS_CONSTRUCTOR,
                Namespace::Type => resolution::AMBIGUOUS_TYPE,
            };
            Some(
                Diagnostic::error(code)
                    .message(format!(
                        "The {} `{}` is ambiguous: {} imports expose it",
                        namespace.noun(),
                        name,
                        count
                    ))
                    .span(span)
                    .build(),
            )
        }
        Lookup::Missing if namespace == Namespace::Type => Some(
            Diagnostic::error(resolution::MISSING_TYPE)
                .message(format!("Cannot find a `{}` type", name))
                .span(span)
                .build(),
        ),
        Lookup::Missing => Some(
            Diagnostic::error(crate::diagnostics::error_codes::types::MISSING_VALUE)
                .message(format!("No definition found for `{}`", name))
                .span(span)
                .build(),
        ),
        Lookup::Found(_) | Lookup::Kernel => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("List.map"), (Some("List"), "map"));
        assert_eq!(split_qualified("Platform.Cmd.none"), (Some("Platform.Cmd"), "none"));
        assert_eq!(split_qualified("map"), (None, "map"));
    }
}
