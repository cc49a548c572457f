//! Import resolver
//!
//! Turns a file's import clauses (the default ones first) into the four
//! multi-maps the checker resolves references against. Ambiguity is not an
//! error here: a name imported twice is only a problem once it is used.

use crate::binder::{is_record_alias, Symbol, SymbolKind, SymbolTable};
use crate::diagnostics::error_codes::resolution;
use crate::diagnostics::Diagnostic;
use crate::expression::ImportClause;
use crate::syntax::{FileId, NodeKind, SyntaxNode, SyntaxTree};
use crate::types::Qualifier;
use indexmap::IndexMap;
use std::rc::Rc;

/// The module an import came through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromModule {
    pub name: String,
    pub uri: String,
    /// `None` for project modules
    pub package: Option<String>,
}

/// An imported symbol
#[derive(Debug, Clone)]
pub struct Import {
    pub symbol: Symbol,
    pub from_module: Rc<FromModule>,
}

impl Import {
    /// Same logical symbol, reached through any import path
    pub fn same_origin(&self, other: &Import) -> bool {
        self.from_module.name == other.from_module.name
            && self.from_module.package == other.from_module.package
            && self.symbol.name == other.symbol.name
    }
}

/// Outcome of looking a name up in an import map
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    Found(&'a Import),
    /// Candidates from this many distinct modules
    Ambiguous(usize),
    Missing,
}

impl<'a> Resolution<'a> {
    pub fn found(self) -> Option<&'a Import> {
        match self {
            Resolution::Found(import) => Some(import),
            _ => None,
        }
    }
}

/// What the resolver needs to know about an imported module
#[derive(Clone, Copy)]
pub struct ModuleExports<'a> {
    pub name: &'a str,
    pub uri: &'a str,
    pub package: Option<&'a str>,
    pub tree: &'a SyntaxTree,
    pub exposing: &'a SymbolTable,
}

/// Symbols visible to one file through its imports
#[derive(Debug, Default)]
pub struct Imports {
    vars: IndexMap<String, Vec<Import>>,
    types: IndexMap<String, Vec<Import>>,
    constructors: IndexMap<String, Vec<Import>>,
    modules: IndexMap<String, Vec<Import>>,
    diagnostics: Vec<Diagnostic>,
}

impl Imports {
    pub fn var(&self, name: &str) -> Resolution<'_> {
        resolve(self.vars.get(name))
    }

    pub fn type_(&self, name: &str) -> Resolution<'_> {
        resolve(self.types.get(name))
    }

    pub fn constructor(&self, name: &str) -> Resolution<'_> {
        resolve(self.constructors.get(name))
    }

    /// Module by its local name (alias or full name)
    pub fn module(&self, name: &str) -> Resolution<'_> {
        let Some(candidates) = self.modules.get(name) else {
            return Resolution::Missing;
        };
        let mut distinct: Vec<&Import> = Vec::new();
        for candidate in candidates {
            if !distinct.iter().any(|d| d.from_module == candidate.from_module) {
                distinct.push(candidate);
            }
        }
        match distinct.as_slice() {
            [] => Resolution::Missing,
            [one] => Resolution::Found(one),
            many => Resolution::Ambiguous(many.len()),
        }
    }

    /// Every module imported under `name`
    pub fn modules_named(&self, name: &str) -> &[Import] {
        self.modules.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &Import)> {
        flatten(&self.vars)
    }

    pub fn types(&self) -> impl Iterator<Item = (&str, &Import)> {
        flatten(&self.types)
    }

    pub fn constructors(&self) -> impl Iterator<Item = (&str, &Import)> {
        flatten(&self.constructors)
    }

    pub fn modules(&self) -> impl Iterator<Item = (&str, &Import)> {
        flatten(&self.modules)
    }

    /// Exposing-list problems found in the importing file
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl Qualifier for Imports {
    /// Bare when the type is exposed unqualified from its module, otherwise
    /// prefixed with the local name of the module
    fn qualify(&self, module: &str, name: &str) -> String {
        if let Some(import) = self.type_(name).found() {
            if import.from_module.name == module {
                return name.to_string();
            }
        }
        if let Some(import) = self.constructor(name).found() {
            if import.from_module.name == module {
                return name.to_string();
            }
        }
        let local = self
            .modules
            .iter()
            .find(|(_, imports)| imports.iter().any(|i| i.from_module.name == module))
            .map(|(local, _)| local.as_str())
            .unwrap_or(module);
        format!("{}.{}", local, name)
    }
}

fn flatten(map: &IndexMap<String, Vec<Import>>) -> impl Iterator<Item = (&str, &Import)> {
    map.iter()
        .flat_map(|(name, imports)| imports.iter().map(move |i| (name.as_str(), i)))
}

fn resolve(candidates: Option<&Vec<Import>>) -> Resolution<'_> {
    let Some(candidates) = candidates else {
        return Resolution::Missing;
    };
    let mut distinct: Vec<&Import> = Vec::new();
    for candidate in candidates {
        if !distinct.iter().any(|d| d.same_origin(candidate)) {
            distinct.push(candidate);
        }
    }
    match distinct.as_slice() {
        [] => Resolution::Missing,
        [one] => Resolution::Found(one),
        many => Resolution::Ambiguous(many.len()),
    }
}

/// Build the import tables for a file. `clauses` yields the default import
/// clauses followed by the file's own; `resolve_module` maps a module name
/// to its exports, or `None` when the module cannot be found.
pub fn build_imports<'a, 't>(
    clauses: impl IntoIterator<Item = SyntaxNode<'t>>,
    resolve_module: impl Fn(&str) -> Option<ModuleExports<'a>>,
) -> Imports {
    let mut imports = Imports::default();

    for clause in clauses.into_iter().filter_map(ImportClause::cast) {
        let Some(module_name) = clause.module_name().map(|n| n.text()) else {
            continue;
        };
        let Some(exports) = resolve_module(module_name) else {
            continue;
        };
        let local = clause.local_name().unwrap_or(module_name);
        let from = Rc::new(FromModule {
            name: exports.name.to_string(),
            uri: exports.uri.to_string(),
            package: exports.package.map(str::to_string),
        });
        tracing::trace!(module = module_name, local, "importing module");

        let module_node = exports
            .tree
            .root()
            .children()
            .find(|n| n.is(NodeKind::ModuleDeclaration))
            .unwrap_or_else(|| exports.tree.root());
        imports.add_module(
            local,
            Symbol::new(exports.name, module_node.node_ref(), SymbolKind::Module),
            &from,
        );

        for symbol in exports.exposing.symbols() {
            imports.add_exposed(&format!("{}.", local), symbol, &exports, &from, true);
        }

        let Some(exposing) = clause.exposing() else {
            continue;
        };
        if exposing.child_of_kind(NodeKind::DoubleDot).is_some() {
            for symbol in exports.exposing.symbols() {
                imports.add_exposed("", symbol, &exports, &from, true);
            }
            continue;
        }

        let report = clause.syntax().tree().file() != FileId::VIRTUAL_IMPORTS;
        for entry in exposing.children() {
            imports.add_entry(entry, &exports, &from, report);
        }
    }

    imports
}

impl Imports {
    fn add_module(&mut self, local: &str, symbol: Symbol, from: &Rc<FromModule>) {
        self.modules.entry(local.to_string()).or_default().push(Import {
            symbol,
            from_module: Rc::clone(from),
        });
    }

    fn push(map: &mut IndexMap<String, Vec<Import>>, key: String, symbol: &Symbol, from: &Rc<FromModule>) {
        map.entry(key).or_default().push(Import {
            symbol: symbol.clone(),
            from_module: Rc::clone(from),
        });
    }

    /// Register an exposed symbol under `prefix`. Operators are never
    /// qualified.
    fn add_exposed(
        &mut self,
        prefix: &str,
        symbol: &Symbol,
        exports: &ModuleExports<'_>,
        from: &Rc<FromModule>,
        with_constructors: bool,
    ) {
        let key = format!("{}{}", prefix, symbol.name);
        match symbol.kind {
            SymbolKind::Operator => {
                if prefix.is_empty() {
                    Self::push(&mut self.vars, key, symbol, from);
                }
            }
            SymbolKind::Function | SymbolKind::Port => Self::push(&mut self.vars, key, symbol, from),
            SymbolKind::Type => {
                Self::push(&mut self.types, key, symbol, from);
                if with_constructors {
                    for ctor in &symbol.constructors {
                        let key = format!("{}{}", prefix, ctor.name);
                        Self::push(&mut self.constructors, key, ctor, from);
                    }
                }
            }
            SymbolKind::TypeAlias => {
                Self::push(&mut self.types, key.clone(), symbol, from);
                if is_record_alias(exports.tree.node(symbol.node.id)) {
                    Self::push(&mut self.constructors, key, symbol, from);
                }
            }
            _ => {}
        }
    }

    fn add_entry(
        &mut self,
        entry: SyntaxNode<'_>,
        exports: &ModuleExports<'_>,
        from: &Rc<FromModule>,
        report: bool,
    ) {
        let (name, found) = match entry.kind() {
            NodeKind::ExposedValue => {
                let name = entry.text();
                let found = exports
                    .exposing
                    .find(name, |s| matches!(s.kind, SymbolKind::Function | SymbolKind::Port));
                (name, found)
            }
            NodeKind::ExposedOperator => {
                let name = entry.first_child().map(|n| n.text()).unwrap_or_else(|| entry.text());
                (name, exports.exposing.find(name, |s| s.kind == SymbolKind::Operator))
            }
            NodeKind::ExposedType => {
                let Some(name) = entry.child_by_field("name").map(|n| n.text()) else {
                    return;
                };
                let open = entry.child_of_kind(NodeKind::ExposedUnionConstructors).is_some();
                let found = exports.exposing.find(name, |s| s.kind.is_type());
                if let Some(symbol) = found {
                    if open && symbol.kind == SymbolKind::TypeAlias {
                        if report {
                            self.diagnostics.push(
                                Diagnostic::error(resolution::IMPORT_OPEN_ALIAS)
                                    .message(format!(
                                        "`{}` is a type alias; it has no constructors to expose with `(..)`",
                                        name
                                    ))
                                    .span(entry.span())
                                    .build(),
                            );
                        }
                        self.add_exposed("", symbol, exports, from, false);
                        return;
                    }
                    self.add_exposed("", symbol, exports, from, open);
                    return;
                }
                (name, None)
            }
            _ => return,
        };

        match found {
            Some(symbol) => self.add_exposed("", symbol, exports, from, false),
            None if report => self.diagnostics.push(
                Diagnostic::error(resolution::EXPOSING_NOT_FOUND)
                    .message(format!(
                        "The `{}` module does not expose `{}`",
                        exports.name, name
                    ))
                    .span(entry.span())
                    .build(),
            ),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{bind, BindResult};
    use crate::diagnostics::error_codes::resolution;
    use crate::syntax::parse;

    struct Module {
        tree: SyntaxTree,
        bound: BindResult,
    }

    fn module(id: u32, source: &str) -> Module {
        let tree = parse(FileId(id), format!("file:///{}.elm", id), source);
        let bound = bind(&tree, None);
        Module { tree, bound }
    }

    fn imports_for(file: &Module, deps: &[&Module]) -> Imports {
        let clauses = file.tree.root().children_of_kind(NodeKind::ImportClause);
        build_imports(clauses, |name| {
            deps.iter()
                .find(|m| m.bound.module_name() == name)
                .map(|m| ModuleExports {
                    name: m.bound.module_name(),
                    uri: m.tree.uri(),
                    package: None,
                    tree: &m.tree,
                    exposing: m.bound.exposing(),
                })
        })
    }

    fn shapes() -> Module {
        module(
            1,
            "module Shapes exposing (Shape(..), Point, Hidden, area, (<+>))\n\ntype Shape = Circle | Square\n\ntype Hidden = Hidden Int\n\ntype alias Point = { x : Int }\n\narea s = 1\n\ninfix left 6 (<+>) = area\n",
        )
    }

    #[test]
    fn test_qualified_access_without_exposing() {
        let shapes = shapes();
        let main = module(0, "import Shapes\n\nx = 1\n");
        let imports = imports_for(&main, &[&shapes]);
        assert!(imports.var("Shapes.area").found().is_some());
        assert!(imports.type_("Shapes.Shape").found().is_some());
        assert!(imports.constructor("Shapes.Circle").found().is_some());
        // record alias constructor
        assert!(imports.constructor("Shapes.Point").found().is_some());
        // closed type hides its constructor
        assert!(imports.constructor("Shapes.Hidden").found().is_none());
        assert!(imports.var("area").found().is_none());
        assert!(imports.var("Shapes.<+>").found().is_none());
        assert!(imports.module("Shapes").found().is_some());
    }

    #[test]
    fn test_alias_replaces_module_name() {
        let shapes = shapes();
        let main = module(0, "import Shapes as S\n\nx = 1\n");
        let imports = imports_for(&main, &[&shapes]);
        assert!(imports.var("S.area").found().is_some());
        assert!(imports.var("Shapes.area").found().is_none());
        assert!(imports.module("S").found().is_some());
    }

    #[test]
    fn test_wildcard_exposes_unqualified() {
        let shapes = shapes();
        let main = module(0, "import Shapes exposing (..)\n\nx = 1\n");
        let imports = imports_for(&main, &[&shapes]);
        assert!(imports.var("area").found().is_some());
        assert!(imports.var("<+>").found().is_some());
        assert!(imports.constructor("Square").found().is_some());
    }

    #[test]
    fn test_explicit_exposing_list() {
        let shapes = shapes();
        let main = module(
            0,
            "import Shapes exposing (Shape, area, (<+>), nope)\n\nx = 1\n",
        );
        let imports = imports_for(&main, &[&shapes]);
        assert!(imports.type_("Shape").found().is_some());
        assert!(imports.constructor("Circle").found().is_none());
        assert!(imports.var("area").found().is_some());
        assert!(imports.var("<+>").found().is_some());
        let codes: Vec<_> = imports.diagnostics().iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec![resolution::EXPOSING_NOT_FOUND]);
    }

    #[test]
    fn test_opening_alias_is_error() {
        let shapes = shapes();
        let main = module(0, "import Shapes exposing (Point(..))\n\nx = 1\n");
        let imports = imports_for(&main, &[&shapes]);
        let codes: Vec<_> = imports.diagnostics().iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec![resolution::IMPORT_OPEN_ALIAS]);
        assert!(imports.type_("Point").found().is_some());
    }

    #[test]
    fn test_ambiguity_surfaces_at_lookup() {
        let a = module(1, "module A exposing (foo)\n\nfoo = 1\n");
        let b = module(2, "module B exposing (foo)\n\nfoo = 2\n");
        let main = module(0, "import A exposing (..)\nimport B exposing (..)\n\nx = 1\n");
        let imports = imports_for(&main, &[&a, &b]);
        assert!(imports.diagnostics().is_empty());
        assert!(matches!(imports.var("foo"), Resolution::Ambiguous(2)));
        assert!(imports.var("A.foo").found().is_some());
    }

    #[test]
    fn test_same_symbol_twice_is_not_ambiguous() {
        let a = module(1, "module A exposing (foo)\n\nfoo = 1\n");
        let main = module(0, "import A exposing (foo)\nimport A exposing (..)\n\nx = 1\n");
        let imports = imports_for(&main, &[&a]);
        assert!(imports.var("foo").found().is_some());
    }

    #[test]
    fn test_unresolved_module_is_skipped() {
        let main = module(0, "import Nowhere exposing (x)\n\ny = 1\n");
        let imports = imports_for(&main, &[]);
        assert!(imports.diagnostics().is_empty());
        assert!(matches!(imports.module("Nowhere"), Resolution::Missing));
    }
}
