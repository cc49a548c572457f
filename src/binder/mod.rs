//! Binder
//!
//! One walk over a file's tree builds a symbol table per lexical container
//! (file, value declaration, let block, lambda, case branch, type
//! declaration), records which container every node sits in, then computes
//! the file's public exposing table.

mod symbol;

#[cfg(test)]
mod tests;

pub use symbol::{Symbol, SymbolKind, SymbolTable};

use crate::diagnostics::error_codes::{binding, resolution, syntax};
use crate::diagnostics::Diagnostic;
use crate::expression::{self, ModuleDeclaration, Pattern, TypeAliasDeclaration};
use crate::syntax::{NodeId, NodeKind, NodeRef, SyntaxNode, SyntaxTree};
use indexmap::IndexSet;
use std::collections::HashMap;

/// Bindings of one file
#[derive(Debug)]
pub struct BindResult {
    tables: HashMap<NodeId, SymbolTable>,
    container_parent: HashMap<NodeId, NodeId>,
    /// Innermost container of every node, by node index
    scope_of: Vec<NodeId>,
    root: NodeId,
    exposing: SymbolTable,
    non_shadowable_names: IndexSet<String>,
    diagnostics: Vec<Diagnostic>,
    module_name: String,
    is_port_module: bool,
}

impl BindResult {
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn is_port_module(&self) -> bool {
        self.is_port_module
    }

    pub fn root_table(&self) -> &SymbolTable {
        &self.tables[&self.root]
    }

    pub fn table(&self, container: NodeId) -> Option<&SymbolTable> {
        self.tables.get(&container)
    }

    pub fn exposing(&self) -> &SymbolTable {
        &self.exposing
    }

    /// Top-level value names; nothing below may rebind them
    pub fn non_shadowable_names(&self) -> &IndexSet<String> {
        &self.non_shadowable_names
    }

    /// Parse and binding diagnostics
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn container_count(&self) -> usize {
        self.tables.len()
    }

    /// Innermost container holding `node`
    pub fn scope_of(&self, node: NodeId) -> NodeId {
        self.scope_of.get(node.index()).copied().unwrap_or(self.root)
    }

    /// Containers from the one holding `node` out to the file, innermost first
    pub fn scopes(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &SymbolTable)> + '_ {
        std::iter::successors(Some(self.scope_of(node)), move |c| {
            self.container_parent.get(c).copied()
        })
        .filter_map(move |c| self.tables.get(&c).map(|t| (c, t)))
    }

    /// First symbol visible from `node` under `name` accepted by `pred`
    pub fn lookup(
        &self,
        node: NodeId,
        name: &str,
        pred: impl Fn(&Symbol) -> bool,
    ) -> Option<&Symbol> {
        self.scopes(node).find_map(|(_, table)| table.find(name, &pred))
    }
}

/// Walk `tree` and build its symbol tables. `virtual_imports` holds the
/// default import clauses every module sees.
pub fn bind(tree: &SyntaxTree, virtual_imports: Option<&SyntaxTree>) -> BindResult {
    let root = tree.root();
    let module = root
        .children()
        .find_map(ModuleDeclaration::cast);
    let module_name = module
        .and_then(|m| m.name())
        .map(|n| n.text().to_string())
        .unwrap_or_else(|| "Main".to_string());
    let is_port_module = module.map(|m| m.is_port_module()).unwrap_or(false);

    tracing::debug!(uri = tree.uri(), module = %module_name, "binding file");

    let mut binder = Binder {
        tree,
        tables: HashMap::new(),
        container_parent: HashMap::new(),
        scope_of: vec![root.id(); tree.len()],
        stack: Vec::new(),
        non_shadowable_names: IndexSet::new(),
        diagnostics: Vec::new(),
        is_port_module,
    };

    for (node, message) in tree.errors() {
        binder.diagnostics.push(
            Diagnostic::error(syntax::PARSE_ERROR)
                .message(message)
                .span(node.span())
                .build(),
        );
    }

    binder.open(root);
    if let Some(virtual_tree) = virtual_imports {
        for import in virtual_tree.root().children_of_kind(NodeKind::ImportClause) {
            binder.bind_import(import, &module_name);
        }
    }
    for child in root.children() {
        binder.walk(child);
    }
    binder.stack.pop();

    binder.check_shadowing(root.id());

    let exposing = bind_exposing(tree, &binder.tables[&root.id()], module, &mut binder.diagnostics);

    BindResult {
        tables: binder.tables,
        container_parent: binder.container_parent,
        scope_of: binder.scope_of,
        root: root.id(),
        exposing,
        non_shadowable_names: binder.non_shadowable_names,
        diagnostics: binder.diagnostics,
        module_name,
        is_port_module,
    }
}

struct Binder<'t> {
    tree: &'t SyntaxTree,
    tables: HashMap<NodeId, SymbolTable>,
    container_parent: HashMap<NodeId, NodeId>,
    scope_of: Vec<NodeId>,
    stack: Vec<NodeId>,
    non_shadowable_names: IndexSet<String>,
    diagnostics: Vec<Diagnostic>,
    is_port_module: bool,
}

impl<'t> Binder<'t> {
    fn current(&self) -> NodeId {
        *self
            .stack
            .last()
            .expect("binder container stack is empty outside the file walk")
    }

    /// Create the table for `container` and make it current
    fn open(&mut self, container: SyntaxNode<'t>) {
        let id = container.id();
        if let Some(&parent) = self.stack.last() {
            self.container_parent.insert(id, parent);
        }
        self.tables.entry(id).or_default();
        self.scope_of[id.index()] = id;
        self.stack.push(id);
    }

    fn declare(&mut self, container: NodeId, name: &str, node: NodeRef, kind: SymbolKind) {
        if let Some(table) = self.tables.get_mut(&container) {
            table.insert(Symbol::new(name, node, kind));
        }
    }

    fn declare_here(&mut self, name: &str, node: SyntaxNode<'t>, kind: SymbolKind) {
        let container = self.current();
        self.declare(container, name, node.node_ref(), kind);
    }

    fn walk(&mut self, node: SyntaxNode<'t>) {
        self.scope_of[node.id().index()] = self.current();
        match node.kind() {
            NodeKind::ValueDeclaration => self.bind_value_declaration(node),
            NodeKind::TypeDeclaration => self.bind_type_declaration(node),
            NodeKind::TypeAliasDeclaration => self.bind_type_alias(node),
            NodeKind::PortAnnotation => self.bind_port(node),
            NodeKind::InfixDeclaration => {
                if let Some(op) = node.child_by_field("operator") {
                    self.declare_here(op.text(), node, SymbolKind::Operator);
                }
                self.walk_children(node);
            }
            NodeKind::ImportClause => {
                self.bind_import(node, "");
                self.walk_children(node);
            }
            NodeKind::LetInExpr => {
                self.open(node);
                self.walk_children(node);
                self.stack.pop();
            }
            NodeKind::AnonymousFunctionExpr => {
                self.open(node);
                for param in node.children_by_field("param") {
                    self.bind_pattern(param, SymbolKind::AnonymousFunctionParameter);
                }
                self.walk_children(node);
                self.stack.pop();
            }
            NodeKind::CaseOfBranch => {
                self.open(node);
                if let Some(pattern) = node.child_by_field("pattern") {
                    self.bind_pattern(pattern, SymbolKind::CasePattern);
                }
                self.walk_children(node);
                self.stack.pop();
            }
            _ => self.walk_children(node),
        }
    }

    fn walk_children(&mut self, node: SyntaxNode<'t>) {
        for child in node.children() {
            self.walk(child);
        }
    }

    fn is_top_level(&self) -> bool {
        self.stack.len() == 1
    }

    fn bind_pattern(&mut self, pattern: SyntaxNode<'t>, kind: SymbolKind) {
        let Some(pattern) = Pattern::cast(pattern) else {
            return;
        };
        let mut names = Vec::new();
        expression::bound_names(pattern, &mut names);
        for name in names {
            self.declare_here(name.text(), name, kind);
        }
    }

    fn bind_value_declaration(&mut self, node: SyntaxNode<'t>) {
        let top_level = self.is_top_level();
        if let Some(left) = node.child_by_field("functionDeclarationLeft") {
            if let Some(name) = left.child_by_field("name") {
                self.declare_here(name.text(), node, SymbolKind::Function);
                if top_level {
                    self.non_shadowable_names.insert(name.text().to_string());
                }
            }
        } else if let Some(pattern) = node.child_by_field("pattern").and_then(Pattern::cast) {
            let mut names = Vec::new();
            expression::bound_names(pattern, &mut names);
            for name in names {
                self.declare_here(name.text(), name, SymbolKind::Function);
                if top_level {
                    self.non_shadowable_names.insert(name.text().to_string());
                }
            }
        }

        self.open(node);
        if let Some(left) = node.child_by_field("functionDeclarationLeft") {
            for param in left.children_by_field("param") {
                self.bind_pattern(param, SymbolKind::FunctionParameter);
            }
        }
        self.walk_children(node);
        self.stack.pop();
    }

    fn bind_type_declaration(&mut self, node: SyntaxNode<'t>) {
        if let Some(name) = node.child_by_field("name") {
            self.declare_here(name.text(), node, SymbolKind::Type);
        }
        for variant in node.children_by_field("unionVariant") {
            if let Some(name) = variant.child_by_field("name") {
                self.declare_here(name.text(), variant, SymbolKind::UnionConstructor);
            }
        }
        self.open(node);
        for type_name in node.children_by_field("typeName") {
            self.declare_here(type_name.text(), type_name, SymbolKind::TypeVariable);
        }
        self.walk_children(node);
        self.stack.pop();
    }

    fn bind_type_alias(&mut self, node: SyntaxNode<'t>) {
        if let Some(name) = node.child_by_field("name") {
            self.declare_here(name.text(), node, SymbolKind::TypeAlias);
        }
        self.open(node);
        for type_name in node.children_by_field("typeName") {
            self.declare_here(type_name.text(), type_name, SymbolKind::TypeVariable);
        }
        self.walk_children(node);
        self.stack.pop();
    }

    fn bind_port(&mut self, node: SyntaxNode<'t>) {
        if let Some(name) = node.child_by_field("name") {
            self.declare_here(name.text(), node, SymbolKind::Port);
            self.non_shadowable_names.insert(name.text().to_string());
        }
        if !self.is_port_module {
            self.diagnostics.push(
                Diagnostic::error(resolution::PORT_IN_NON_PORT_MODULE)
                    .message("Ports can only be declared in a `port module`")
                    .span(node.span())
                    .build(),
            );
        }
        self.walk_children(node);
    }

    /// Bind the local name of an import clause. A default import of the
    /// module being bound is skipped.
    fn bind_import(&mut self, node: SyntaxNode<'_>, own_module: &str) {
        let Some(import) = expression::ImportClause::cast(node) else {
            return;
        };
        let module_name = import.module_name().map(|n| n.text()).unwrap_or("");
        if module_name.is_empty() || module_name == own_module {
            return;
        }
        if let Some(local) = import.local_name() {
            let root = self.tree.root().id();
            self.declare(root, local, node.node_ref(), SymbolKind::Import);
        }
    }

    /// Redefinitions inside one container, and pattern or let names that
    /// rebind a name visible from an enclosing container
    fn check_shadowing(&mut self, root: NodeId) {
        let mut containers: Vec<NodeId> = self.tables.keys().copied().collect();
        containers.sort();

        for container in containers {
            let table = &self.tables[&container];
            let mut found = Vec::new();

            for name in table.names() {
                let symbols = table.get(name);
                for namespace in [Namespace::Value, Namespace::Constructor, Namespace::Type] {
                    let mut same = symbols.iter().filter(|s| namespace.contains(s.kind));
                    if same.next().is_some() {
                        found.extend(same.map(|s| (binding::REDEFINITION, s.clone())));
                    }
                }
            }

            if container != root {
                for symbol in table.symbols().filter(|s| s.kind.is_value()) {
                    if self.is_shadowing(container, root, &symbol.name) {
                        found.push((binding::SHADOWING, symbol.clone()));
                    }
                }
            }

            for (code, symbol) in found {
                let span = self.tree.node(symbol.node.id).span();
                let message = if code == binding::REDEFINITION {
                    format!("`{}` is defined more than once", symbol.name)
                } else {
                    format!(
                        "`{}` shadows an existing definition; pick a different name",
                        symbol.name
                    )
                };
                self.diagnostics
                    .push(Diagnostic::error(code).message(message).span(span).build());
            }
        }
    }

    fn is_shadowing(&self, container: NodeId, root: NodeId, name: &str) -> bool {
        if self.non_shadowable_names.contains(name) {
            return true;
        }
        std::iter::successors(self.container_parent.get(&container).copied(), |c| {
            self.container_parent.get(c).copied()
        })
        .filter(|c| *c != root)
        .any(|c| self.tables[&c].get(name).iter().any(|s| s.kind.is_value()))
    }
}

#[derive(Clone, Copy)]
enum Namespace {
    Value,
    Constructor,
    Type,
}

impl Namespace {
    fn contains(self, kind: SymbolKind) -> bool {
        match self {
            Namespace::Value => kind.is_value(),
            Namespace::Constructor => kind == SymbolKind::UnionConstructor,
            Namespace::Type => kind.is_type(),
        }
    }
}

/// Public exposing table of a file
fn bind_exposing(
    tree: &SyntaxTree,
    root_table: &SymbolTable,
    module: Option<ModuleDeclaration<'_>>,
    diagnostics: &mut Vec<Diagnostic>,
) -> SymbolTable {
    let mut exposing = SymbolTable::new();
    let list = module.and_then(|m| m.exposing());

    let wildcard = list
        .map(|l| l.child_of_kind(NodeKind::DoubleDot).is_some())
        .unwrap_or(true);

    if wildcard {
        for symbol in root_table.symbols() {
            match symbol.kind {
                SymbolKind::Function | SymbolKind::TypeAlias | SymbolKind::Port | SymbolKind::Operator => {
                    exposing.insert(symbol.clone());
                }
                SymbolKind::Type => {
                    exposing.insert(with_constructors(tree, symbol, root_table));
                }
                _ => {}
            }
        }
        return exposing;
    }

    let Some(list) = list else {
        return exposing;
    };

    for entry in list.children() {
        match entry.kind() {
            NodeKind::ExposedValue => {
                let name = entry.text();
                match root_table.find(name, |s| matches!(s.kind, SymbolKind::Function | SymbolKind::Port)) {
                    Some(symbol) => exposing.insert(symbol.clone()),
                    None => diagnostics.push(export_not_found(entry, name)),
                }
            }
            NodeKind::ExposedOperator => {
                let name = entry
                    .first_child()
                    .map(|n| n.text())
                    .unwrap_or_else(|| entry.text());
                match root_table.find(name, |s| s.kind == SymbolKind::Operator) {
                    Some(symbol) => exposing.insert(symbol.clone()),
                    None => diagnostics.push(export_not_found(entry, name)),
                }
            }
            NodeKind::ExposedType => {
                let Some(name) = entry.child_by_field("name").map(|n| n.text()) else {
                    continue;
                };
                let open = entry
                    .child_of_kind(NodeKind::ExposedUnionConstructors)
                    .is_some();
                match root_table.find(name, |s| s.kind.is_type()) {
                    Some(symbol) if symbol.kind == SymbolKind::TypeAlias => {
                        if open {
                            diagnostics.push(
                                Diagnostic::error(binding::EXPORT_OPEN_ALIAS)
                                    .message(format!(
                                        "`{}` is a type alias; it cannot expose constructors with `(..)`",
                                        name
                                    ))
                                    .span(entry.span())
                                    .build(),
                            );
                        }
                        exposing.insert(symbol.clone());
                    }
                    Some(symbol) if open => {
                        exposing.insert(with_constructors(tree, symbol, root_table));
                    }
                    Some(symbol) => exposing.insert(symbol.clone()),
                    None => diagnostics.push(export_not_found(entry, name)),
                }
            }
            _ => {}
        }
    }

    exposing
}

fn with_constructors(tree: &SyntaxTree, symbol: &Symbol, root_table: &SymbolTable) -> Symbol {
    let declaration = tree.node(symbol.node.id);
    let constructors = declaration
        .children_by_field("unionVariant")
        .filter_map(|variant| {
            let name = variant.child_by_field("name")?.text();
            root_table
                .find(name, |s| s.kind == SymbolKind::UnionConstructor && s.node == variant.node_ref())
                .cloned()
        })
        .collect();
    symbol.clone().with_constructors(constructors)
}

fn export_not_found(entry: SyntaxNode<'_>, name: &str) -> Diagnostic {
    Diagnostic::error(binding::EXPORT_NOT_FOUND)
        .message(format!(
            "The module exposes `{}` but does not define it",
            name
        ))
        .span(entry.span())
        .build()
}

/// Record aliases double as constructor functions
pub fn is_record_alias(node: SyntaxNode<'_>) -> bool {
    TypeAliasDeclaration::cast(node)
        .map(|a| a.is_record())
        .unwrap_or(false)
}
