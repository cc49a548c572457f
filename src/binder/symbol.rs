//! Symbols and per-container symbol tables

use crate::syntax::NodeRef;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// What a name was bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolKind {
    Function,
    FunctionParameter,
    TypeAlias,
    Type,
    Operator,
    Module,
    CasePattern,
    AnonymousFunctionParameter,
    UnionConstructor,
    FieldType,
    TypeVariable,
    Port,
    Import,
}

impl SymbolKind {
    /// Kinds that live in the value namespace
    pub fn is_value(self) -> bool {
        matches!(
            self,
            SymbolKind::Function
                | SymbolKind::FunctionParameter
                | SymbolKind::CasePattern
                | SymbolKind::AnonymousFunctionParameter
                | SymbolKind::Port
        )
    }

    pub fn is_type(self) -> bool {
        matches!(self, SymbolKind::Type | SymbolKind::TypeAlias)
    }

    /// Kinds introduced by a pattern
    pub fn is_pattern_binding(self) -> bool {
        matches!(
            self,
            SymbolKind::FunctionParameter
                | SymbolKind::CasePattern
                | SymbolKind::AnonymousFunctionParameter
        )
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SymbolKind::Function => "function",
            SymbolKind::FunctionParameter => "function parameter",
            SymbolKind::TypeAlias => "type alias",
            SymbolKind::Type => "type",
            SymbolKind::Operator => "operator",
            SymbolKind::Module => "module",
            SymbolKind::CasePattern => "case pattern",
            SymbolKind::AnonymousFunctionParameter => "lambda parameter",
            SymbolKind::UnionConstructor => "constructor",
            SymbolKind::FieldType => "field",
            SymbolKind::TypeVariable => "type variable",
            SymbolKind::Port => "port",
            SymbolKind::Import => "import",
        };
        f.write_str(s)
    }
}

/// A bound name. Identity is `(name, node)`.
#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    pub name: String,
    pub node: NodeRef,
    pub kind: SymbolKind,
    /// Exposed constructors of a `Type` symbol
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constructors: Vec<Symbol>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, node: NodeRef, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            node,
            kind,
            constructors: Vec::new(),
        }
    }

    pub fn with_constructors(mut self, constructors: Vec<Symbol>) -> Self {
        self.constructors = constructors;
        self
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.node == other.node
    }
}

impl Eq for Symbol {}

/// Multi-map from name to the symbols bound under it, in binding order
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: IndexMap<String, Vec<Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol) {
        self.entries
            .entry(symbol.name.clone())
            .or_default()
            .push(symbol);
    }

    /// All symbols bound under `name`
    pub fn get(&self, name: &str) -> &[Symbol] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First symbol under `name` accepted by `pred`
    pub fn find(&self, name: &str, pred: impl Fn(&Symbol) -> bool) -> Option<&Symbol> {
        self.get(name).iter().find(|s| pred(s))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Every symbol, grouped by name in first-binding order
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
