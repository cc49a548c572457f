//! Go-to-definition

use super::resolve::{lookup_diagnostic, resolve};
use super::*;
use crate::binder::{Symbol, SymbolKind};
use crate::expression::{ModuleDeclaration, ValueExpr};

/// Where a name is defined, plus whatever went wrong resolving it
#[derive(Debug, Clone, Default)]
pub struct DefinitionResult {
    pub symbol: Option<Symbol>,
    pub diagnostics: Vec<Diagnostic>,
}

impl DefinitionResult {
    fn found(symbol: Symbol) -> Self {
        Self {
            symbol: Some(symbol),
            diagnostics: Vec::new(),
        }
    }
}

impl<'p> TypeChecker<'p> {
    /// The declaration a name node refers to. Accepts the name node or
    /// its immediate container (`ValueExpr`, `TypeRef`, ...).
    pub fn find_definition(&self, node: NodeRef) -> DefinitionResult {
        let Some((file, syntax)) = self.locate(node) else {
            return DefinitionResult::default();
        };
        let parent = syntax.parent();
        let parent_kind = parent.map(|p| p.kind());

        match (syntax.kind(), parent_kind) {
            (NodeKind::ValueExpr, _) => self.value_definition(file, syntax),
            (NodeKind::ValueQid | NodeKind::UpperCaseQid, Some(NodeKind::ValueExpr)) => match parent {
                Some(value) => self.value_definition(file, value),
                None => DefinitionResult::default(),
            },
            (NodeKind::Operator, _) | (NodeKind::OperatorIdentifier, Some(NodeKind::Operator))
            | (NodeKind::OperatorIdentifier, Some(NodeKind::OperatorAsFunctionExpr)) => {
                self.lookup(file, syntax, syntax.text(), Namespace::Operator)
            }
            (NodeKind::TypeRef, _) => match syntax.child_by_field("name") {
                Some(name) => self.lookup(file, name, name.text(), Namespace::Type),
                None => DefinitionResult::default(),
            },
            (NodeKind::UpperCaseQid, Some(NodeKind::TypeRef)) => {
                self.lookup(file, syntax, syntax.text(), Namespace::Type)
            }
            (NodeKind::UpperCaseQid, Some(NodeKind::UnionPattern)) => {
                self.lookup(file, syntax, syntax.text(), Namespace::Constructor)
            }
            (NodeKind::UpperCaseQid, Some(NodeKind::ImportClause)) => self.module_definition(file, syntax.text()),
            (NodeKind::TypeVariable, _) | (NodeKind::RecordBaseIdentifier, Some(NodeKind::RecordType)) => {
                self.type_variable_definition(file, syntax)
            }
            (NodeKind::ExposedValue | NodeKind::ExposedType | NodeKind::ExposedOperator, _) => {
                self.exposed_definition(file, syntax)
            }
            (NodeKind::UpperCaseIdentifier | NodeKind::OperatorIdentifier, Some(
                NodeKind::ExposedType | NodeKind::ExposedOperator,
            )) => match parent {
                Some(exposed) => self.exposed_definition(file, exposed),
                None => DefinitionResult::default(),
            },
            (NodeKind::LowerCaseIdentifier, Some(
                NodeKind::Field | NodeKind::FieldAccessExpr | NodeKind::FieldAccessorFunctionExpr,
            )) => self.field_definition(syntax),
            (NodeKind::RecordBaseIdentifier, _) => self.lookup(file, syntax, syntax.text(), Namespace::Value),
            _ => DefinitionResult::default(),
        }
    }

    fn lookup(&self, file: &SourceFile, site: SyntaxNode<'_>, name: &str, namespace: Namespace) -> DefinitionResult {
        let found = resolve(self.program, file, site.id(), name, namespace);
        match found {
            Lookup::Found(symbol) => DefinitionResult::found(symbol),
            other => DefinitionResult {
                symbol: None,
                diagnostics: lookup_diagnostic(&other, name, namespace, site.span())
                    .into_iter()
                    .collect(),
            },
        }
    }

    fn value_definition(&self, file: &SourceFile, node: SyntaxNode<'_>) -> DefinitionResult {
        let Some(value) = ValueExpr::cast(node) else {
            return DefinitionResult::default();
        };
        let Some(name) = value.name() else {
            return DefinitionResult::default();
        };
        let namespace = if value.is_constructor() {
            Namespace::Constructor
        } else {
            Namespace::Value
        };
        self.lookup(file, name, name.text(), namespace)
    }

    fn module_definition(&self, file: &SourceFile, name: &str) -> DefinitionResult {
        let target = self
            .program
            .resolved_modules(file)
            .get(name)
            .and_then(|id| self.program.file(*id));
        let Some(target) = target else {
            return DefinitionResult::default();
        };
        match target.root().children().find_map(ModuleDeclaration::cast) {
            Some(declaration) => DefinitionResult::found(Symbol::new(
                name,
                declaration.syntax().node_ref(),
                SymbolKind::Module,
            )),
            None => DefinitionResult::default(),
        }
    }

    /// A variable in an annotation is defined by its first occurrence in
    /// the outermost enclosing annotation; one in a type declaration by the
    /// declaration's parameter
    fn type_variable_definition(&self, file: &SourceFile, node: SyntaxNode<'_>) -> DefinitionResult {
        let name = node.text();
        let declaration = node.ancestors().find(|a| {
            a.is(NodeKind::TypeDeclaration) || a.is(NodeKind::TypeAliasDeclaration)
        });
        if let Some(declaration) = declaration {
            let symbol = self
                .program
                .bind(file)
                .table(declaration.id())
                .and_then(|table| table.find(name, |s| s.kind == SymbolKind::TypeVariable));
            return match symbol {
                Some(symbol) => DefinitionResult::found(symbol.clone()),
                None => DefinitionResult::default(),
            };
        }

        let annotations: Vec<SyntaxNode<'_>> = std::iter::once(node)
            .chain(node.ancestors())
            .filter(|a| a.is(NodeKind::TypeAnnotation) || a.is(NodeKind::PortAnnotation))
            .collect();
        let mut scopes = Vec::new();
        if let Some(own) = annotations.last() {
            let top = own
                .ancestors()
                .filter(|a| a.is(NodeKind::ValueDeclaration))
                .last()
                .and_then(ValueDeclaration::cast)
                .and_then(|d| d.annotation());
            if let Some(outer) = top {
                scopes.push(outer.syntax());
            }
            scopes.push(*own);
        }
        scopes
            .into_iter()
            .find_map(|annotation| {
                annotation
                    .descendants()
                    .find(|d| d.is(NodeKind::TypeVariable) && d.text() == name)
            })
            .map(|first| DefinitionResult::found(Symbol::new(name, first.node_ref(), SymbolKind::TypeVariable)))
            .unwrap_or_default()
    }

    fn exposed_definition(&self, file: &SourceFile, node: SyntaxNode<'_>) -> DefinitionResult {
        let name = match node.kind() {
            NodeKind::ExposedType => node.child_by_field("name").map(|n| n.text()),
            NodeKind::ExposedOperator => node.first_child().map(|n| n.text()),
            _ => Some(node.text()),
        };
        let Some(name) = name else {
            return DefinitionResult::default();
        };
        let wanted = |symbol: &Symbol| match node.kind() {
            NodeKind::ExposedType => symbol.kind.is_type(),
            NodeKind::ExposedOperator => symbol.kind == SymbolKind::Operator,
            _ => symbol.kind.is_value(),
        };

        let owner = node.ancestors().find(|a| a.is(NodeKind::ImportClause) || a.is(NodeKind::ModuleDeclaration));
        let symbol = match owner {
            Some(clause) if clause.is(NodeKind::ImportClause) => {
                let module = clause.child_by_field("moduleName").map(|m| m.text()).unwrap_or_default();
                self.program
                    .resolved_modules(file)
                    .get(module)
                    .and_then(|id| self.program.file(*id))
                    .and_then(|target| self.program.bind(target).exposing().find(name, wanted).cloned())
            }
            Some(_) => self.program.bind(file).root_table().find(name, wanted).cloned(),
            None => None,
        };
        symbol.map(DefinitionResult::found).unwrap_or_default()
    }

    /// Record fields are found through the field-reference table of the
    /// record type the access is made on, preferring a declared field type
    fn field_definition(&self, field: SyntaxNode<'_>) -> DefinitionResult {
        let Some(parent) = field.parent() else {
            return DefinitionResult::default();
        };
        let name = field.text();
        let record = match parent.kind() {
            NodeKind::Field => parent.parent().map(|r| self.find_type(r.node_ref())),
            NodeKind::FieldAccessExpr => parent
                .child_by_field("target")
                .map(|t| self.find_type(t.node_ref())),
            NodeKind::FieldAccessorFunctionExpr => match self.find_type(parent.node_ref()) {
                Type::Function(f) => f.params.first().cloned(),
                _ => None,
            },
            _ => None,
        };
        let Some(Type::Record(record)) = record else {
            return DefinitionResult::default();
        };

        let sites = record.field_refs.get(name);
        let declared = sites.iter().find(|site| {
            self.program
                .node(**site)
                .map(|n| n.is(NodeKind::FieldType))
                .unwrap_or(false)
        });
        match declared.or_else(|| sites.first()) {
            Some(site) => DefinitionResult::found(Symbol::new(name, *site, SymbolKind::FieldType)),
            None => DefinitionResult::default(),
        }
    }
}
