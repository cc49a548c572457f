//! Types written in source
//!
//! Annotations, union declarations, type aliases and port signatures are
//! evaluated into [`Type`]s here. Annotation variables are rigid; the
//! parameters of a declared type are flexible so each use instantiates
//! them.

use super::resolve::{lookup_diagnostic, resolve};
use super::*;
use crate::binder::SymbolKind;
use crate::diagnostics::error_codes::types as codes;
use crate::expression::{TypeAliasDeclaration, TypeDeclaration};
use crate::types::{curry, freeze, map_vars, Alias, TVar};
use indexmap::IndexMap;

/// An alias cycle found while expanding; reported once, at `target`
pub(super) struct Cycle {
    target: NodeRef,
    /// Aliases between the target and the point the cycle closed
    chain: Vec<String>,
}

pub(super) struct AliasOutcome {
    pub result: Rc<InferenceResult>,
    pub cycle: Option<Cycle>,
}

impl<'p> TypeChecker<'p> {
    /// Type of a `TypeAnnotation` or `PortAnnotation`
    pub(crate) fn annotation_type(&self, annotation: NodeRef) -> Rc<InferenceResult> {
        if let Some(hit) = self.cached(annotation) {
            return hit;
        }
        let Some((file, node)) = self.locate(annotation) else {
            return Rc::new(InferenceResult::unknown());
        };

        let mut evaluator = Evaluator::new(self, file, true);
        if let Some((top, outer)) = self.outer_annotation(node) {
            self.program
                .cache()
                .borrow_mut()
                .track_annotation(top.node_ref(), annotation);
            evaluator.outer = Some(outer);
        }
        let ty = match node.child_by_field("typeExpression") {
            Some(expression) => evaluator.eval(expression),
            None => Type::Unknown,
        };
        let result = evaluator.finish(ty);
        self.store(annotation, result)
    }

    /// For an annotation inside a `let`, the outermost enclosing top-level
    /// declaration and the node and result of its own annotation
    fn outer_annotation(
        &self,
        node: SyntaxNode<'p>,
    ) -> Option<(SyntaxNode<'p>, (SyntaxNode<'p>, Rc<InferenceResult>))> {
        let top = node
            .ancestors()
            .filter(|a| a.is(NodeKind::ValueDeclaration))
            .last()?;
        let annotation = ValueDeclaration::cast(top)?.annotation()?;
        let annotation = annotation.syntax();
        if annotation == node {
            return None;
        }
        let result = self.annotation_type(annotation.node_ref());
        Some((top, (annotation, result)))
    }

    /// A union declaration: its own type, and each constructor's type at
    /// the variant's node
    pub(crate) fn type_declaration(&self, declaration: NodeRef) -> Rc<InferenceResult> {
        if let Some(hit) = self.cached(declaration) {
            return hit;
        }
        let Some(decl) = self.locate(declaration).and_then(|(file, node)| {
            TypeDeclaration::cast(node).map(|decl| (file, decl))
        }) else {
            return Rc::new(InferenceResult::unknown());
        };
        let (file, decl) = decl;

        let mut evaluator = Evaluator::new(self, file, false);
        let params = evaluator.declare_parameters(decl.type_names());
        let name = decl.name().map(|n| n.text()).unwrap_or_default();
        let ty = Type::union(file.module_name(), name, params);

        for variant in decl.variants() {
            let args: Vec<Type> = variant.args().map(|arg| evaluator.eval(arg)).collect();
            evaluator
                .expression_types
                .insert(variant.syntax().id(), curry(args, ty.clone()));
        }
        let result = evaluator.finish(ty);
        self.store(declaration, result)
    }

    /// A type alias. A cycle that closes at this alias is reported here;
    /// one that closes further out is handed back uncached.
    pub(crate) fn alias_declaration(&self, declaration: NodeRef) -> AliasOutcome {
        if let Some(hit) = self.cached(declaration) {
            return AliasOutcome {
                result: hit,
                cycle: None,
            };
        }
        if self.active_aliases.borrow().contains(&declaration) {
            return AliasOutcome {
                result: Rc::new(InferenceResult::unknown()),
                cycle: Some(Cycle {
                    target: declaration,
                    chain: Vec::new(),
                }),
            };
        }
        let Some((file, alias)) = self.locate(declaration).and_then(|(file, node)| {
            TypeAliasDeclaration::cast(node).map(|alias| (file, alias))
        }) else {
            return AliasOutcome {
                result: Rc::new(InferenceResult::unknown()),
                cycle: None,
            };
        };
        let name = alias.name().map(|n| n.text()).unwrap_or_default();

        self.active_aliases.borrow_mut().push(declaration);
        let mut evaluator = Evaluator::new(self, file, false);
        let params = evaluator.declare_parameters(alias.type_names());
        let ty = match alias.type_expression() {
            Some(expression) => evaluator.eval(expression),
            None => Type::Unknown,
        };
        self.active_aliases.borrow_mut().pop();

        match evaluator.cycle.take() {
            Some(cycle) if cycle.target == declaration => {
                let path: String = cycle.chain.iter().map(|n| format!("{} -> ", n)).collect();
                let span = alias
                    .name()
                    .map(|n| n.span())
                    .unwrap_or_else(|| alias.syntax().span());
                evaluator.diagnostics.push(
                    Diagnostic::error(codes::RECURSIVE_ALIAS)
                        .message(format!(
                            "This type alias is recursive, forming an infinite type: {} -> {}{}",
                            name, path, name
                        ))
                        .span(span)
                        .build(),
                );
                let result = evaluator.finish(Type::Unknown);
                AliasOutcome {
                    result: self.store(declaration, result),
                    cycle: None,
                }
            }
            Some(mut cycle) => {
                cycle.chain.insert(0, name.to_string());
                AliasOutcome {
                    result: Rc::new(evaluator.finish(Type::Unknown)),
                    cycle: Some(cycle),
                }
            }
            None => {
                let aliased = ty.with_alias(Rc::new(Alias {
                    module: file.module_name().to_string(),
                    name: name.to_string(),
                    parameters: params,
                }));
                let result = evaluator.finish(aliased);
                AliasOutcome {
                    result: self.store(declaration, result),
                    cycle: None,
                }
            }
        }
    }
}

struct Evaluator<'c, 'p> {
    checker: &'c TypeChecker<'p>,
    file: &'p SourceFile,
    rigid: bool,
    vars: HashMap<String, Type>,
    /// Annotation of the enclosing top-level declaration, whose variables
    /// a `let` annotation shares
    outer: Option<(SyntaxNode<'p>, Rc<InferenceResult>)>,
    expression_types: HashMap<NodeId, Type>,
    diagnostics: Vec<Diagnostic>,
    cycle: Option<Cycle>,
}

impl<'c, 'p> Evaluator<'c, 'p> {
    fn new(checker: &'c TypeChecker<'p>, file: &'p SourceFile, rigid: bool) -> Self {
        Self {
            checker,
            file,
            rigid,
            vars: HashMap::new(),
            outer: None,
            expression_types: HashMap::new(),
            diagnostics: Vec::new(),
            cycle: None,
        }
    }

    fn declare_parameters(&mut self, names: impl Iterator<Item = SyntaxNode<'p>>) -> Vec<Type> {
        names
            .map(|name| {
                let var = Type::Var(TVar::named(name.text(), false));
                self.vars.insert(name.text().to_string(), var.clone());
                self.expression_types.insert(name.id(), var.clone());
                var
            })
            .collect()
    }

    fn finish(self, ty: Type) -> InferenceResult {
        InferenceResult {
            ty: freeze(&ty),
            expression_types: self
                .expression_types
                .into_iter()
                .map(|(id, ty)| (id, freeze(&ty)))
                .collect(),
            diagnostics: self.diagnostics,
            record_diffs: HashMap::new(),
        }
    }

    fn eval(&mut self, node: SyntaxNode<'p>) -> Type {
        let ty = match node.kind() {
            NodeKind::TypeExpression => {
                let mut segments: Vec<Type> = node
                    .children()
                    .filter(|c| c.field().is_none())
                    .map(|c| self.eval(c))
                    .collect();
                match segments.pop() {
                    Some(last) => curry(segments, last),
                    None => Type::Unknown,
                }
            }
            NodeKind::TypeRef => self.type_ref(node),
            NodeKind::TypeVariable | NodeKind::RecordBaseIdentifier => self.variable(node),
            NodeKind::RecordType => self.record(node),
            NodeKind::TupleType => {
                let items = node
                    .children()
                    .filter(|c| c.field().is_none())
                    .map(|c| self.eval(c))
                    .collect();
                Type::tuple(items)
            }
            NodeKind::UnitExpr => Type::Unit,
            _ => Type::Unknown,
        };
        self.expression_types.insert(node.id(), ty.clone());
        ty
    }

    fn variable(&mut self, node: SyntaxNode<'p>) -> Type {
        let name = node.text();
        if let Some(ty) = self.vars.get(name) {
            return ty.clone();
        }
        let shared = self.outer.as_ref().and_then(|(annotation, result)| {
            annotation
                .descendants()
                .find(|d| d.is(NodeKind::TypeVariable) && d.text() == name)
                .and_then(|d| result.expression_types.get(&d.id()).cloned())
        });
        let ty = shared.unwrap_or_else(|| Type::Var(TVar::named(name, self.rigid)));
        self.vars.insert(name.to_string(), ty.clone());
        ty
    }

    fn record(&mut self, node: SyntaxNode<'p>) -> Type {
        let base = node.child_by_field("baseRecord").map(|b| self.eval(b));
        let mut fields = IndexMap::new();
        let mut sites = Vec::new();
        for field in node.children_by_field("fieldType") {
            let Some(name) = field.child_by_field("name") else {
                continue;
            };
            let ty = match field.child_by_field("typeExpression") {
                Some(expression) => self.eval(expression),
                None => Type::Unknown,
            };
            self.expression_types.insert(field.id(), ty.clone());
            fields.insert(name.text().to_string(), ty);
            sites.push((name.text(), field.node_ref()));
        }
        let ty = Type::record(fields, base);
        if let Type::Record(record) = &ty {
            for (name, site) in sites {
                record.field_refs.add(name, site);
            }
        }
        ty
    }

    fn type_ref(&mut self, node: SyntaxNode<'p>) -> Type {
        let Some(name_node) = node.child_by_field("name") else {
            return Type::Unknown;
        };
        let name = name_node.text();
        let args: Vec<Type> = node
            .children()
            .filter(|c| c.field().is_none())
            .map(|c| self.eval(c))
            .collect();

        let program = self.checker.program;
        let lookup = resolve(program, self.file, node.id(), name, Namespace::Type);
        let symbol = match lookup {
            Lookup::Found(symbol) => symbol,
            other => {
                self.diagnostics
                    .extend(lookup_diagnostic(&other, name, Namespace::Type, name_node.span()));
                return Type::Unknown;
            }
        };
        let Some(declaration) = program.node(symbol.node) else {
            return Type::Unknown;
        };
        let expected = declaration.children_by_field("typeName").count();
        if expected != args.len() {
            self.diagnostics.push(
                Diagnostic::error(codes::TYPE_ARGUMENT_COUNT)
                    .message(format!(
                        "The `{}` type needs {} argument{}, but I see {}",
                        name,
                        expected,
                        if expected == 1 { "" } else { "s" },
                        args.len()
                    ))
                    .span(node.span())
                    .build(),
            );
            return Type::Unknown;
        }

        match symbol.kind {
            SymbolKind::Type => {
                let module = program
                    .file(symbol.node.file)
                    .map(|f| f.module_name())
                    .unwrap_or_default();
                let name = declaration
                    .child_by_field("name")
                    .map(|n| n.text())
                    .unwrap_or(&symbol.name);
                Type::union(module, name, args)
            }
            SymbolKind::TypeAlias => {
                let outcome = self.checker.alias_declaration(symbol.node);
                if let Some(cycle) = outcome.cycle {
                    if self.cycle.is_none() {
                        self.cycle = Some(cycle);
                    }
                    return Type::Unknown;
                }
                let params: Vec<TVar> = declaration
                    .children_by_field("typeName")
                    .filter_map(|p| outcome.result.expression_types.get(&p.id()))
                    .filter_map(|t| t.as_var().cloned())
                    .collect();
                map_vars(&outcome.result.ty, &mut |v| {
                    params.iter().position(|p| p == v).map(|i| args[i].clone())
                })
            }
            _ => Type::Unknown,
        }
    }
}
