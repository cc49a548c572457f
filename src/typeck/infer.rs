//! Expression inference
//!
//! One [`Inference`] runs per top-level value declaration. It walks the
//! declaration's body once, unifying as it goes. Other top-level values
//! are inferred on demand through the checker and instantiated at each
//! use; `let` values are generalized over the variables the surrounding
//! scope does not mention.

use super::operators::{self, OpTree, OperatorError, OperatorInfo};
use super::resolve::{lookup_diagnostic, resolve};
use super::*;
use crate::binder::{Symbol, SymbolKind};
use crate::diagnostics::error_codes::{patterns as pattern_codes, types as codes};
use crate::diagnostics::{Note, Span};
use crate::expression::{
    bound_names, is_float_literal, BinOpPart, CaseOfExpr, Expr, InfixDeclaration, LiteralKind,
};
use crate::types::{
    curry, freeze, instantiate, map_vars, replace, uncurry, DisjointSet, TVar, TypeClass,
    TypeRenderer,
};
use indexmap::IndexMap;
use std::collections::HashSet;

pub(super) fn infer_top_level<'p>(
    checker: &TypeChecker<'p>,
    file: &'p SourceFile,
    node: SyntaxNode<'p>,
) -> Result<InferenceResult, CheckError> {
    let Some(declaration) = ValueDeclaration::cast(node) else {
        return Ok(InferenceResult::unknown());
    };
    let annotation = declaration
        .annotation()
        .map(|a| checker.annotation_type(a.syntax().node_ref()).ty.clone());
    let mut inference = Inference::new(checker, file, node.node_ref(), annotation.clone());
    let own = inference.own_type.clone();

    let ty = inference.value_declaration(declaration, annotation.clone())?;
    if annotation.is_none() {
        let span = declaration.syntax().span();
        inference.expect(&own, &ty, span, node.id());
    }
    Ok(inference.finish(ty))
}

#[derive(Debug, Clone)]
enum LetType {
    /// Monomorphic while its own body is being inferred
    InProgress(Type),
    Done { ty: Type, generic: Vec<TVar> },
}

/// Where a pattern binds, for exhaustiveness reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Site {
    Parameter,
    Lambda,
    Destructuring,
    Case,
}

struct Inference<'c, 'p> {
    checker: &'c TypeChecker<'p>,
    file: &'p SourceFile,
    declaration: NodeRef,
    qualifier: FileQualifier<'p>,
    set: DisjointSet,
    expression_types: HashMap<NodeId, Type>,
    /// Types of pattern-bound names
    bindings: HashMap<NodeId, Type>,
    binding_order: Vec<NodeId>,
    let_types: HashMap<NodeId, LetType>,
    let_stack: Vec<NodeId>,
    /// Type of the declaration itself, for recursive references
    own_type: Type,
    diagnostics: Vec<Diagnostic>,
    pattern_errors: usize,
    record_diffs: HashMap<NodeId, RecordDiff>,
}

impl<'c, 'p> Inference<'c, 'p> {
    fn new(checker: &'c TypeChecker<'p>, file: &'p SourceFile, declaration: NodeRef, annotation: Option<Type>) -> Self {
        Self {
            checker,
            file,
            declaration,
            qualifier: FileQualifier::new(checker.program, file),
            set: DisjointSet::new(),
            expression_types: HashMap::new(),
            bindings: HashMap::new(),
            binding_order: Vec::new(),
            let_types: HashMap::new(),
            let_stack: Vec::new(),
            own_type: annotation.unwrap_or_else(Type::fresh_var),
            diagnostics: Vec::new(),
            pattern_errors: 0,
            record_diffs: HashMap::new(),
        }
    }

    fn program(&self) -> &'p Program {
        self.checker.program
    }

    fn finish(self, ty: Type) -> InferenceResult {
        let set = &self.set;
        InferenceResult {
            ty: freeze(&replace(&ty, set)),
            expression_types: self
                .expression_types
                .iter()
                .map(|(id, ty)| (*id, freeze(&replace(ty, set))))
                .collect(),
            diagnostics: self.diagnostics,
            record_diffs: self.record_diffs,
        }
    }

    // ---------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------

    /// A function or destructuring declaration, top-level or in a `let`
    fn value_declaration(&mut self, declaration: ValueDeclaration<'p>, annotation: Option<Type>) -> Result<Type, CheckError> {
        if let Some(pattern) = declaration.pattern() {
            let body = self.expr_opt(declaration.body())?;
            if let Some(pattern) = SourcePattern::cast(pattern) {
                self.bind_pattern(pattern, body.clone(), Site::Destructuring)?;
            }
            return Ok(body);
        }

        let params: Vec<SyntaxNode<'p>> = declaration.params().collect();
        let (param_types, ret) = match &annotation {
            Some(annotated) => {
                let (mut types, ret) = uncurry(annotated);
                if params.len() > types.len() {
                    let span = declaration
                        .name()
                        .map(|n| n.span())
                        .unwrap_or_else(|| declaration.syntax().span());
                    self.diagnostics.push(
                        Diagnostic::error(codes::PARAMETER_COUNT)
                            .message(format!(
                                "The type annotation for `{}` says it has {} argument{}, but it is defined with {}",
                                declaration.name().map(|n| n.text()).unwrap_or_default(),
                                types.len(),
                                plural(types.len()),
                                params.len()
                            ))
                            .span(span)
                            .build(),
                    );
                    types.resize(params.len(), Type::Unknown);
                    (types, Type::Unknown)
                } else {
                    let rest = types.split_off(params.len());
                    (types, curry(rest, ret))
                }
            }
            None => (params.iter().map(|_| Type::fresh_var()).collect(), Type::fresh_var()),
        };

        for (param, ty) in params.iter().zip(&param_types) {
            if let Some(pattern) = SourcePattern::cast(*param) {
                self.bind_pattern(pattern, ty.clone(), Site::Parameter)?;
            }
        }

        let body = declaration.body();
        let body_type = self.expr_opt(body)?;
        if let Some(body) = body {
            self.expect(&ret, &body_type, body.syntax().span(), body.syntax().id());
        }

        Ok(match annotation {
            Some(annotated) => annotated,
            None => curry(param_types, ret),
        })
    }

    fn infer_let(&mut self, node: SyntaxNode<'p>) -> Result<(), CheckError> {
        self.checker.check_cancelled()?;
        let id = node.id();
        if self.let_types.contains_key(&id) {
            return Ok(());
        }
        let Some(declaration) = ValueDeclaration::cast(node) else {
            return Ok(());
        };
        let annotation = declaration
            .annotation()
            .map(|a| self.checker.annotation_type(a.syntax().node_ref()).ty.clone());
        let own = annotation.clone().unwrap_or_else(Type::fresh_var);

        self.let_types.insert(id, LetType::InProgress(own.clone()));
        self.let_stack.push(id);
        let mark = self.binding_order.len();
        let outcome = self.value_declaration(declaration, annotation.clone());
        self.let_stack.pop();
        let ty = outcome?;

        if declaration.pattern().is_some() {
            self.let_types.insert(id, LetType::Done { ty: ty.clone(), generic: Vec::new() });
            self.expression_types.insert(id, ty);
            return Ok(());
        }
        if annotation.is_none() {
            self.expect(&own, &ty, node.span(), id);
        }

        let resolved = replace(&ty, &self.set);
        let environment = self.environment_vars(mark, id);
        let generic = resolved
            .vars()
            .into_iter()
            .filter(|v| !environment.contains(v))
            .collect();
        self.let_types.insert(
            id,
            LetType::Done {
                ty: resolved.clone(),
                generic,
            },
        );
        self.expression_types.insert(id, resolved);
        Ok(())
    }

    /// Variables the scope around a `let` declaration can still see
    fn environment_vars(&self, mark: usize, current: NodeId) -> HashSet<TVar> {
        let mut out: HashSet<TVar> = replace(&self.own_type, &self.set).vars().into_iter().collect();
        for id in &self.binding_order[..mark] {
            if let Some(ty) = self.bindings.get(id) {
                out.extend(replace(ty, &self.set).vars());
            }
        }
        for (id, state) in &self.let_types {
            if let (LetType::InProgress(ty), false) = (state, *id == current) {
                out.extend(replace(ty, &self.set).vars());
            }
        }
        out
    }

    // ---------------------------------------------------------------
    // References
    // ---------------------------------------------------------------

    fn value_reference(&mut self, name_node: SyntaxNode<'p>) -> Result<Type, CheckError> {
        let name = name_node.text();
        match resolve(self.program(), self.file, name_node.id(), name, Namespace::Value) {
            Lookup::Found(symbol) => self.symbol_type(&symbol, name_node),
            Lookup::Kernel => Ok(Type::Unknown),
            other => {
                self.diagnostics
                    .extend(lookup_diagnostic(&other, name, Namespace::Value, name_node.span()));
                Ok(Type::Unknown)
            }
        }
    }

    fn symbol_type(&mut self, symbol: &Symbol, site: SyntaxNode<'p>) -> Result<Type, CheckError> {
        match symbol.kind {
            SymbolKind::FunctionParameter | SymbolKind::AnonymousFunctionParameter | SymbolKind::CasePattern => {
                Ok(self.bindings.get(&symbol.node.id).cloned().unwrap_or(Type::Unknown))
            }
            SymbolKind::Port => Ok(instantiate(&self.checker.annotation_type(symbol.node).ty)),
            SymbolKind::Function => {
                let Some(target) = self.program().node(symbol.node) else {
                    return Ok(Type::Unknown);
                };
                match target.kind() {
                    NodeKind::ValueDeclaration => {
                        if target.parent().map(|p| p.is(NodeKind::LetInExpr)).unwrap_or(false) {
                            self.let_reference(target, site)
                        } else {
                            self.top_level_reference(symbol.node, target, site)
                        }
                    }
                    NodeKind::LowerPattern => self.destructured_reference(symbol.node, target, site),
                    _ => Ok(Type::Unknown),
                }
            }
            _ => Ok(Type::Unknown),
        }
    }

    fn top_level_reference(
        &mut self,
        declaration: NodeRef,
        target: SyntaxNode<'p>,
        site: SyntaxNode<'p>,
    ) -> Result<Type, CheckError> {
        let Some(value) = ValueDeclaration::cast(target) else {
            return Ok(Type::Unknown);
        };
        let is_self = declaration == self.declaration;
        if is_self && value.params().next().is_none() && value.pattern().is_none() {
            self.recursive_declaration(site, &[declaration]);
            return Ok(Type::Unknown);
        }
        if let Some(annotation) = value.annotation() {
            let annotated = self.checker.annotation_type(annotation.syntax().node_ref());
            return Ok(instantiate(&annotated.ty));
        }
        if is_self {
            return Ok(self.own_type.clone());
        }

        let active = self.checker.active.borrow().clone();
        if let Some(position) = active.iter().position(|a| *a == declaration) {
            let cycle = &active[position..];
            let has_value = cycle.iter().any(|d| {
                self.program()
                    .node(*d)
                    .and_then(ValueDeclaration::cast)
                    .map(|d| d.params().next().is_none())
                    .unwrap_or(false)
            });
            if has_value {
                self.recursive_declaration(site, cycle);
                return Ok(Type::Unknown);
            }
            return Ok(Type::fresh_var());
        }

        let result = self.checker.infer_declaration(declaration)?;
        Ok(instantiate(&result.ty))
    }

    fn recursive_declaration(&mut self, site: SyntaxNode<'p>, cycle: &[NodeRef]) {
        let names: Vec<&str> = cycle
            .iter()
            .filter_map(|d| self.program().node(*d))
            .filter_map(ValueDeclaration::cast)
            .filter_map(|d| d.name().map(|n| n.text()))
            .collect();
        self.diagnostics.push(
            Diagnostic::error(codes::RECURSIVE_DECLARATION)
                .message(cycle_message(&names))
                .span(site.span())
                .build(),
        );
    }

    fn destructured_reference(
        &mut self,
        name: NodeRef,
        target: SyntaxNode<'p>,
        site: SyntaxNode<'p>,
    ) -> Result<Type, CheckError> {
        if name.file == self.declaration.file {
            if let Some(ty) = self.bindings.get(&name.id) {
                return Ok(ty.clone());
            }
        }
        let Some(owner) = target.ancestors().find(|a| a.is(NodeKind::ValueDeclaration)) else {
            return Ok(Type::Unknown);
        };
        if owner.parent().map(|p| p.is(NodeKind::LetInExpr)).unwrap_or(false) {
            if let Some(LetType::InProgress(_)) = self.let_types.get(&owner.id()) {
                self.recursive_let(site, owner.id());
                return Ok(Type::Unknown);
            }
            self.infer_let(owner)?;
            return Ok(self.bindings.get(&name.id).cloned().unwrap_or(Type::Unknown));
        }

        let owner_ref = owner.node_ref();
        if owner_ref == self.declaration || self.checker.active.borrow().contains(&owner_ref) {
            self.recursive_declaration(site, &[owner_ref]);
            return Ok(Type::Unknown);
        }
        let result = self.checker.infer_declaration(owner_ref)?;
        match result.expression_types.get(&name.id) {
            Some(ty) => Ok(instantiate(ty)),
            None => panic!(
                "destructured name `{}` was bound but has no inferred type",
                target.text()
            ),
        }
    }

    fn let_reference(&mut self, target: SyntaxNode<'p>, site: SyntaxNode<'p>) -> Result<Type, CheckError> {
        let id = target.id();
        if !self.let_types.contains_key(&id) {
            self.infer_let(target)?;
        }
        match self.let_types.get(&id).cloned() {
            Some(LetType::InProgress(ty)) => {
                let is_value = ValueDeclaration::cast(target)
                    .map(|d| d.params().next().is_none())
                    .unwrap_or(true);
                if is_value {
                    self.recursive_let(site, id);
                    return Ok(Type::Unknown);
                }
                Ok(ty)
            }
            Some(LetType::Done { ty, generic }) => Ok(self.instantiate_generic(&ty, &generic)),
            None => Ok(Type::Unknown),
        }
    }

    fn recursive_let(&mut self, site: SyntaxNode<'p>, target: NodeId) {
        let tree = self.file.tree();
        let start = self.let_stack.iter().position(|id| *id == target).unwrap_or(0);
        let names: Vec<&str> = self.let_stack[start..]
            .iter()
            .filter_map(|id| tree.get(*id))
            .filter_map(ValueDeclaration::cast)
            .filter_map(|d| d.name().or_else(|| d.pattern()).map(|n| n.text()))
            .collect();
        self.diagnostics.push(
            Diagnostic::error(codes::RECURSIVE_LET)
                .message(cycle_message(&names))
                .span(site.span())
                .build(),
        );
    }

    fn instantiate_generic(&self, ty: &Type, generic: &[TVar]) -> Type {
        let ty = replace(ty, &self.set);
        let mut fresh: HashMap<TVar, Type> = HashMap::new();
        map_vars(&ty, &mut |v| {
            if !generic.contains(v) {
                return None;
            }
            Some(
                fresh
                    .entry(v.clone())
                    .or_insert_with(|| Type::Var(v.copy(false)))
                    .clone(),
            )
        })
    }

    /// Instantiated type of a constructor: a union variant or a record alias
    fn constructor_type(&mut self, name_node: SyntaxNode<'p>) -> Type {
        let name = name_node.text();
        let symbol = match resolve(self.program(), self.file, name_node.id(), name, Namespace::Constructor) {
            Lookup::Found(symbol) => symbol,
            other => {
                self.diagnostics
                    .extend(lookup_diagnostic(&other, name, Namespace::Constructor, name_node.span()));
                return Type::Unknown;
            }
        };
        match symbol.kind {
            SymbolKind::UnionConstructor => {
                let Some(declaration) = self
                    .program()
                    .node(symbol.node)
                    .and_then(|variant| variant.parent())
                else {
                    return Type::Unknown;
                };
                let result = self.checker.type_declaration(declaration.node_ref());
                result
                    .expression_types
                    .get(&symbol.node.id)
                    .map(instantiate)
                    .unwrap_or(Type::Unknown)
            }
            SymbolKind::TypeAlias => {
                let outcome = self.checker.alias_declaration(symbol.node);
                match &outcome.result.ty {
                    Type::Record(record) => {
                        let fields = record.fields.values().cloned().collect();
                        instantiate(&curry(fields, outcome.result.ty.clone()))
                    }
                    _ => Type::Unknown,
                }
            }
            _ => Type::Unknown,
        }
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn expr_opt(&mut self, expr: Option<Expr<'p>>) -> Result<Type, CheckError> {
        match expr {
            Some(expr) => self.expr(expr),
            None => Ok(Type::Unknown),
        }
    }

    fn expr(&mut self, expr: Expr<'p>) -> Result<Type, CheckError> {
        let ty = self.infer_expr(expr)?;
        self.expression_types.insert(expr.syntax().id(), ty.clone());
        Ok(ty)
    }

    fn infer_expr(&mut self, expr: Expr<'p>) -> Result<Type, CheckError> {
        let node = expr.syntax();
        let ty = match expr {
            Expr::Value(value) => match value.name() {
                Some(name) if value.is_constructor() => self.constructor_type(name),
                Some(name) => self.value_reference(name)?,
                None => Type::Unknown,
            },
            Expr::Call(call) => {
                let target = call.target();
                let function = self.expr_opt(target)?;
                let mut args = Vec::new();
                for arg in call.args() {
                    let ty = self.expr(arg)?;
                    args.push((arg.syntax().span(), arg.syntax().id(), ty));
                }
                let name = match target {
                    Some(Expr::Value(value)) => format!("`{}`", value.syntax().text()),
                    _ => "This function".to_string(),
                };
                self.apply(function, args, (node.span(), node.id()), &name)
            }
            Expr::BinOp(binop) => {
                let parts: Vec<_> = binop.parts().collect();
                match operators::build(parts, |op| self.operator_info(op)) {
                    Ok(tree) => self.op_tree(&tree)?,
                    Err(error) => {
                        if let OperatorError::NonAssociative { first, second } = error {
                            self.diagnostics.push(
                                Diagnostic::error(codes::NON_ASSOCIATIVE_OPERATOR)
                                    .message(format!(
                                        "You cannot mix `{}` and `{}` without parentheses",
                                        first.text(),
                                        second.text()
                                    ))
                                    .span(node.span())
                                    .build(),
                            );
                        }
                        for part in binop.parts() {
                            if let BinOpPart::Operand(operand) = part {
                                self.expr(operand)?;
                            }
                        }
                        Type::Unknown
                    }
                }
            }
            Expr::OperatorFunction(function) => match function.operator() {
                Some(op) => self.operator_type(op)?,
                None => Type::Unknown,
            },
            Expr::Number(number) => {
                if is_float_literal(number.text()) {
                    Type::float()
                } else {
                    Type::class_var(TypeClass::Number)
                }
            }
            Expr::String(_) => Type::string(),
            Expr::Char(_) => Type::char(),
            Expr::Unit(_) => Type::Unit,
            Expr::Parenthesized(inner) => self.expr_opt(inner.expression())?,
            Expr::Tuple(tuple) => {
                let mut items = Vec::new();
                for item in tuple.items() {
                    items.push(self.expr(item)?);
                }
                Type::tuple(items)
            }
            Expr::List(list) => {
                let element = Type::fresh_var();
                for item in list.items() {
                    let ty = self.expr(item)?;
                    self.expect(&element, &ty, item.syntax().span(), item.syntax().id());
                }
                Type::list(element)
            }
            Expr::Record(record) => {
                let mut fields = IndexMap::new();
                let mut sites = Vec::new();
                for field in record.fields() {
                    let Some(name) = field.name() else {
                        continue;
                    };
                    let ty = self.expr_opt(field.expression())?;
                    fields.insert(name.text().to_string(), ty);
                    sites.push((name.text(), field.syntax().node_ref()));
                }
                match record.base_record() {
                    None => with_field_refs(Type::record(fields, None), &sites),
                    Some(base) => {
                        let base_type = self.value_reference(base)?;
                        self.expression_types.insert(base.id(), base_type.clone());
                        let update = with_field_refs(Type::record(fields, Some(Type::fresh_var())), &sites);
                        if self.expect(&base_type, &update, node.span(), node.id()) {
                            base_type
                        } else {
                            Type::Unknown
                        }
                    }
                }
            }
            Expr::FieldAccess(access) => {
                let target = access.target();
                let record = self.expr_opt(target)?;
                match access.field() {
                    Some(field) => {
                        let target_span = target.map(|t| t.syntax().span()).unwrap_or_else(|| node.span());
                        self.field_access(record, field, target_span)
                    }
                    None => Type::Unknown,
                }
            }
            Expr::FieldAccessor(accessor) => match accessor.field() {
                Some(field) => {
                    let name = field.text().trim_start_matches('.');
                    let value = Type::fresh_var();
                    let mut fields = IndexMap::new();
                    fields.insert(name.to_string(), value.clone());
                    let record = with_field_refs(
                        Type::record(fields, Some(Type::fresh_var())),
                        &[(name, field.node_ref())],
                    );
                    Type::function(vec![record], value)
                }
                None => Type::Unknown,
            },
            Expr::Negate(negate) => {
                let inner = negate.expression();
                let ty = self.expr_opt(inner)?;
                if let Some(inner) = inner {
                    self.expect(&Type::class_var(TypeClass::Number), &ty, inner.syntax().span(), inner.syntax().id());
                }
                ty
            }
            Expr::Lambda(lambda) => {
                self.checker.check_cancelled()?;
                let mut params = Vec::new();
                for param in lambda.params() {
                    let ty = Type::fresh_var();
                    if let Some(pattern) = SourcePattern::cast(param) {
                        self.bind_pattern(pattern, ty.clone(), Site::Lambda)?;
                    }
                    params.push(ty);
                }
                let body = self.expr_opt(lambda.body())?;
                curry(params, body)
            }
            Expr::If(branch) => {
                let condition = branch.condition();
                let ty = self.expr_opt(condition)?;
                if let Some(condition) = condition {
                    self.expect(&Type::bool(), &ty, condition.syntax().span(), condition.syntax().id());
                }
                let then_type = self.expr_opt(branch.then_branch())?;
                let otherwise = branch.else_branch();
                let else_type = self.expr_opt(otherwise)?;
                if let Some(otherwise) = otherwise {
                    self.expect(&then_type, &else_type, otherwise.syntax().span(), otherwise.syntax().id());
                }
                then_type
            }
            Expr::Case(case) => self.case(case)?,
            Expr::Let(let_in) => {
                self.checker.check_cancelled()?;
                for declaration in let_in.declarations() {
                    self.infer_let(declaration.syntax())?;
                }
                self.expr_opt(let_in.body())?
            }
            Expr::Error(_) => Type::Unknown,
        };
        Ok(ty)
    }

    /// Apply a function type to arguments one at a time
    fn apply(
        &mut self,
        function: Type,
        args: Vec<(Span, NodeId, Type)>,
        call: (Span, NodeId),
        name: &str,
    ) -> Type {
        let expected = replace(&function, &self.set).arity();
        let count = args.len();
        let mut current = function;
        for (span, id, arg_type) in args {
            match self.set.get(&current) {
                Type::Function(f) if !f.params.is_empty() => {
                    let param = f.params[0].clone();
                    let rest = curry(f.params[1..].to_vec(), f.ret.clone());
                    if !self.expect(&param, &arg_type, span, id) {
                        return Type::Unknown;
                    }
                    current = rest;
                }
                Type::Var(var) if !var.is_rigid() => {
                    let ret = Type::fresh_var();
                    let function = Type::function(vec![arg_type], ret.clone());
                    if !self.expect(&Type::Var(var), &function, call.0.clone(), call.1) {
                        return Type::Unknown;
                    }
                    current = ret;
                }
                Type::Unknown => return Type::Unknown,
                _ => {
                    self.diagnostics.push(
                        Diagnostic::error(codes::ARGUMENT_COUNT)
                            .message(format!(
                                "{} expects {} argument{}, but it got {} instead",
                                name,
                                expected,
                                plural(expected),
                                count
                            ))
                            .span(call.0.clone())
                            .build(),
                    );
                    return Type::Unknown;
                }
            }
        }
        current
    }

    fn field_access(&mut self, record: Type, field: SyntaxNode<'p>, target: Span) -> Type {
        let name = field.text().trim_start_matches('.');
        let site = field.node_ref();
        match self.set.get(&record) {
            Type::Var(var) if !var.is_rigid() && var.class().is_none() => {
                let value = Type::fresh_var();
                let mut fields = IndexMap::new();
                fields.insert(name.to_string(), value.clone());
                let shape = Type::mutable_record(fields, Type::fresh_var());
                if let Type::MutableRecord(shape) = &shape {
                    shape.borrow().field_refs.add(name, site);
                }
                self.set.union(&var, shape);
                value
            }
            Type::MutableRecord(shape) => {
                let mut shape = shape.borrow_mut();
                shape.field_refs.add(name, site);
                shape
                    .fields
                    .entry(name.to_string())
                    .or_insert_with(Type::fresh_var)
                    .clone()
            }
            Type::Record(_) => {
                let value = Type::fresh_var();
                let mut fields = IndexMap::new();
                fields.insert(name.to_string(), value.clone());
                let open = with_field_refs(Type::record(fields, Some(Type::fresh_var())), &[(name, site)]);
                if unify(&mut self.set, &open, &record).is_err() {
                    let rendered = self.render(&record);
                    self.diagnostics.push(
                        Diagnostic::error(codes::RECORD_FIELD)
                            .message(format!("This record does not have a `{}` field", name))
                            .span(field.span())
                            .note(Note::new(format!("The record is `{}`", rendered)).with_span(target))
                            .build(),
                    );
                    return Type::Unknown;
                }
                value
            }
            Type::Unknown => Type::Unknown,
            other => {
                let rendered = self.render(&other);
                self.diagnostics.push(
                    Diagnostic::error(codes::RECORD_ACCESS)
                        .message(format!(
                            "This is not a record, so it has no `{}` field to access; it is `{}`",
                            name, rendered
                        ))
                        .span(target)
                        .build(),
                );
                Type::Unknown
            }
        }
    }

    fn case(&mut self, case: CaseOfExpr<'p>) -> Result<Type, CheckError> {
        let scrutinee = self.expr_opt(case.scrutinee())?;
        let errors_before = self.pattern_errors;
        let mut result: Option<Type> = None;
        for branch in case.branches() {
            self.checker.check_cancelled()?;
            if let Some(pattern) = branch.pattern().and_then(SourcePattern::cast) {
                self.bind_pattern(pattern, scrutinee.clone(), Site::Case)?;
            }
            let expr = branch.expr();
            let ty = self.expr_opt(expr)?;
            match (&result, expr) {
                (None, _) => result = Some(ty),
                (Some(first), Some(expr)) => {
                    let first = first.clone();
                    self.expect(&first, &ty, expr.syntax().span(), expr.syntax().id());
                }
                (Some(_), None) => {}
            }
        }
        if self.pattern_errors == errors_before {
            self.check_branches(case);
        }
        Ok(result.unwrap_or(Type::Unknown))
    }

    fn check_branches(&mut self, case: CaseOfExpr<'p>) {
        let mut nodes = Vec::new();
        let mut rows = Vec::new();
        for pattern in case.branches().filter_map(|b| b.pattern()) {
            let Some(source) = SourcePattern::cast(pattern) else {
                continue;
            };
            rows.push(patterns::simplify(source, &mut |n| self.checker.union_of(self.file, n)));
            nodes.push(pattern);
        }
        let check = patterns::check_case(rows);

        if !check.missing.is_empty() {
            let missing: Vec<String> = check.missing.iter().map(patterns::pattern_to_doc).collect();
            let end = case.scrutinee().map(|s| s.syntax().end()).unwrap_or(case.syntax().end());
            self.diagnostics.push(
                Diagnostic::error(pattern_codes::INCOMPLETE_CASE)
                    .message(format!(
                        "This `case` does not have branches for all possibilities; missing: {}",
                        missing.join(", ")
                    ))
                    .span(self.file.tree().span(case.syntax().start(), end))
                    .note(Note::new(
                        "Add a branch for each missing pattern, or a `_` branch to cover the rest",
                    ))
                    .build(),
            );
        }
        for index in check.redundant {
            if let Some(node) = nodes.get(index) {
                self.diagnostics.push(
                    Diagnostic::warning(pattern_codes::REDUNDANT_PATTERN)
                        .message(format!(
                            "Branch {} is redundant: the branches above it already cover every value it matches",
                            index + 1
                        ))
                        .span(node.span())
                        .build(),
                );
            }
        }
    }

    // ---------------------------------------------------------------
    // Operators
    // ---------------------------------------------------------------

    fn infix_declaration(&self, op: SyntaxNode<'p>) -> Option<(&'p SourceFile, InfixDeclaration<'p>)> {
        let program = self.program();
        let symbol = resolve(program, self.file, op.id(), op.text(), Namespace::Operator).symbol()?;
        let file = program.file(symbol.node.file)?;
        let infix = InfixDeclaration::cast(program.node(symbol.node)?)?;
        Some((file, infix))
    }

    fn operator_info(&self, op: SyntaxNode<'p>) -> OperatorInfo {
        match self.infix_declaration(op) {
            Some((_, infix)) => OperatorInfo {
                precedence: infix.precedence(),
                associativity: infix.associativity(),
            },
            None => OperatorInfo::default(),
        }
    }

    fn operator_type(&mut self, op: SyntaxNode<'p>) -> Result<Type, CheckError> {
        let Some((file, infix)) = self.infix_declaration(op) else {
            let lookup = resolve(self.program(), self.file, op.id(), op.text(), Namespace::Operator);
            self.diagnostics
                .extend(lookup_diagnostic(&lookup, op.text(), Namespace::Operator, op.span()));
            return Ok(Type::Unknown);
        };
        let Some(name) = infix.function().and_then(|f| f.child_by_field("name")) else {
            return Ok(Type::Unknown);
        };
        let program = self.program();
        let symbol = match resolve(program, file, name.id(), name.text(), Namespace::Value) {
            Lookup::Found(symbol) if symbol.kind == SymbolKind::Function => symbol,
            Lookup::Kernel => return Ok(Type::Unknown),
            _ => {
                tracing::warn!(operator = op.text(), function = name.text(), "infix function does not resolve");
                return Ok(Type::Unknown);
            }
        };
        let Some(target) = program.node(symbol.node) else {
            return Ok(Type::Unknown);
        };
        let ty = self.top_level_reference(symbol.node, target, op)?;
        match self.set.get(&ty) {
            Type::Function(_) | Type::Var(_) | Type::Unknown => {}
            other => panic!("operator `{}` is bound to a non-function type {:?}", op.text(), other),
        }
        self.expression_types.insert(op.id(), ty.clone());
        Ok(ty)
    }

    fn op_tree(&mut self, tree: &OpTree<'p>) -> Result<Type, CheckError> {
        match tree {
            OpTree::Operand(expr) => self.expr(*expr),
            OpTree::Binary { op, left, right } => {
                let left_type = self.op_tree(left)?;
                let right_type = self.op_tree(right)?;
                let function = self.operator_type(*op)?;
                let args = vec![
                    (tree_span(left), tree_id(left), left_type),
                    (tree_span(right), tree_id(right), right_type),
                ];
                let name = format!("`({})`", op.text());
                Ok(self.apply(function, args, (tree_span(tree), op.id()), &name))
            }
        }
    }

    // ---------------------------------------------------------------
    // Patterns
    // ---------------------------------------------------------------

    fn bind_pattern(&mut self, pattern: SourcePattern<'p>, ty: Type, site: Site) -> Result<(), CheckError> {
        let errors_before = self.pattern_errors;
        self.pattern(pattern, ty);
        if site == Site::Case || self.pattern_errors != errors_before {
            return Ok(());
        }

        let row = patterns::simplify(pattern, &mut |n| self.checker.union_of(self.file, n));
        let check = patterns::check_case(vec![row]);
        if !check.missing.is_empty() {
            let missing: Vec<String> = check.missing.iter().map(patterns::pattern_to_doc).collect();
            let place = match site {
                Site::Parameter => "function argument",
                Site::Lambda => "anonymous function argument",
                _ => "destructuring",
            };
            self.diagnostics.push(
                Diagnostic::error(pattern_codes::INCOMPLETE_PATTERN)
                    .message(format!(
                        "This {} pattern does not cover all possible values; missing: {}",
                        place,
                        missing.join(", ")
                    ))
                    .span(pattern.syntax().span())
                    .build(),
            );
        }
        Ok(())
    }

    fn bind(&mut self, name: SyntaxNode<'p>, ty: Type) {
        self.bindings.insert(name.id(), ty.clone());
        self.binding_order.push(name.id());
        self.expression_types.insert(name.id(), ty);
    }

    fn bind_unknown(&mut self, pattern: SourcePattern<'p>) {
        let mut names = Vec::new();
        bound_names(pattern, &mut names);
        for name in names {
            self.bind(name, Type::Unknown);
        }
    }

    /// Check a pattern's own shape against the type it must match. On a
    /// mismatch its names are bound to `Unknown`.
    fn pattern_shape(&mut self, pattern: SourcePattern<'p>, shape: &Type, expected: &Type) -> bool {
        if unify(&mut self.set, expected, shape).is_ok() {
            return true;
        }
        let mut renderer = self.renderer();
        let shape = renderer.render(&replace(shape, &self.set));
        let expected = renderer.render(&replace(expected, &self.set));
        self.diagnostics.push(
            Diagnostic::error(codes::INVALID_PATTERN)
                .message(format!(
                    "This pattern matches values of type `{}`, but the value being matched is `{}`",
                    shape, expected
                ))
                .span(pattern.syntax().span())
                .build(),
        );
        self.pattern_errors += 1;
        self.bind_unknown(pattern);
        false
    }

    fn pattern(&mut self, pattern: SourcePattern<'p>, expected: Type) {
        let node = pattern.syntax();
        self.expression_types.insert(node.id(), expected.clone());
        match pattern {
            SourcePattern::Lower(name) => self.bind(name, expected),
            SourcePattern::Anything(_) | SourcePattern::Error(_) => {}
            SourcePattern::As(_) => {
                if let Some((inner, name)) = pattern.as_parts() {
                    self.pattern(inner, expected.clone());
                    self.bind(name, expected);
                }
            }
            SourcePattern::Unit(_) => {
                self.pattern_shape(pattern, &Type::Unit, &expected);
            }
            SourcePattern::Literal(_, kind) => {
                let shape = match kind {
                    LiteralKind::Int => Type::int(),
                    LiteralKind::Float => Type::float(),
                    LiteralKind::String => Type::string(),
                    LiteralKind::Char => Type::char(),
                };
                self.pattern_shape(pattern, &shape, &expected);
            }
            SourcePattern::Tuple(tuple) => {
                let items: Vec<SourcePattern<'p>> = tuple.items().collect();
                let types: Vec<Type> = items.iter().map(|_| Type::fresh_var()).collect();
                if self.pattern_shape(pattern, &Type::tuple(types.clone()), &expected) {
                    for (item, ty) in items.into_iter().zip(types) {
                        self.pattern(item, ty);
                    }
                }
            }
            SourcePattern::List(list) => {
                let element = Type::fresh_var();
                if self.pattern_shape(pattern, &Type::list(element.clone()), &expected) {
                    for item in list.items() {
                        self.pattern(item, element.clone());
                    }
                }
            }
            SourcePattern::Cons(cons) => {
                let element = Type::fresh_var();
                let list = Type::list(element.clone());
                if self.pattern_shape(pattern, &list, &expected) {
                    if let Some(head) = cons.head() {
                        self.pattern(head, element);
                    }
                    if let Some(tail) = cons.tail() {
                        self.pattern(tail, list);
                    }
                }
            }
            SourcePattern::Record(record) => {
                let names: Vec<SyntaxNode<'p>> = record.fields().collect();
                let mut fields = IndexMap::new();
                let mut sites = Vec::new();
                for name in &names {
                    fields.insert(name.text().to_string(), Type::fresh_var());
                    sites.push((name.text(), name.node_ref()));
                }
                let shape = with_field_refs(Type::record(fields.clone(), Some(Type::fresh_var())), &sites);
                if self.pattern_shape(pattern, &shape, &expected) {
                    for name in names {
                        let ty = fields.get(name.text()).cloned().unwrap_or(Type::Unknown);
                        self.bind(name, ty);
                    }
                }
            }
            SourcePattern::Union(union) => {
                let Some(constructor) = union.constructor() else {
                    self.bind_unknown(pattern);
                    return;
                };
                let ctor = self.constructor_type(constructor);
                if ctor.is_unknown() {
                    self.pattern_errors += 1;
                    self.bind_unknown(pattern);
                    return;
                }
                let (params, ret) = uncurry(&ctor);
                let args: Vec<SourcePattern<'p>> = union.args().collect();
                if params.len() != args.len() {
                    self.diagnostics.push(
                        Diagnostic::error(codes::ARGUMENT_COUNT)
                            .message(format!(
                                "The `{}` constructor needs {} argument{}, but this pattern has {}",
                                constructor.text(),
                                params.len(),
                                plural(params.len()),
                                args.len()
                            ))
                            .span(node.span())
                            .build(),
                    );
                    self.pattern_errors += 1;
                    self.bind_unknown(pattern);
                    return;
                }
                if self.pattern_shape(pattern, &ret, &expected) {
                    for (arg, param) in args.into_iter().zip(params) {
                        self.pattern(arg, param);
                    }
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Reporting
    // ---------------------------------------------------------------

    fn renderer(&self) -> TypeRenderer<'_> {
        TypeRenderer::new(Some(&self.qualifier))
    }

    fn render(&self, ty: &Type) -> String {
        self.renderer().render(&replace(ty, &self.set))
    }

    /// Unify, reporting a mismatch at `span`. Returns whether it succeeded.
    fn expect(&mut self, expected: &Type, actual: &Type, span: Span, node: NodeId) -> bool {
        let error = match unify(&mut self.set, expected, actual) {
            Ok(()) => return true,
            Err(error) => error,
        };
        let mut renderer = self.renderer();
        let expected_text = renderer.render(&replace(expected, &self.set));
        let actual_text = renderer.render(&replace(actual, &self.set));

        let diagnostic = match error {
            UnifyError::Infinite(_) => Diagnostic::error(codes::INFINITE_TYPE)
                .message(format!(
                    "This expression would need an infinite type: `{}` would have to contain `{}`",
                    actual_text, expected_text
                ))
                .span(span),
            UnifyError::Mismatch => Diagnostic::error(codes::TYPE_MISMATCH)
                .message(format!("Type mismatch: expected `{}`, found `{}`", expected_text, actual_text))
                .span(span),
            UnifyError::Record(diff) => {
                let mut builder = Diagnostic::error(codes::TYPE_MISMATCH)
                    .message(format!("Type mismatch: expected `{}`, found `{}`", expected_text, actual_text))
                    .span(span);
                for field in &diff.missing {
                    builder = builder.note(Note::new(format!("Missing field `{}`", field)));
                }
                for field in &diff.extra {
                    builder = builder.note(Note::new(format!("Extra field `{}`", field)));
                }
                for (field, expected, actual) in &diff.mismatched {
                    builder = builder.note(Note::new(format!(
                        "Field `{}` expected `{}`, found `{}`",
                        field,
                        renderer.render(expected),
                        renderer.render(actual)
                    )));
                }
                self.record_diffs.insert(node, diff);
                builder
            }
        };
        self.diagnostics.push(diagnostic.build());
        false
    }
}

fn with_field_refs(ty: Type, sites: &[(&str, NodeRef)]) -> Type {
    if let Type::Record(record) = &ty {
        for (name, site) in sites {
            record.field_refs.add(name, *site);
        }
    }
    ty
}

/// `a -> b -> a` style description of a definition cycle
fn cycle_message(names: &[&str]) -> String {
    match names {
        [] => "This value is defined in terms of itself".to_string(),
        [name] => format!("`{}` is defined directly in terms of itself, causing an infinite loop", name),
        [first, ..] => format!(
            "These values are defined in terms of each other, causing an infinite loop: {} -> {}",
            names.join(" -> "),
            first
        ),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Node an operand's record diff is filed under: the expression itself,
/// or the operator that combines a sub-chain
fn tree_id(tree: &OpTree<'_>) -> NodeId {
    match tree {
        OpTree::Operand(expr) => expr.syntax().id(),
        OpTree::Binary { op, .. } => op.id(),
    }
}

fn tree_span(tree: &OpTree<'_>) -> Span {
    match tree {
        OpTree::Operand(expr) => expr.syntax().span(),
        OpTree::Binary { left, right, .. } => tree_span(left).merge(&tree_span(right)),
    }
}
