//! Type checker
//!
//! Demand-driven inference over a [`Program`]. Each top-level declaration,
//! annotation, type declaration and alias is inferred on its own and the
//! result memoized in the program's [`TypeCache`]; asking for a file's
//! diagnostics walks its top-level nodes and collects their results.

mod cache;
mod definition;
mod infer;
mod operators;
mod resolve;
mod type_expression;
mod unify;

#[cfg(test)]
mod tests;

pub use cache::{CacheStats, TypeCache};
pub use definition::DefinitionResult;
pub use resolve::{split_qualified, Lookup, Namespace};
pub use unify::{unify, RecordDiff, UnifyError};

use crate::diagnostics::error_codes::{resolution, suggestions};
use crate::diagnostics::{Diagnostic, DiagnosticBag, Suggestion};
use crate::error::CheckError;
use crate::expression::{CaseOfExpr, Pattern as SourcePattern, ValueDeclaration};
use crate::imports::Imports;
use crate::patterns::{self, CtorInfo, DecisionTree, Union};
use crate::program::{Program, SourceFile};
use crate::syntax::{NodeId, NodeKind, NodeRef, SyntaxNode};
use crate::types::{type_to_string, Qualifier, Type};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of inferring one declaration, annotation or type
#[derive(Debug, Clone)]
pub struct InferenceResult {
    pub ty: Type,
    /// Type of every expression, pattern and type node below the inferred node
    pub expression_types: HashMap<NodeId, Type>,
    pub diagnostics: Vec<Diagnostic>,
    /// Field-level detail of record mismatches, by the node they were reported at
    pub record_diffs: HashMap<NodeId, RecordDiff>,
}

impl InferenceResult {
    pub fn unknown() -> Self {
        Self {
            ty: Type::Unknown,
            expression_types: HashMap::new(),
            diagnostics: Vec::new(),
            record_diffs: HashMap::new(),
        }
    }
}

/// Shared flag a host flips to stop a running check
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Entry point for every type question about a program
pub struct TypeChecker<'p> {
    program: &'p Program,
    /// Top-level value declarations being inferred, outermost first
    active: RefCell<Vec<NodeRef>>,
    /// Type aliases being expanded, outermost first
    active_aliases: RefCell<Vec<NodeRef>>,
    token: RefCell<Option<CancellationToken>>,
    /// Pattern-engine view of union declarations
    unions: RefCell<HashMap<NodeRef, Rc<Union>>>,
}

impl<'p> TypeChecker<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            active: RefCell::new(Vec::new()),
            active_aliases: RefCell::new(Vec::new()),
            token: RefCell::new(None),
            unions: RefCell::new(HashMap::new()),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), CheckError> {
        match &*self.token.borrow() {
            Some(token) if token.is_cancelled() => Err(CheckError::Cancelled),
            _ => Ok(()),
        }
    }

    fn locate(&self, node: NodeRef) -> Option<(&'p SourceFile, SyntaxNode<'p>)> {
        let file = self.program.file(node.file)?;
        let syntax = file.tree().get(node.id)?;
        Some((file, syntax))
    }

    fn cached(&self, node: NodeRef) -> Option<Rc<InferenceResult>> {
        let project = self.program.is_project_node(node);
        self.program.cache().borrow_mut().get(node, project)
    }

    fn store(&self, node: NodeRef, result: InferenceResult) -> Rc<InferenceResult> {
        let result = Rc::new(result);
        let project = self.program.is_project_node(node);
        self.program
            .cache()
            .borrow_mut()
            .insert(node, project, Rc::clone(&result));
        result
    }

    /// Infer a top-level value declaration. A run interrupted by
    /// cancellation leaves nothing in the cache.
    pub(crate) fn infer_declaration(&self, declaration: NodeRef) -> Result<Rc<InferenceResult>, CheckError> {
        if let Some(hit) = self.cached(declaration) {
            return Ok(hit);
        }
        self.check_cancelled()?;
        let Some((file, node)) = self.locate(declaration) else {
            return Ok(Rc::new(InferenceResult::unknown()));
        };

        let _span = tracing::debug_span!("infer", uri = file.uri(), start = node.start()).entered();
        self.active.borrow_mut().push(declaration);
        let outcome = infer::infer_top_level(self, file, node);
        self.active.borrow_mut().pop();
        Ok(self.store(declaration, outcome?))
    }

    /// The pattern-engine union of the constructor named by `name_node`
    pub(crate) fn union_of(&self, file: &SourceFile, name_node: SyntaxNode<'_>) -> Option<Rc<Union>> {
        let symbol = resolve::resolve(
            self.program,
            file,
            name_node.id(),
            name_node.text(),
            Namespace::Constructor,
        )
        .symbol()?;
        let variant = self.program.node(symbol.node)?;
        let declaration = variant.parent().filter(|p| p.is(NodeKind::TypeDeclaration))?;
        let key = declaration.node_ref();
        if let Some(union) = self.unions.borrow().get(&key) {
            return Some(Rc::clone(union));
        }

        let module = self.program.file(key.file)?.module_name();
        let name = declaration.child_by_field("name")?.text();
        let alts = declaration
            .children_by_field("unionVariant")
            .filter_map(|v| {
                let name = v.child_by_field("name")?.text().to_string();
                let arity = v.children().filter(|c| c.field().is_none() && !c.is(NodeKind::Error)).count();
                Some(CtorInfo { name, arity })
            })
            .collect();
        let union = Union::new(module, name, alts);
        self.unions.borrow_mut().insert(key, Rc::clone(&union));
        Some(union)
    }

    fn simplified_branches(&self, case: NodeRef) -> Option<Vec<patterns::Pattern>> {
        let (file, node) = self.locate(case)?;
        let case = CaseOfExpr::cast(node)?;
        let rows = case
            .branches()
            .filter_map(|b| b.pattern().and_then(SourcePattern::cast))
            .map(|p| patterns::simplify(p, &mut |n| self.union_of(file, n)))
            .collect();
        Some(rows)
    }

    // ---------------------------------------------------------------
    // Host operations
    // ---------------------------------------------------------------

    /// Type of any node: an expression, a pattern, a type or a declaration
    pub fn find_type(&self, node: NodeRef) -> Type {
        let Some((_, syntax)) = self.locate(node) else {
            return Type::Unknown;
        };
        let target = owner_of_name(syntax);

        if let Some(annotation) = std::iter::once(target)
            .chain(target.ancestors())
            .find(|n| n.is(NodeKind::TypeAnnotation) || n.is(NodeKind::PortAnnotation))
        {
            let result = self.annotation_type(annotation.node_ref());
            return type_at(&result, annotation, target);
        }

        let Some(top) = std::iter::once(target)
            .chain(target.ancestors())
            .find(|n| n.parent().map(|p| p.is(NodeKind::File)).unwrap_or(false))
        else {
            return Type::Unknown;
        };
        let result = match top.kind() {
            NodeKind::ValueDeclaration => match self.infer_declaration(top.node_ref()) {
                Ok(result) => result,
                Err(_) => return Type::Unknown,
            },
            NodeKind::TypeDeclaration => self.type_declaration(top.node_ref()),
            NodeKind::TypeAliasDeclaration => self.alias_declaration(top.node_ref()).result,
            _ => return Type::Unknown,
        };
        type_at(&result, top, target)
    }

    /// Semantic diagnostics of `file`. With a token, cancellation is
    /// checked before every top-level node and at every inference scope.
    pub fn get_diagnostics(&self, file: &SourceFile, token: Option<&CancellationToken>) -> Result<Vec<Diagnostic>, CheckError> {
        let previous = self.token.replace(token.cloned());
        let outcome = self.collect_diagnostics(file);
        self.token.replace(previous);
        outcome
    }

    fn collect_diagnostics(&self, file: &SourceFile) -> Result<Vec<Diagnostic>, CheckError> {
        tracing::debug!(uri = file.uri(), "collecting diagnostics");
        let mut bag = DiagnosticBag::new();
        bag.extend(self.import_diagnostics(file));
        for child in file.root().children() {
            self.check_cancelled()?;
            bag.extend(self.check_top_level(child)?);
        }
        bag.dedup();
        Ok(bag.take())
    }

    /// Same as [`get_diagnostics`](Self::get_diagnostics), yielding to the
    /// executor between top-level nodes
    pub async fn get_diagnostics_async(
        &self,
        file: &SourceFile,
        token: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, CheckError> {
        let previous = self.token.replace(token.cloned());
        let outcome = self.collect_diagnostics_async(file).await;
        self.token.replace(previous);
        outcome
    }

    async fn collect_diagnostics_async(&self, file: &SourceFile) -> Result<Vec<Diagnostic>, CheckError> {
        let mut bag = DiagnosticBag::new();
        bag.extend(self.import_diagnostics(file));
        for child in file.root().children() {
            self.check_cancelled()?;
            bag.extend(self.check_top_level(child)?);
            tokio::task::yield_now().await;
        }
        bag.dedup();
        Ok(bag.take())
    }

    fn import_diagnostics(&self, file: &SourceFile) -> Vec<Diagnostic> {
        let resolved = self.program.resolved_modules(file);
        let mut out: Vec<Diagnostic> = file
            .root()
            .children_of_kind(NodeKind::ImportClause)
            .filter_map(|clause| clause.child_by_field("moduleName"))
            .filter(|name| !resolved.contains_key(name.text()))
            .map(|name| {
                Diagnostic::error(resolution::IMPORT_MISSING)
                    .message(format!("I cannot find a `{}` module to import", name.text()))
                    .span(name.span())
                    .build()
            })
            .collect();
        out.extend(self.program.imports(file).diagnostics().iter().cloned());
        out
    }

    fn check_top_level(&self, node: SyntaxNode<'_>) -> Result<Vec<Diagnostic>, CheckError> {
        let key = node.node_ref();
        let result = match node.kind() {
            NodeKind::ValueDeclaration => self.infer_declaration(key)?,
            NodeKind::TypeAnnotation | NodeKind::PortAnnotation => self.annotation_type(key),
            NodeKind::TypeDeclaration => self.type_declaration(key),
            NodeKind::TypeAliasDeclaration => self.alias_declaration(key).result,
            _ => return Ok(Vec::new()),
        };
        Ok(result.diagnostics.clone())
    }

    /// Parse and binding diagnostics
    pub fn get_syntactic_diagnostics(&self, file: &SourceFile) -> Vec<Diagnostic> {
        self.program.bind(file).diagnostics().to_vec()
    }

    /// Hints for top-level declarations without a type annotation
    pub fn get_suggestion_diagnostics(&self, file: &SourceFile) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for declaration in file.root().children().filter_map(ValueDeclaration::cast) {
            let Some(name) = declaration.name() else {
                continue;
            };
            if declaration.annotation().is_some() {
                continue;
            }
            let ty = match self.infer_declaration(declaration.syntax().node_ref()) {
                Ok(result) => result.ty.clone(),
                Err(_) => continue,
            };
            let rendered = self.type_to_string(&ty, Some(file));
            let start = declaration.syntax().start();
            let mut hint = Diagnostic::hint(suggestions::MISSING_TYPE_ANNOTATION)
                .message(format!(
                    "Top-level declaration `{}` has no type annotation; inferred `{}`",
                    name.text(),
                    rendered
                ))
                .span(name.span());
            if file.is_writeable() {
                hint = hint.suggestion(
                    Suggestion::insert(
                        "Add the inferred type annotation",
                        file.tree().span(start, start),
                        format!("{} : {}\n", name.text(), rendered),
                    ),
                );
            }
            out.push(hint.build());
        }
        out
    }

    /// Render `ty` the way it would be written in `file`
    pub fn type_to_string(&self, ty: &Type, file: Option<&SourceFile>) -> String {
        match file {
            Some(file) => type_to_string(ty, Some(&FileQualifier::new(self.program, file))),
            None => type_to_string(ty, None),
        }
    }

    pub fn get_all_imports(&self, file: &'p SourceFile) -> &'p Imports {
        self.program.imports(file)
    }

    /// Type of the top-level declaration `name` in `file`
    pub fn find_type_of_declaration(&self, file: &SourceFile, name: &str) -> Result<Type, CheckError> {
        let declaration = file
            .root()
            .children()
            .filter_map(ValueDeclaration::cast)
            .find(|d| d.name().map(|n| n.text()) == Some(name));
        match declaration {
            Some(declaration) => Ok(self.infer_declaration(declaration.syntax().node_ref())?.ty.clone()),
            None => Err(CheckError::UnknownDeclaration {
                name: name.to_string(),
                path: file.uri().into(),
            }),
        }
    }

    /// Source-like rendering of the values no branch of `case` matches
    pub fn missing_patterns(&self, case: NodeRef) -> Vec<String> {
        let Some(rows) = self.simplified_branches(case) else {
            return Vec::new();
        };
        patterns::check_case(rows)
            .missing
            .iter()
            .map(patterns::pattern_to_doc)
            .collect()
    }

    /// Decision tree for the branches of `case`
    pub fn case_decision_tree(&self, case: NodeRef) -> Option<DecisionTree> {
        self.simplified_branches(case).and_then(patterns::compile)
    }
}

/// Type names as written inside one file: its own types bare, the rest
/// through its imports
#[derive(Clone, Copy)]
pub(crate) struct FileQualifier<'a> {
    module: &'a str,
    imports: &'a Imports,
}

impl<'a> FileQualifier<'a> {
    pub(crate) fn new(program: &'a Program, file: &'a SourceFile) -> Self {
        Self {
            module: file.module_name(),
            imports: program.imports(file),
        }
    }
}

impl Qualifier for FileQualifier<'_> {
    fn qualify(&self, module: &str, name: &str) -> String {
        if module == self.module {
            name.to_string()
        } else {
            self.imports.qualify(module, name)
        }
    }
}

/// Name nodes stand for the declaration they name
fn owner_of_name(node: SyntaxNode<'_>) -> SyntaxNode<'_> {
    if node.field() != Some("name") {
        return node;
    }
    let Some(parent) = node.parent() else {
        return node;
    };
    match parent.kind() {
        NodeKind::FunctionDeclarationLeft => parent.parent().unwrap_or(parent),
        NodeKind::TypeAnnotation
        | NodeKind::TypeDeclaration
        | NodeKind::TypeAliasDeclaration
        | NodeKind::UnionVariant
        | NodeKind::PortAnnotation => parent,
        _ => node,
    }
}

fn type_at(result: &InferenceResult, owner: SyntaxNode<'_>, target: SyntaxNode<'_>) -> Type {
    if owner == target {
        return result.ty.clone();
    }
    result
        .expression_types
        .get(&target.id())
        .cloned()
        .unwrap_or(Type::Unknown)
}
