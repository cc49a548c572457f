//! Immutable syntax tree arena
//!
//! Nodes are stored in a flat vector and addressed by [`NodeId`]. Ids are
//! stable for the lifetime of one parse, which is what the binder and the
//! inference caches key on.

use crate::diagnostics::Span;
use crate::syntax::line_index::LineIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node inside one [`SyntaxTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a source file inside a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    /// Reserved id of the synthetic tree holding the default imports
    pub const VIRTUAL_IMPORTS: FileId = FileId(u32::MAX);
}

/// A node address that is unique across all files of a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub file: FileId,
    pub id: NodeId,
}

impl NodeRef {
    pub fn new(file: FileId, id: NodeId) -> Self {
        Self { file, id }
    }
}

/// Named node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    ModuleDeclaration,
    PortModifier,
    ExposingList,
    ExposedValue,
    ExposedType,
    ExposedUnionConstructors,
    ExposedOperator,
    DoubleDot,
    ImportClause,
    AsClause,
    UpperCaseQid,
    ValueQid,
    LowerCaseIdentifier,
    UpperCaseIdentifier,
    OperatorIdentifier,

    TypeAnnotation,
    ValueDeclaration,
    FunctionDeclarationLeft,
    TypeDeclaration,
    UnionVariant,
    TypeAliasDeclaration,
    LowerTypeName,
    PortAnnotation,
    InfixDeclaration,

    TypeExpression,
    TypeRef,
    TypeVariable,
    RecordType,
    RecordBaseIdentifier,
    FieldType,
    TupleType,
    UnitExpr,

    ValueExpr,
    FunctionCallExpr,
    BinOpExpr,
    Operator,
    OperatorAsFunctionExpr,
    NumberConstantExpr,
    StringConstantExpr,
    CharConstantExpr,
    ParenthesizedExpr,
    TupleExpr,
    ListExpr,
    RecordExpr,
    Field,
    FieldAccessExpr,
    FieldAccessorFunctionExpr,
    NegateExpr,
    AnonymousFunctionExpr,
    IfElseExpr,
    CaseOfExpr,
    CaseOfBranch,
    LetInExpr,

    Pattern,
    LowerPattern,
    AnythingPattern,
    UnionPattern,
    TuplePattern,
    ListPattern,
    ConsPattern,
    RecordPattern,

    Error,
}

impl NodeKind {
    /// Tree-sitter style snake case name, used in messages and debug dumps
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::ModuleDeclaration => "module_declaration",
            NodeKind::PortModifier => "port",
            NodeKind::ExposingList => "exposing_list",
            NodeKind::ExposedValue => "exposed_value",
            NodeKind::ExposedType => "exposed_type",
            NodeKind::ExposedUnionConstructors => "exposed_union_constructors",
            NodeKind::ExposedOperator => "exposed_operator",
            NodeKind::DoubleDot => "double_dot",
            NodeKind::ImportClause => "import_clause",
            NodeKind::AsClause => "as_clause",
            NodeKind::UpperCaseQid => "upper_case_qid",
            NodeKind::ValueQid => "value_qid",
            NodeKind::LowerCaseIdentifier => "lower_case_identifier",
            NodeKind::UpperCaseIdentifier => "upper_case_identifier",
            NodeKind::OperatorIdentifier => "operator_identifier",
            NodeKind::TypeAnnotation => "type_annotation",
            NodeKind::ValueDeclaration => "value_declaration",
            NodeKind::FunctionDeclarationLeft => "function_declaration_left",
            NodeKind::TypeDeclaration => "type_declaration",
            NodeKind::UnionVariant => "union_variant",
            NodeKind::TypeAliasDeclaration => "type_alias_declaration",
            NodeKind::LowerTypeName => "lower_type_name",
            NodeKind::PortAnnotation => "port_annotation",
            NodeKind::InfixDeclaration => "infix_declaration",
            NodeKind::TypeExpression => "type_expression",
            NodeKind::TypeRef => "type_ref",
            NodeKind::TypeVariable => "type_variable",
            NodeKind::RecordType => "record_type",
            NodeKind::RecordBaseIdentifier => "record_base_identifier",
            NodeKind::FieldType => "field_type",
            NodeKind::TupleType => "tuple_type",
            NodeKind::UnitExpr => "unit_expr",
            NodeKind::ValueExpr => "value_expr",
            NodeKind::FunctionCallExpr => "function_call_expr",
            NodeKind::BinOpExpr => "bin_op_expr",
            NodeKind::Operator => "operator",
            NodeKind::OperatorAsFunctionExpr => "operator_as_function_expr",
            NodeKind::NumberConstantExpr => "number_constant_expr",
            NodeKind::StringConstantExpr => "string_constant_expr",
            NodeKind::CharConstantExpr => "char_constant_expr",
            NodeKind::ParenthesizedExpr => "parenthesized_expr",
            NodeKind::TupleExpr => "tuple_expr",
            NodeKind::ListExpr => "list_expr",
            NodeKind::RecordExpr => "record_expr",
            NodeKind::Field => "field",
            NodeKind::FieldAccessExpr => "field_access_expr",
            NodeKind::FieldAccessorFunctionExpr => "field_accessor_function_expr",
            NodeKind::NegateExpr => "negate_expr",
            NodeKind::AnonymousFunctionExpr => "anonymous_function_expr",
            NodeKind::IfElseExpr => "if_else_expr",
            NodeKind::CaseOfExpr => "case_of_expr",
            NodeKind::CaseOfBranch => "case_of_branch",
            NodeKind::LetInExpr => "let_in_expr",
            NodeKind::Pattern => "pattern",
            NodeKind::LowerPattern => "lower_pattern",
            NodeKind::AnythingPattern => "anything_pattern",
            NodeKind::UnionPattern => "union_pattern",
            NodeKind::TuplePattern => "tuple_pattern",
            NodeKind::ListPattern => "list_pattern",
            NodeKind::ConsPattern => "cons_pattern",
            NodeKind::RecordPattern => "record_pattern",
            NodeKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage for one node
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub start: usize,
    pub end: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Field name under which the parent holds this node
    pub field: Option<&'static str>,
}

/// A parsed file
#[derive(Debug)]
pub struct SyntaxTree {
    file: FileId,
    uri: String,
    source: String,
    line_index: LineIndex,
    nodes: Vec<NodeData>,
    root: NodeId,
    errors: Vec<(NodeId, String)>,
}

impl SyntaxTree {
    pub(crate) fn from_parts(
        file: FileId,
        uri: String,
        source: String,
        line_index: LineIndex,
        nodes: Vec<NodeData>,
        root: NodeId,
        errors: Vec<(NodeId, String)>,
    ) -> Self {
        Self {
            file,
            uri,
            source,
            line_index,
            nodes,
            root,
            errors,
        }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> SyntaxNode<'_> {
        SyntaxNode {
            tree: self,
            id: self.root,
        }
    }

    /// Handle for `id`.
    ///
    /// Panics if `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> SyntaxNode<'_> {
        assert!(id.index() < self.nodes.len(), "node {:?} is not in this tree", id);
        SyntaxNode { tree: self, id }
    }

    pub fn get(&self, id: NodeId) -> Option<SyntaxNode<'_>> {
        (id.index() < self.nodes.len()).then_some(SyntaxNode { tree: self, id })
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    /// Parse error messages, attached to their `Error` nodes
    pub fn errors(&self) -> impl Iterator<Item = (SyntaxNode<'_>, &str)> + '_ {
        self.errors
            .iter()
            .map(move |(id, message)| (self.node(*id), message.as_str()))
    }

    pub fn span(&self, start: usize, end: usize) -> Span {
        self.line_index.span(&self.uri, start, end)
    }

    /// Smallest node covering `offset`
    pub fn node_at(&self, offset: usize) -> SyntaxNode<'_> {
        let mut node = self.root();
        'descend: loop {
            for child in node.children() {
                if child.start() <= offset && offset < child.end().max(child.start() + 1) {
                    node = child;
                    continue 'descend;
                }
            }
            return node;
        }
    }

    /// S-expression dump, used by tests
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        dump(self.root(), 0, &mut out);
        out
    }
}

fn dump(node: SyntaxNode<'_>, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    if let Some(field) = node.field() {
        out.push_str(field);
        out.push_str(": ");
    }
    out.push_str(node.kind().name());
    if node.children().next().is_none() {
        out.push_str(&format!(" {:?}", node.text()));
    }
    out.push('\n');
    for child in node.children() {
        dump(child, depth + 1, out);
    }
}

/// A cheap handle to one node of a tree
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

impl std::hash::Hash for SyntaxNode<'_> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.tree.file.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}..{} {:?}",
            self.kind(),
            self.start(),
            self.end(),
            self.text()
        )
    }
}

impl<'t> SyntaxNode<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.id.index()]
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(self.tree.file, self.id)
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind() == kind
    }

    pub fn start(&self) -> usize {
        self.data().start
    }

    pub fn end(&self) -> usize {
        self.data().end
    }

    pub fn text(&self) -> &'t str {
        let data = self.data();
        &self.tree.source[data.start..data.end]
    }

    pub fn span(&self) -> Span {
        self.tree.span(self.start(), self.end())
    }

    /// Field name under which the parent holds this node
    pub fn field(&self) -> Option<&'static str> {
        self.data().field
    }

    pub fn parent(&self) -> Option<SyntaxNode<'t>> {
        let tree = self.tree;
        self.data().parent.map(|id| SyntaxNode { tree, id })
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = SyntaxNode<'t>> + 't {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&id| SyntaxNode { tree, id })
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, index: usize) -> Option<SyntaxNode<'t>> {
        let tree = self.tree;
        self.data()
            .children
            .get(index)
            .map(|&id| SyntaxNode { tree, id })
    }

    pub fn first_child(&self) -> Option<SyntaxNode<'t>> {
        self.child(0)
    }

    pub fn last_child(&self) -> Option<SyntaxNode<'t>> {
        self.children().next_back()
    }

    pub fn child_by_field(&self, field: &str) -> Option<SyntaxNode<'t>> {
        self.children().find(|c| c.field() == Some(field))
    }

    pub fn children_by_field(
        &self,
        field: &'static str,
    ) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.children().filter(move |c| c.field() == Some(field))
    }

    pub fn child_of_kind(&self, kind: NodeKind) -> Option<SyntaxNode<'t>> {
        self.children().find(|c| c.kind() == kind)
    }

    pub fn children_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.children().filter(move |c| c.kind() == kind)
    }

    pub fn prev_sibling(&self) -> Option<SyntaxNode<'t>> {
        let parent = self.parent()?;
        let siblings = &parent.data().children;
        let pos = siblings.iter().position(|&id| id == self.id)?;
        pos.checked_sub(1).map(|p| SyntaxNode {
            tree: self.tree,
            id: siblings[p],
        })
    }

    pub fn next_sibling(&self) -> Option<SyntaxNode<'t>> {
        let parent = self.parent()?;
        let siblings = &parent.data().children;
        let pos = siblings.iter().position(|&id| id == self.id)?;
        siblings.get(pos + 1).map(|&id| SyntaxNode {
            tree: self.tree,
            id,
        })
    }

    /// Strict ancestors, innermost first
    pub fn ancestors(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    /// This node and all nodes below it, in pre-order
    pub fn descendants(&self) -> Descendants<'t> {
        Descendants { stack: vec![*self] }
    }

    pub fn has_error(&self) -> bool {
        self.descendants().any(|n| n.is(NodeKind::Error))
    }

    pub fn contains(&self, other: SyntaxNode<'_>) -> bool {
        std::ptr::eq(self.tree, other.tree)
            && self.start() <= other.start()
            && other.end() <= self.end()
            && (other.id == self.id || other.ancestors().any(|a| a.id == self.id))
    }
}

/// Pre-order walk
pub struct Descendants<'t> {
    stack: Vec<SyntaxNode<'t>>,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = SyntaxNode<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().rev());
        Some(node)
    }
}
