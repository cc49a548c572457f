//! Typed views over syntax nodes
//!
//! Every view is a `Copy` wrapper around a [`SyntaxNode`]; mapping a node to
//! its view never mutates the tree and costs one kind comparison, so views
//! are rebuilt on demand instead of being cached.

use crate::syntax::{NodeKind, SyntaxNode};

macro_rules! ast_node {
    ($(#[$meta:meta])* $name:ident, $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name<'t>(SyntaxNode<'t>);

        impl<'t> $name<'t> {
            pub fn cast(node: SyntaxNode<'t>) -> Option<Self> {
                node.is(NodeKind::$kind).then_some(Self(node))
            }

            pub fn syntax(&self) -> SyntaxNode<'t> {
                self.0
            }
        }
    };
}

// -------------------------------------------------------------------
// Declarations
// -------------------------------------------------------------------

ast_node!(ModuleDeclaration, ModuleDeclaration);
ast_node!(ImportClause, ImportClause);
ast_node!(ValueDeclaration, ValueDeclaration);
ast_node!(TypeAnnotation, TypeAnnotation);
ast_node!(TypeDeclaration, TypeDeclaration);
ast_node!(UnionVariant, UnionVariant);
ast_node!(TypeAliasDeclaration, TypeAliasDeclaration);
ast_node!(PortAnnotation, PortAnnotation);
ast_node!(InfixDeclaration, InfixDeclaration);

impl<'t> ModuleDeclaration<'t> {
    pub fn name(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("name")
    }

    pub fn exposing(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("exposing")
    }

    pub fn is_port_module(&self) -> bool {
        self.0.child_of_kind(NodeKind::PortModifier).is_some()
    }
}

impl<'t> ImportClause<'t> {
    pub fn module_name(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("moduleName")
    }

    /// The `as` alias name node
    pub fn alias(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("asClause")?.child_by_field("name")
    }

    /// Name the module is referred to by inside the importing file
    pub fn local_name(&self) -> Option<&'t str> {
        self.alias()
            .or_else(|| self.module_name())
            .map(|n| n.text())
    }

    pub fn exposing(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("exposing")
    }
}

impl<'t> ValueDeclaration<'t> {
    pub fn function_left(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("functionDeclarationLeft")
    }

    /// Name node of a function declaration; `None` for destructuring
    pub fn name(&self) -> Option<SyntaxNode<'t>> {
        self.function_left()?.child_by_field("name")
    }

    pub fn params(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.function_left()
            .into_iter()
            .flat_map(|left| left.children_by_field("param"))
    }

    /// Destructuring pattern of `(a, b) = ...`
    pub fn pattern(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("pattern")
    }

    pub fn body(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("body").and_then(Expr::cast)
    }

    /// The type annotation written directly above this declaration
    pub fn annotation(&self) -> Option<TypeAnnotation<'t>> {
        let name = self.name()?.text();
        let prev = self.0.prev_sibling()?;
        let annotation = TypeAnnotation::cast(prev)?;
        (annotation.name()?.text() == name).then_some(annotation)
    }
}

impl<'t> TypeAnnotation<'t> {
    pub fn name(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("name")
    }

    pub fn type_expression(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("typeExpression")
    }

    /// The declaration this annotation belongs to
    pub fn declaration(&self) -> Option<ValueDeclaration<'t>> {
        let decl = ValueDeclaration::cast(self.0.next_sibling()?)?;
        (decl.name()?.text() == self.name()?.text()).then_some(decl)
    }
}

impl<'t> TypeDeclaration<'t> {
    pub fn name(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("name")
    }

    pub fn type_names(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.0.children_by_field("typeName")
    }

    pub fn variants(&self) -> impl Iterator<Item = UnionVariant<'t>> + 't {
        self.0
            .children_by_field("unionVariant")
            .filter_map(UnionVariant::cast)
    }
}

impl<'t> UnionVariant<'t> {
    pub fn name(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("name")
    }

    pub fn args(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.0
            .children()
            .filter(|c| c.field().is_none() && !c.is(NodeKind::Error))
    }

    pub fn declaration(&self) -> Option<TypeDeclaration<'t>> {
        self.0.parent().and_then(TypeDeclaration::cast)
    }
}

impl<'t> TypeAliasDeclaration<'t> {
    pub fn name(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("name")
    }

    pub fn type_names(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.0.children_by_field("typeName")
    }

    pub fn type_expression(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("typeExpression")
    }

    /// Record aliases double as constructor functions
    pub fn is_record(&self) -> bool {
        self.type_expression()
            .filter(|t| t.child_count() == 1)
            .and_then(|t| t.first_child())
            .map(|t| t.is(NodeKind::RecordType))
            .unwrap_or(false)
    }
}

impl<'t> PortAnnotation<'t> {
    pub fn name(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("name")
    }

    pub fn type_expression(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("typeExpression")
    }
}

/// Operator associativity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
    Non,
}

impl<'t> InfixDeclaration<'t> {
    pub fn associativity(&self) -> Associativity {
        match self.0.child_by_field("associativity").map(|n| n.text()) {
            Some("left") => Associativity::Left,
            Some("right") => Associativity::Right,
            _ => Associativity::Non,
        }
    }

    pub fn precedence(&self) -> u8 {
        self.0
            .child_by_field("precedence")
            .and_then(|n| n.text().parse().ok())
            .unwrap_or(0)
    }

    pub fn operator(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("operator")
    }

    /// `ValueExpr` naming the implementing function
    pub fn function(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("functionName")
    }
}

// -------------------------------------------------------------------
// Expressions
// -------------------------------------------------------------------

ast_node!(ValueExpr, ValueExpr);
ast_node!(FunctionCallExpr, FunctionCallExpr);
ast_node!(BinOpExpr, BinOpExpr);
ast_node!(OperatorAsFunctionExpr, OperatorAsFunctionExpr);
ast_node!(ParenthesizedExpr, ParenthesizedExpr);
ast_node!(TupleExpr, TupleExpr);
ast_node!(ListExpr, ListExpr);
ast_node!(RecordExpr, RecordExpr);
ast_node!(Field, Field);
ast_node!(FieldAccessExpr, FieldAccessExpr);
ast_node!(FieldAccessorFunctionExpr, FieldAccessorFunctionExpr);
ast_node!(NegateExpr, NegateExpr);
ast_node!(AnonymousFunctionExpr, AnonymousFunctionExpr);
ast_node!(IfElseExpr, IfElseExpr);
ast_node!(CaseOfExpr, CaseOfExpr);
ast_node!(CaseOfBranch, CaseOfBranch);
ast_node!(LetInExpr, LetInExpr);

/// Tagged expression view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expr<'t> {
    Value(ValueExpr<'t>),
    Call(FunctionCallExpr<'t>),
    BinOp(BinOpExpr<'t>),
    OperatorFunction(OperatorAsFunctionExpr<'t>),
    Number(SyntaxNode<'t>),
    String(SyntaxNode<'t>),
    Char(SyntaxNode<'t>),
    Unit(SyntaxNode<'t>),
    Parenthesized(ParenthesizedExpr<'t>),
    Tuple(TupleExpr<'t>),
    List(ListExpr<'t>),
    Record(RecordExpr<'t>),
    FieldAccess(FieldAccessExpr<'t>),
    FieldAccessor(FieldAccessorFunctionExpr<'t>),
    Negate(NegateExpr<'t>),
    Lambda(AnonymousFunctionExpr<'t>),
    If(IfElseExpr<'t>),
    Case(CaseOfExpr<'t>),
    Let(LetInExpr<'t>),
    Error(SyntaxNode<'t>),
}

impl<'t> Expr<'t> {
    pub fn cast(node: SyntaxNode<'t>) -> Option<Self> {
        let expr = match node.kind() {
            NodeKind::ValueExpr => Expr::Value(ValueExpr(node)),
            NodeKind::FunctionCallExpr => Expr::Call(FunctionCallExpr(node)),
            NodeKind::BinOpExpr => Expr::BinOp(BinOpExpr(node)),
            NodeKind::OperatorAsFunctionExpr => {
                Expr::OperatorFunction(OperatorAsFunctionExpr(node))
            }
            NodeKind::NumberConstantExpr => Expr::Number(node),
            NodeKind::StringConstantExpr => Expr::String(node),
            NodeKind::CharConstantExpr => Expr::Char(node),
            NodeKind::UnitExpr => Expr::Unit(node),
            NodeKind::ParenthesizedExpr => Expr::Parenthesized(ParenthesizedExpr(node)),
            NodeKind::TupleExpr => Expr::Tuple(TupleExpr(node)),
            NodeKind::ListExpr => Expr::List(ListExpr(node)),
            NodeKind::RecordExpr => Expr::Record(RecordExpr(node)),
            NodeKind::FieldAccessExpr => Expr::FieldAccess(FieldAccessExpr(node)),
            NodeKind::FieldAccessorFunctionExpr => {
                Expr::FieldAccessor(FieldAccessorFunctionExpr(node))
            }
            NodeKind::NegateExpr => Expr::Negate(NegateExpr(node)),
            NodeKind::AnonymousFunctionExpr => Expr::Lambda(AnonymousFunctionExpr(node)),
            NodeKind::IfElseExpr => Expr::If(IfElseExpr(node)),
            NodeKind::CaseOfExpr => Expr::Case(CaseOfExpr(node)),
            NodeKind::LetInExpr => Expr::Let(LetInExpr(node)),
            NodeKind::Error => Expr::Error(node),
            _ => return None,
        };
        Some(expr)
    }

    pub fn syntax(&self) -> SyntaxNode<'t> {
        match self {
            Expr::Value(e) => e.syntax(),
            Expr::Call(e) => e.syntax(),
            Expr::BinOp(e) => e.syntax(),
            Expr::OperatorFunction(e) => e.syntax(),
            Expr::Number(n) | Expr::String(n) | Expr::Char(n) | Expr::Unit(n) | Expr::Error(n) => *n,
            Expr::Parenthesized(e) => e.syntax(),
            Expr::Tuple(e) => e.syntax(),
            Expr::List(e) => e.syntax(),
            Expr::Record(e) => e.syntax(),
            Expr::FieldAccess(e) => e.syntax(),
            Expr::FieldAccessor(e) => e.syntax(),
            Expr::Negate(e) => e.syntax(),
            Expr::Lambda(e) => e.syntax(),
            Expr::If(e) => e.syntax(),
            Expr::Case(e) => e.syntax(),
            Expr::Let(e) => e.syntax(),
        }
    }
}

/// `1.5`, `1e3` are floats; `0x1F` and `42` are ints
pub fn is_float_literal(text: &str) -> bool {
    let digits = text.trim_start_matches('-');
    !digits.starts_with("0x") && digits.contains(['.', 'e', 'E'])
}

impl<'t> ValueExpr<'t> {
    /// `ValueQid` or `UpperCaseQid`
    pub fn name(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("name")
    }

    /// Reference to a union constructor or record alias constructor
    pub fn is_constructor(&self) -> bool {
        self.name()
            .map(|n| n.is(NodeKind::UpperCaseQid))
            .unwrap_or(false)
    }

    /// Module qualifier, `Maybe` in `Maybe.Just`
    pub fn qualifier(&self) -> Option<&'t str> {
        let text = self.0.text();
        text.rfind('.').map(|i| &text[..i])
    }

    /// Unqualified name, `Just` in `Maybe.Just`
    pub fn base_name(&self) -> &'t str {
        let text = self.0.text();
        text.rfind('.').map(|i| &text[i + 1..]).unwrap_or(text)
    }
}

impl<'t> FunctionCallExpr<'t> {
    pub fn target(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("target").and_then(Expr::cast)
    }

    pub fn args(&self) -> impl Iterator<Item = Expr<'t>> + 't {
        self.0.children_by_field("arg").filter_map(Expr::cast)
    }
}

/// One element of a flat operator chain
#[derive(Debug, Clone, Copy)]
pub enum BinOpPart<'t> {
    Operand(Expr<'t>),
    /// `Operator` node
    Operator(SyntaxNode<'t>),
}

impl<'t> BinOpExpr<'t> {
    /// Operands and operators in source order
    pub fn parts(&self) -> impl Iterator<Item = BinOpPart<'t>> + 't {
        self.0.children().filter_map(|c| {
            if c.is(NodeKind::Operator) {
                Some(BinOpPart::Operator(c))
            } else {
                Expr::cast(c).map(BinOpPart::Operand)
            }
        })
    }

    pub fn operators(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.0.children_of_kind(NodeKind::Operator)
    }
}

impl<'t> OperatorAsFunctionExpr<'t> {
    pub fn operator(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_of_kind(NodeKind::OperatorIdentifier)
    }
}

impl<'t> ParenthesizedExpr<'t> {
    pub fn expression(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("expression").and_then(Expr::cast)
    }
}

impl<'t> TupleExpr<'t> {
    pub fn items(&self) -> impl Iterator<Item = Expr<'t>> + 't {
        self.0.children().filter_map(Expr::cast)
    }
}

impl<'t> ListExpr<'t> {
    pub fn items(&self) -> impl Iterator<Item = Expr<'t>> + 't {
        self.0.children().filter_map(Expr::cast)
    }
}

impl<'t> RecordExpr<'t> {
    /// `model` in `{ model | x = 1 }`
    pub fn base_record(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("baseRecord")
    }

    pub fn fields(&self) -> impl Iterator<Item = Field<'t>> + 't {
        self.0.children_by_field("field").filter_map(Field::cast)
    }
}

impl<'t> Field<'t> {
    pub fn name(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("name")
    }

    pub fn expression(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("expression").and_then(Expr::cast)
    }
}

impl<'t> FieldAccessExpr<'t> {
    pub fn target(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("target").and_then(Expr::cast)
    }

    pub fn field(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("field")
    }
}

impl<'t> FieldAccessorFunctionExpr<'t> {
    pub fn field(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_of_kind(NodeKind::LowerCaseIdentifier)
    }
}

impl<'t> NegateExpr<'t> {
    pub fn expression(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("expression").and_then(Expr::cast)
    }
}

impl<'t> AnonymousFunctionExpr<'t> {
    pub fn params(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.0.children_by_field("param")
    }

    pub fn body(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("expr").and_then(Expr::cast)
    }
}

impl<'t> IfElseExpr<'t> {
    pub fn condition(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("condition").and_then(Expr::cast)
    }

    pub fn then_branch(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("then").and_then(Expr::cast)
    }

    pub fn else_branch(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("else").and_then(Expr::cast)
    }
}

impl<'t> CaseOfExpr<'t> {
    pub fn scrutinee(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("expr").and_then(Expr::cast)
    }

    pub fn branches(&self) -> impl Iterator<Item = CaseOfBranch<'t>> + 't {
        self.0
            .children_by_field("branch")
            .filter_map(CaseOfBranch::cast)
    }
}

impl<'t> CaseOfBranch<'t> {
    pub fn pattern(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("pattern")
    }

    pub fn expr(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("expr").and_then(Expr::cast)
    }
}

impl<'t> LetInExpr<'t> {
    pub fn declarations(&self) -> impl Iterator<Item = ValueDeclaration<'t>> + 't {
        self.0.children().filter_map(ValueDeclaration::cast)
    }

    pub fn body(&self) -> Option<Expr<'t>> {
        self.0.child_by_field("body").and_then(Expr::cast)
    }
}

// -------------------------------------------------------------------
// Patterns
// -------------------------------------------------------------------

ast_node!(UnionPattern, UnionPattern);
ast_node!(ConsPattern, ConsPattern);
ast_node!(TuplePattern, TuplePattern);
ast_node!(ListPattern, ListPattern);
ast_node!(RecordPattern, RecordPattern);

/// Literal pattern kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Float,
    String,
    Char,
}

/// Tagged pattern view. Parenthesized wrappers are transparent; an
/// `as` pattern is its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern<'t> {
    Lower(SyntaxNode<'t>),
    Anything(SyntaxNode<'t>),
    Union(UnionPattern<'t>),
    Tuple(TuplePattern<'t>),
    List(ListPattern<'t>),
    Cons(ConsPattern<'t>),
    Record(RecordPattern<'t>),
    Unit(SyntaxNode<'t>),
    Literal(SyntaxNode<'t>, LiteralKind),
    /// `pattern as name`; holds the wrapper node
    As(SyntaxNode<'t>),
    Error(SyntaxNode<'t>),
}

impl<'t> Pattern<'t> {
    pub fn cast(node: SyntaxNode<'t>) -> Option<Self> {
        let pattern = match node.kind() {
            NodeKind::Pattern => {
                if node.child_by_field("patternAs").is_some() {
                    Pattern::As(node)
                } else {
                    return node
                        .children()
                        .find(|c| c.field().is_none())
                        .and_then(Pattern::cast);
                }
            }
            NodeKind::LowerPattern => Pattern::Lower(node),
            NodeKind::AnythingPattern => Pattern::Anything(node),
            NodeKind::UnionPattern => Pattern::Union(UnionPattern(node)),
            NodeKind::TuplePattern => Pattern::Tuple(TuplePattern(node)),
            NodeKind::ListPattern => Pattern::List(ListPattern(node)),
            NodeKind::ConsPattern => Pattern::Cons(ConsPattern(node)),
            NodeKind::RecordPattern => Pattern::Record(RecordPattern(node)),
            NodeKind::UnitExpr => Pattern::Unit(node),
            NodeKind::NumberConstantExpr => {
                let kind = if is_float_literal(node.text()) {
                    LiteralKind::Float
                } else {
                    LiteralKind::Int
                };
                Pattern::Literal(node, kind)
            }
            NodeKind::StringConstantExpr => Pattern::Literal(node, LiteralKind::String),
            NodeKind::CharConstantExpr => Pattern::Literal(node, LiteralKind::Char),
            NodeKind::Error => Pattern::Error(node),
            _ => return None,
        };
        Some(pattern)
    }

    pub fn syntax(&self) -> SyntaxNode<'t> {
        match self {
            Pattern::Lower(n)
            | Pattern::Anything(n)
            | Pattern::Unit(n)
            | Pattern::Literal(n, _)
            | Pattern::As(n)
            | Pattern::Error(n) => *n,
            Pattern::Union(p) => p.syntax(),
            Pattern::Tuple(p) => p.syntax(),
            Pattern::List(p) => p.syntax(),
            Pattern::Cons(p) => p.syntax(),
            Pattern::Record(p) => p.syntax(),
        }
    }

    /// Inner pattern and bound name of an `as` pattern
    pub fn as_parts(&self) -> Option<(Pattern<'t>, SyntaxNode<'t>)> {
        let Pattern::As(node) = self else {
            return None;
        };
        let name = node.child_by_field("patternAs")?;
        let inner = node
            .children()
            .find(|c| c.field().is_none())
            .and_then(Pattern::cast)?;
        Some((inner, name))
    }
}

impl<'t> UnionPattern<'t> {
    pub fn constructor(&self) -> Option<SyntaxNode<'t>> {
        self.0.child_by_field("constructor")
    }

    pub fn args(&self) -> impl Iterator<Item = Pattern<'t>> + 't {
        self.0.children_by_field("argPattern").filter_map(Pattern::cast)
    }
}

impl<'t> ConsPattern<'t> {
    pub fn head(&self) -> Option<Pattern<'t>> {
        self.0.child_by_field("head").and_then(Pattern::cast)
    }

    pub fn tail(&self) -> Option<Pattern<'t>> {
        self.0.child_by_field("tail").and_then(Pattern::cast)
    }
}

impl<'t> TuplePattern<'t> {
    pub fn items(&self) -> impl Iterator<Item = Pattern<'t>> + 't {
        self.0.children_by_field("pattern").filter_map(Pattern::cast)
    }
}

impl<'t> ListPattern<'t> {
    pub fn items(&self) -> impl Iterator<Item = Pattern<'t>> + 't {
        self.0.children_by_field("pattern").filter_map(Pattern::cast)
    }
}

impl<'t> RecordPattern<'t> {
    pub fn fields(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.0.children_of_kind(NodeKind::LowerPattern)
    }
}

/// Every name a pattern binds, in source order
pub fn bound_names<'t>(pattern: Pattern<'t>, out: &mut Vec<SyntaxNode<'t>>) {
    match pattern {
        Pattern::Lower(n) => out.push(n),
        Pattern::As(_) => {
            if let Some((inner, name)) = pattern.as_parts() {
                bound_names(inner, out);
                out.push(name);
            }
        }
        Pattern::Union(p) => p.args().for_each(|a| bound_names(a, out)),
        Pattern::Tuple(p) => p.items().for_each(|a| bound_names(a, out)),
        Pattern::List(p) => p.items().for_each(|a| bound_names(a, out)),
        Pattern::Cons(p) => {
            if let Some(head) = p.head() {
                bound_names(head, out);
            }
            if let Some(tail) = p.tail() {
                bound_names(tail, out);
            }
        }
        Pattern::Record(p) => out.extend(p.fields()),
        Pattern::Anything(_) | Pattern::Unit(_) | Pattern::Literal(..) | Pattern::Error(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse, FileId};

    #[test]
    fn test_value_declaration_view() {
        let tree = parse(
            FileId(0),
            "file:///A.elm",
            "add : Int -> Int -> Int\nadd a b =\n    a + b\n",
        );
        let decl = tree
            .root()
            .children()
            .find_map(ValueDeclaration::cast)
            .unwrap();
        assert_eq!(decl.name().unwrap().text(), "add");
        assert_eq!(decl.params().count(), 2);
        assert!(decl.annotation().is_some());
        assert!(matches!(decl.body(), Some(Expr::BinOp(_))));
    }

    #[test]
    fn test_qualified_value_parts() {
        let tree = parse(FileId(0), "file:///A.elm", "x = Maybe.Just\ny = List.map\n");
        let values: Vec<_> = tree
            .root()
            .descendants()
            .filter_map(ValueExpr::cast)
            .collect();
        assert!(values[0].is_constructor());
        assert_eq!(values[0].qualifier(), Some("Maybe"));
        assert_eq!(values[0].base_name(), "Just");
        assert!(!values[1].is_constructor());
        assert_eq!(values[1].base_name(), "map");
    }

    #[test]
    fn test_pattern_bound_names() {
        let tree = parse(
            FileId(0),
            "file:///A.elm",
            "f ((Just x) as m) (a, _) { r } (h :: t) = x\n",
        );
        let decl = tree
            .root()
            .children()
            .find_map(ValueDeclaration::cast)
            .unwrap();
        let mut names = Vec::new();
        for param in decl.params() {
            bound_names(Pattern::cast(param).unwrap(), &mut names);
        }
        let names: Vec<_> = names.iter().map(|n| n.text()).collect();
        assert_eq!(names, vec!["x", "m", "a", "r", "h", "t"]);
    }

    #[test]
    fn test_float_literal_detection() {
        assert!(is_float_literal("1.5"));
        assert!(is_float_literal("2e10"));
        assert!(!is_float_literal("0x1E"));
        assert!(!is_float_literal("-42"));
    }

    #[test]
    fn test_infix_declaration_view() {
        let tree = parse(FileId(0), "file:///A.elm", "infix right 5 (++) = append\n");
        let infix = tree
            .root()
            .children()
            .find_map(InfixDeclaration::cast)
            .unwrap();
        assert_eq!(infix.associativity(), Associativity::Right);
        assert_eq!(infix.precedence(), 5);
        assert_eq!(infix.operator().unwrap().text(), "++");
        assert_eq!(infix.function().unwrap().text(), "append");
    }
}
