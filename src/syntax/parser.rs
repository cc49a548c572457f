//! Layout-aware recursive descent parser for Elm
//!
//! Indentation decides where constructs end: top-level declarations start in
//! column 1, and `let` declarations and `case` branches are aligned on the
//! column of their first item. A token that starts a line at or left of the
//! innermost layout column closes every expression that is still open.
//!
//! Parsing never fails as a whole. Unexpected input is wrapped in `Error`
//! nodes carrying a message, and the parser resumes at the next layout
//! boundary.

use crate::syntax::lexer::{tokenize, Token, TokenKind};
use crate::syntax::line_index::LineIndex;
use crate::syntax::tree::{FileId, NodeData, NodeId, NodeKind, SyntaxTree};

type Child = (Option<&'static str>, NodeId);

/// Parse `source` into a tree owned by `file`
pub fn parse(file: FileId, uri: impl Into<String>, source: impl Into<String>) -> SyntaxTree {
    let source = source.into();
    let line_index = LineIndex::new(&source);
    let tokens = tokenize(&source, &line_index);
    let mut parser = Parser::new(&source, tokens);
    let root = parser.parse_file();
    let Parser { nodes, errors, .. } = parser;
    SyntaxTree::from_parts(file, uri.into(), source, line_index, nodes, root, errors)
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    prev_end: usize,
    nodes: Vec<NodeData>,
    errors: Vec<(NodeId, String)>,
    /// Error nodes not yet attached to a parent
    orphans: Vec<NodeId>,
    /// Layout columns, innermost last
    layout: Vec<usize>,
    /// First token of the current block item; never treated as a boundary
    item_start: usize,
}

fn is_operator(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Operator | TokenKind::Minus)
}

impl<'s> Parser<'s> {
    fn new(source: &'s str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            prev_end: 0,
            nodes: Vec::new(),
            errors: Vec::new(),
            orphans: Vec::new(),
            layout: vec![1],
            item_start: 0,
        }
    }

    // ---------------------------------------------------------------
    // Token access
    // ---------------------------------------------------------------

    fn peek(&self) -> Token {
        self.tokens[self.pos]
    }

    fn nth(&self, n: usize) -> Token {
        self.tokens[(self.pos + n).min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn text(&self, token: Token) -> &'s str {
        &self.source[token.start..token.end]
    }

    fn at_boundary(&self) -> bool {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            return true;
        }
        if self.pos == self.item_start {
            return false;
        }
        token.first_on_line && token.col <= self.layout.last().copied().unwrap_or(1)
    }

    fn at(&self, kind: TokenKind) -> bool {
        !self.at_boundary() && self.kind() == kind
    }

    fn at_lower(&self, text: &str) -> bool {
        self.at(TokenKind::Lower) && self.text(self.peek()) == text
    }

    fn bump(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
            self.prev_end = token.end;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    /// Like [`Parser::eat`] but ignores layout; for closing delimiters and
    /// keywords that can never start a declaration.
    fn eat_raw(&mut self, kind: TokenKind) -> Option<Token> {
        if self.kind() == kind && kind != TokenKind::Eof {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        let token = self.eat(kind);
        if token.is_none() {
            self.error_here(format!("expected {}", what));
        }
        token
    }

    fn expect_raw(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        let token = self.eat_raw(kind);
        if token.is_none() {
            self.error_here(format!("expected {}", what));
        }
        token
    }

    /// `-` directly attached to the following operand and detached from the
    /// preceding one
    fn is_negation(&self, pos: usize) -> bool {
        let token = self.tokens[pos];
        if token.kind != TokenKind::Minus {
            return false;
        }
        let Some(next) = self.tokens.get(pos + 1) else {
            return false;
        };
        let attached_after = next.start == token.end
            && matches!(
                next.kind,
                TokenKind::Lower
                    | TokenKind::QualifiedLower
                    | TokenKind::Upper
                    | TokenKind::Int
                    | TokenKind::Float
                    | TokenKind::LParen
            );
        let detached_before = pos == 0 || self.tokens[pos - 1].end != token.start;
        attached_after && detached_before
    }

    // ---------------------------------------------------------------
    // Node construction
    // ---------------------------------------------------------------

    fn alloc(&mut self, kind: NodeKind, start: usize, end: usize, children: Vec<Child>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut ids = Vec::with_capacity(children.len());
        for (field, child) in children {
            let data = &mut self.nodes[child.index()];
            data.parent = Some(id);
            data.field = field;
            ids.push(child);
        }
        self.nodes.push(NodeData {
            kind,
            start,
            end,
            parent: None,
            children: ids,
            field: None,
        });
        id
    }

    fn finish(&mut self, kind: NodeKind, start: usize, mut children: Vec<Child>) -> NodeId {
        let end = self.prev_end.max(start);
        let nodes = &self.nodes;
        let (mine, rest): (Vec<NodeId>, Vec<NodeId>) = self
            .orphans
            .iter()
            .partition(|id| nodes[id.index()].start >= start);
        self.orphans = rest;
        children.extend(mine.into_iter().map(|id| (None, id)));
        children.sort_by_key(|(_, id)| nodes_start(&self.nodes, *id));
        self.alloc(kind, start, end, children)
    }

    fn leaf(&mut self, kind: NodeKind, token: Token) -> NodeId {
        self.alloc(kind, token.start, token.end, Vec::new())
    }

    fn error_node(&mut self, start: usize, end: usize, message: String) -> NodeId {
        let id = self.alloc(NodeKind::Error, start, end, Vec::new());
        self.errors.push((id, message));
        id
    }

    /// Record a zero-width error right after the last consumed token
    fn error_here(&mut self, message: String) {
        let at = self.prev_end;
        let id = self.error_node(at, at, message);
        self.orphans.push(id);
    }

    /// Consume the current token into an error node
    fn error_token(&mut self, message: &str) -> NodeId {
        let token = self.bump();
        let message = format!("{}: `{}`", message, self.text(token));
        self.error_node(token.start, token.end, message)
    }

    /// Consume at least one token, then everything up to the next layout
    /// boundary (or `stop`), into one error node
    fn skip_to_boundary(&mut self, message: &str, stop: Option<TokenKind>) -> NodeId {
        let first = self.bump();
        while !self.at_boundary() && Some(self.kind()) != stop {
            self.bump();
        }
        let text = self.text(first);
        self.error_node(
            first.start,
            self.prev_end,
            format!("{}, starting at `{}`", message, text),
        )
    }

    fn missing(&mut self, what: &str) -> NodeId {
        let token = self.peek();
        let message = if token.kind == TokenKind::Eof {
            format!("expected {}, found end of file", what)
        } else {
            format!("expected {}, found `{}`", what, self.text(token))
        };
        let at = self.prev_end;
        self.error_node(at, at, message)
    }

    /// `Foo.Bar` as an upper_case_qid with one identifier per segment
    fn upper_qid(&mut self, token: Token) -> NodeId {
        let children = self.segments(token, NodeKind::UpperCaseIdentifier);
        self.alloc(NodeKind::UpperCaseQid, token.start, token.end, children)
    }

    /// `foo` or `Foo.bar` as a value_qid
    fn value_qid(&mut self, token: Token) -> NodeId {
        let mut children = self.segments(token, NodeKind::UpperCaseIdentifier);
        if let Some((_, last)) = children.last() {
            self.nodes[last.index()].kind = NodeKind::LowerCaseIdentifier;
        }
        self.alloc(NodeKind::ValueQid, token.start, token.end, children)
    }

    fn segments(&mut self, token: Token, kind: NodeKind) -> Vec<Child> {
        let text = self.text(token);
        let mut offset = token.start;
        let mut children = Vec::new();
        for segment in text.split('.') {
            let id = self.alloc(kind, offset, offset + segment.len(), Vec::new());
            children.push((None, id));
            offset += segment.len() + 1;
        }
        children
    }

    fn wrap_pattern(&mut self, inner: NodeId) -> NodeId {
        let data = &self.nodes[inner.index()];
        if data.kind == NodeKind::Pattern {
            return inner;
        }
        let (start, end) = (data.start, data.end);
        self.alloc(NodeKind::Pattern, start, end, vec![(None, inner)])
    }

    // ---------------------------------------------------------------
    // Module level
    // ---------------------------------------------------------------

    fn parse_file(&mut self) -> NodeId {
        let mut children = Vec::new();

        let starts_module = match self.kind() {
            TokenKind::Module => true,
            TokenKind::Port => self.nth(1).kind == TokenKind::Module,
            TokenKind::Lower => {
                self.text(self.peek()) == "effect" && self.nth(1).kind == TokenKind::Module
            }
            _ => false,
        };
        if starts_module {
            self.item_start = self.pos;
            children.push((None, self.parse_module_declaration()));
        }

        loop {
            let token = self.peek();
            if token.kind == TokenKind::Eof {
                break;
            }
            if !(token.first_on_line && token.col == 1) {
                let error = self.skip_to_boundary("unexpected tokens", None);
                children.push((None, error));
                continue;
            }
            self.item_start = self.pos;
            let decl = match self.parse_top_level() {
                Some(decl) => decl,
                None => self.skip_to_boundary("expected a declaration", None),
            };
            children.push((None, decl));
        }

        for orphan in std::mem::take(&mut self.orphans) {
            children.push((None, orphan));
        }
        children.sort_by_key(|(_, id)| nodes_start(&self.nodes, *id));
        self.alloc(NodeKind::File, 0, self.source.len(), children)
    }

    fn parse_top_level(&mut self) -> Option<NodeId> {
        let decl = match self.kind() {
            TokenKind::Import => self.parse_import(),
            TokenKind::Type => self.parse_type_declaration(),
            TokenKind::Port => self.parse_port_annotation(),
            TokenKind::Lower
                if self.text(self.peek()) == "infix" && self.nth(1).kind == TokenKind::Lower =>
            {
                self.parse_infix_declaration()
            }
            TokenKind::Lower if self.nth(1).kind == TokenKind::Colon => {
                self.parse_type_annotation()
            }
            TokenKind::Lower => self.parse_function_declaration(),
            TokenKind::LParen
            | TokenKind::LBrace
            | TokenKind::LBracket
            | TokenKind::Underscore
            | TokenKind::Upper => self.parse_pattern_declaration(),
            _ => return None,
        };
        Some(decl)
    }

    fn parse_module_declaration(&mut self) -> NodeId {
        let start = self.peek().start;
        let mut children = Vec::new();

        if self.kind() == TokenKind::Port {
            let token = self.bump();
            children.push((None, self.leaf(NodeKind::PortModifier, token)));
        } else if self.kind() == TokenKind::Lower {
            // effect
            self.bump();
        }
        self.expect_raw(TokenKind::Module, "`module`");

        if let Some(token) = self.eat(TokenKind::Upper) {
            children.push((Some("name"), self.upper_qid(token)));
        } else {
            self.error_here("expected a module name".to_string());
        }

        if self.eat(TokenKind::Where).is_some() && self.eat(TokenKind::LBrace).is_some() {
            let mut depth = 1;
            while depth > 0 && self.kind() != TokenKind::Eof {
                match self.bump().kind {
                    TokenKind::LBrace => depth += 1,
                    TokenKind::RBrace => depth -= 1,
                    _ => {}
                }
            }
        }

        if self.eat(TokenKind::Exposing).is_some() {
            children.push((Some("exposing"), self.parse_exposing_list()));
        } else {
            self.error_here("expected `exposing`".to_string());
        }

        self.finish(NodeKind::ModuleDeclaration, start, children)
    }

    fn parse_exposing_list(&mut self) -> NodeId {
        let start = self.peek().start;
        let mut children = Vec::new();
        if self.expect(TokenKind::LParen, "`(`").is_none() {
            return self.finish(NodeKind::ExposingList, start, children);
        }

        if self.kind() == TokenKind::DotDot && self.nth(1).kind == TokenKind::RParen {
            let token = self.bump();
            children.push((None, self.leaf(NodeKind::DoubleDot, token)));
            self.bump();
            return self.finish(NodeKind::ExposingList, start, children);
        }

        loop {
            match self.kind() {
                TokenKind::Lower => {
                    let token = self.bump();
                    children.push((None, self.leaf(NodeKind::ExposedValue, token)));
                }
                TokenKind::Upper => {
                    let token = self.bump();
                    let name = self.leaf(NodeKind::UpperCaseIdentifier, token);
                    let mut parts = vec![(Some("name"), name)];
                    if self.kind() == TokenKind::LParen
                        && self.nth(1).kind == TokenKind::DotDot
                        && self.nth(2).kind == TokenKind::RParen
                    {
                        let open = self.bump();
                        let dots = self.bump();
                        let dots = self.leaf(NodeKind::DoubleDot, dots);
                        self.bump();
                        let ctors = self.finish(
                            NodeKind::ExposedUnionConstructors,
                            open.start,
                            vec![(None, dots)],
                        );
                        parts.push((None, ctors));
                    }
                    children.push((None, self.finish(NodeKind::ExposedType, token.start, parts)));
                }
                TokenKind::LParen
                    if is_operator(self.nth(1).kind) && self.nth(2).kind == TokenKind::RParen =>
                {
                    let open = self.bump();
                    let op = self.bump();
                    let op = self.leaf(NodeKind::OperatorIdentifier, op);
                    self.bump();
                    children.push((
                        None,
                        self.finish(NodeKind::ExposedOperator, open.start, vec![(None, op)]),
                    ));
                }
                TokenKind::RParen | TokenKind::Eof => {
                    children.push((None, self.missing("an exposed name")));
                }
                _ => {
                    children.push((None, self.error_token("unexpected token in exposing list")));
                }
            }
            if self.eat_raw(TokenKind::Comma).is_none() {
                break;
            }
        }

        self.expect_raw(TokenKind::RParen, "`)`");
        self.finish(NodeKind::ExposingList, start, children)
    }

    fn parse_import(&mut self) -> NodeId {
        let start = self.bump().start;
        let mut children = Vec::new();

        if let Some(token) = self.eat(TokenKind::Upper) {
            children.push((Some("moduleName"), self.upper_qid(token)));
        } else {
            children.push((None, self.missing("a module name")));
        }

        if let Some(as_token) = self.eat(TokenKind::As) {
            let mut parts = Vec::new();
            if let Some(token) = self.eat(TokenKind::Upper) {
                parts.push((Some("name"), self.leaf(NodeKind::UpperCaseIdentifier, token)));
            } else {
                self.error_here("expected an alias name".to_string());
            }
            children.push((
                Some("asClause"),
                self.finish(NodeKind::AsClause, as_token.start, parts),
            ));
        }

        if self.eat(TokenKind::Exposing).is_some() {
            children.push((Some("exposing"), self.parse_exposing_list()));
        }

        self.finish(NodeKind::ImportClause, start, children)
    }

    // ---------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------

    fn parse_type_declaration(&mut self) -> NodeId {
        let start = self.bump().start;
        let is_alias = self.at_lower("alias");
        if is_alias {
            self.bump();
        }

        let mut children = Vec::new();
        if let Some(token) = self.eat(TokenKind::Upper) {
            children.push((Some("name"), self.leaf(NodeKind::UpperCaseIdentifier, token)));
        } else {
            children.push((None, self.missing("a type name")));
        }
        while let Some(token) = self.eat(TokenKind::Lower) {
            children.push((Some("typeName"), self.leaf(NodeKind::LowerTypeName, token)));
        }
        self.expect(TokenKind::Equals, "`=`");

        if is_alias {
            children.push((Some("typeExpression"), self.parse_type_expression()));
            return self.finish(NodeKind::TypeAliasDeclaration, start, children);
        }

        loop {
            children.push((Some("unionVariant"), self.parse_union_variant()));
            if self.eat(TokenKind::Pipe).is_none() {
                break;
            }
        }
        self.finish(NodeKind::TypeDeclaration, start, children)
    }

    fn parse_union_variant(&mut self) -> NodeId {
        let start = self.peek().start;
        let Some(token) = self.eat(TokenKind::Upper) else {
            return self.missing("a constructor name");
        };
        let mut children = vec![(Some("name"), self.leaf(NodeKind::UpperCaseIdentifier, token))];
        while self.at_type_arg_start() {
            children.push((None, self.parse_type_arg()));
        }
        self.finish(NodeKind::UnionVariant, start, children)
    }

    fn parse_type_annotation(&mut self) -> NodeId {
        let token = self.bump();
        let name = self.leaf(NodeKind::LowerCaseIdentifier, token);
        self.bump();
        let type_expr = self.parse_type_expression();
        self.finish(
            NodeKind::TypeAnnotation,
            token.start,
            vec![(Some("name"), name), (Some("typeExpression"), type_expr)],
        )
    }

    fn parse_port_annotation(&mut self) -> NodeId {
        let start = self.bump().start;
        let mut children = Vec::new();
        if let Some(token) = self.eat(TokenKind::Lower) {
            children.push((Some("name"), self.leaf(NodeKind::LowerCaseIdentifier, token)));
        } else {
            children.push((None, self.missing("a port name")));
        }
        self.expect(TokenKind::Colon, "`:`");
        children.push((Some("typeExpression"), self.parse_type_expression()));
        self.finish(NodeKind::PortAnnotation, start, children)
    }

    fn parse_infix_declaration(&mut self) -> NodeId {
        let start = self.bump().start;
        let mut children = Vec::new();

        let assoc = self.bump();
        children.push((
            Some("associativity"),
            self.leaf(NodeKind::LowerCaseIdentifier, assoc),
        ));
        if let Some(token) = self.eat(TokenKind::Int) {
            children.push((Some("precedence"), self.leaf(NodeKind::NumberConstantExpr, token)));
        } else {
            children.push((None, self.missing("a precedence")));
        }
        if self.at(TokenKind::LParen)
            && is_operator(self.nth(1).kind)
            && self.nth(2).kind == TokenKind::RParen
        {
            self.bump();
            let op = self.bump();
            children.push((Some("operator"), self.leaf(NodeKind::OperatorIdentifier, op)));
            self.bump();
        } else {
            children.push((None, self.missing("an operator in parentheses")));
        }
        self.expect(TokenKind::Equals, "`=`");
        if let Some(token) = self.eat(TokenKind::Lower) {
            let qid = self.value_qid(token);
            let value = self.alloc(
                NodeKind::ValueExpr,
                token.start,
                token.end,
                vec![(Some("name"), qid)],
            );
            children.push((Some("functionName"), value));
        } else {
            children.push((None, self.missing("a function name")));
        }
        self.finish(NodeKind::InfixDeclaration, start, children)
    }

    fn parse_function_declaration(&mut self) -> NodeId {
        let token = self.bump();
        let name = self.leaf(NodeKind::LowerCaseIdentifier, token);
        let mut left = vec![(Some("name"), name)];
        while self.at_pattern_atom_start() {
            left.push((Some("param"), self.parse_pattern_atom()));
        }
        let left = self.finish(NodeKind::FunctionDeclarationLeft, token.start, left);

        let mut children = vec![(Some("functionDeclarationLeft"), left)];
        if self.expect(TokenKind::Equals, "`=`").is_some() {
            children.push((Some("body"), self.parse_expr()));
        }
        self.finish(NodeKind::ValueDeclaration, token.start, children)
    }

    fn parse_pattern_declaration(&mut self) -> NodeId {
        let start = self.peek().start;
        let pattern = self.parse_pattern();
        let pattern = self.wrap_pattern(pattern);
        let mut children = vec![(Some("pattern"), pattern)];
        if self.expect(TokenKind::Equals, "`=`").is_some() {
            children.push((Some("body"), self.parse_expr()));
        }
        self.finish(NodeKind::ValueDeclaration, start, children)
    }

    // ---------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------

    fn at_type_arg_start(&self) -> bool {
        !self.at_boundary()
            && matches!(
                self.kind(),
                TokenKind::Upper | TokenKind::Lower | TokenKind::LBrace | TokenKind::LParen
            )
    }

    fn parse_type_expression(&mut self) -> NodeId {
        let start = self.peek().start;
        let mut segments = vec![(None, self.parse_type_segment())];
        while self.eat(TokenKind::Arrow).is_some() {
            segments.push((None, self.parse_type_segment()));
        }
        self.finish(NodeKind::TypeExpression, start, segments)
    }

    fn parse_type_segment(&mut self) -> NodeId {
        if let Some(token) = self.eat(TokenKind::Upper) {
            let name = self.upper_qid(token);
            let mut children = vec![(Some("name"), name)];
            while self.at_type_arg_start() {
                children.push((None, self.parse_type_arg()));
            }
            return self.finish(NodeKind::TypeRef, token.start, children);
        }
        self.parse_type_arg()
    }

    fn parse_type_arg(&mut self) -> NodeId {
        if self.at_boundary() {
            return self.missing("a type");
        }
        match self.kind() {
            TokenKind::Upper => {
                let token = self.bump();
                let name = self.upper_qid(token);
                self.alloc(NodeKind::TypeRef, token.start, token.end, vec![(Some("name"), name)])
            }
            TokenKind::Lower => {
                let token = self.bump();
                self.leaf(NodeKind::TypeVariable, token)
            }
            TokenKind::LBrace => self.parse_record_type(),
            TokenKind::LParen => {
                let open = self.bump();
                if let Some(close) = self.eat_raw(TokenKind::RParen) {
                    return self.alloc(NodeKind::UnitExpr, open.start, close.end, Vec::new());
                }
                let first = self.parse_type_expression();
                if self.kind() == TokenKind::Comma {
                    let mut items = vec![(None, first)];
                    while self.eat_raw(TokenKind::Comma).is_some() {
                        items.push((None, self.parse_type_expression()));
                    }
                    self.expect_raw(TokenKind::RParen, "`)`");
                    return self.finish(NodeKind::TupleType, open.start, items);
                }
                self.expect_raw(TokenKind::RParen, "`)`");
                let data = &mut self.nodes[first.index()];
                data.start = open.start;
                data.end = self.prev_end.max(data.end);
                first
            }
            _ => self.missing("a type"),
        }
    }

    fn parse_record_type(&mut self) -> NodeId {
        let start = self.bump().start;
        let mut children = Vec::new();
        if self.eat_raw(TokenKind::RBrace).is_some() {
            return self.finish(NodeKind::RecordType, start, children);
        }

        if self.at(TokenKind::Lower) && self.nth(1).kind == TokenKind::Pipe {
            let token = self.bump();
            children.push((
                Some("baseRecord"),
                self.leaf(NodeKind::RecordBaseIdentifier, token),
            ));
            self.bump();
        }

        loop {
            if let Some(token) = self.eat(TokenKind::Lower) {
                let name = self.leaf(NodeKind::LowerCaseIdentifier, token);
                self.expect(TokenKind::Colon, "`:`");
                let type_expr = self.parse_type_expression();
                children.push((
                    Some("fieldType"),
                    self.finish(
                        NodeKind::FieldType,
                        token.start,
                        vec![(Some("name"), name), (Some("typeExpression"), type_expr)],
                    ),
                ));
            } else {
                children.push((None, self.missing("a field name")));
                break;
            }
            if self.eat_raw(TokenKind::Comma).is_none() {
                break;
            }
        }

        self.expect_raw(TokenKind::RBrace, "`}`");
        self.finish(NodeKind::RecordType, start, children)
    }

    // ---------------------------------------------------------------
    // Patterns
    // ---------------------------------------------------------------

    fn at_pattern_atom_start(&self) -> bool {
        if self.at_boundary() {
            return false;
        }
        match self.kind() {
            TokenKind::Lower
            | TokenKind::Underscore
            | TokenKind::Upper
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::String
            | TokenKind::Char
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace => true,
            TokenKind::Minus => {
                let next = self.nth(1);
                next.start == self.peek().end
                    && matches!(next.kind, TokenKind::Int | TokenKind::Float)
            }
            _ => false,
        }
    }

    fn parse_pattern(&mut self) -> NodeId {
        let start = self.peek().start;
        let pattern = self.parse_cons_pattern();
        if self.eat(TokenKind::As).is_some() {
            if let Some(token) = self.eat(TokenKind::Lower) {
                let name = self.leaf(NodeKind::LowerPattern, token);
                return self.finish(
                    NodeKind::Pattern,
                    start,
                    vec![(None, pattern), (Some("patternAs"), name)],
                );
            }
            self.error_here("expected a name after `as`".to_string());
        }
        pattern
    }

    fn parse_cons_pattern(&mut self) -> NodeId {
        let start = self.peek().start;
        let head = self.parse_app_pattern();
        if self.at(TokenKind::Operator) && self.text(self.peek()) == "::" {
            self.bump();
            let tail = self.parse_cons_pattern();
            return self.finish(
                NodeKind::ConsPattern,
                start,
                vec![(Some("head"), head), (Some("tail"), tail)],
            );
        }
        head
    }

    fn parse_app_pattern(&mut self) -> NodeId {
        if let Some(token) = self.eat(TokenKind::Upper) {
            let ctor = self.upper_qid(token);
            let mut children = vec![(Some("constructor"), ctor)];
            while self.at_pattern_atom_start() {
                children.push((Some("argPattern"), self.parse_pattern_atom()));
            }
            return self.finish(NodeKind::UnionPattern, token.start, children);
        }
        self.parse_pattern_atom()
    }

    fn parse_pattern_atom(&mut self) -> NodeId {
        if !self.at_pattern_atom_start() {
            return self.missing("a pattern");
        }
        match self.kind() {
            TokenKind::Lower => {
                let token = self.bump();
                self.leaf(NodeKind::LowerPattern, token)
            }
            TokenKind::Underscore => {
                let token = self.bump();
                self.leaf(NodeKind::AnythingPattern, token)
            }
            TokenKind::Upper => {
                let token = self.bump();
                let ctor = self.upper_qid(token);
                self.alloc(
                    NodeKind::UnionPattern,
                    token.start,
                    token.end,
                    vec![(Some("constructor"), ctor)],
                )
            }
            TokenKind::Int | TokenKind::Float => {
                let token = self.bump();
                self.leaf(NodeKind::NumberConstantExpr, token)
            }
            TokenKind::Minus => {
                let minus = self.bump();
                let number = self.bump();
                self.alloc(NodeKind::NumberConstantExpr, minus.start, number.end, Vec::new())
            }
            TokenKind::String => {
                let token = self.bump();
                self.leaf(NodeKind::StringConstantExpr, token)
            }
            TokenKind::Char => {
                let token = self.bump();
                self.leaf(NodeKind::CharConstantExpr, token)
            }
            TokenKind::LParen => {
                let open = self.bump();
                if let Some(close) = self.eat_raw(TokenKind::RParen) {
                    return self.alloc(NodeKind::UnitExpr, open.start, close.end, Vec::new());
                }
                let first = self.parse_pattern();
                if self.kind() == TokenKind::Comma {
                    let first = self.wrap_pattern(first);
                    let mut items = vec![(Some("pattern"), first)];
                    while self.eat_raw(TokenKind::Comma).is_some() {
                        let item = self.parse_pattern();
                        items.push((Some("pattern"), self.wrap_pattern(item)));
                    }
                    self.expect_raw(TokenKind::RParen, "`)`");
                    return self.finish(NodeKind::TuplePattern, open.start, items);
                }
                self.expect_raw(TokenKind::RParen, "`)`");
                self.finish(NodeKind::Pattern, open.start, vec![(None, first)])
            }
            TokenKind::LBracket => {
                let open = self.bump();
                let mut items = Vec::new();
                if self.eat_raw(TokenKind::RBracket).is_none() {
                    loop {
                        let item = self.parse_pattern();
                        items.push((Some("pattern"), self.wrap_pattern(item)));
                        if self.eat_raw(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                    self.expect_raw(TokenKind::RBracket, "`]`");
                }
                self.finish(NodeKind::ListPattern, open.start, items)
            }
            TokenKind::LBrace => {
                let open = self.bump();
                let mut fields = Vec::new();
                if self.eat_raw(TokenKind::RBrace).is_none() {
                    loop {
                        if let Some(token) = self.eat(TokenKind::Lower) {
                            fields.push((None, self.leaf(NodeKind::LowerPattern, token)));
                        } else {
                            fields.push((None, self.missing("a field name")));
                            break;
                        }
                        if self.eat_raw(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                    self.expect_raw(TokenKind::RBrace, "`}`");
                }
                self.finish(NodeKind::RecordPattern, open.start, fields)
            }
            _ => self.missing("a pattern"),
        }
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    /// Tokens that may start a function argument
    fn at_atom_start(&self) -> bool {
        if self.at_boundary() {
            return false;
        }
        match self.kind() {
            TokenKind::Lower
            | TokenKind::QualifiedLower
            | TokenKind::Upper
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::String
            | TokenKind::Char
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::DotField => true,
            TokenKind::Minus => self.is_negation(self.pos),
            _ => false,
        }
    }

    fn at_binary_operator(&self) -> bool {
        !self.at_boundary()
            && match self.kind() {
                TokenKind::Operator => true,
                TokenKind::Minus => !self.is_negation(self.pos),
                _ => false,
            }
    }

    fn parse_expr(&mut self) -> NodeId {
        let start = self.peek().start;
        let first = self.parse_operand();
        let mut children = vec![(None, first)];
        while self.at_binary_operator() {
            let token = self.bump();
            let ident = self.leaf(NodeKind::OperatorIdentifier, token);
            let op = self.alloc(NodeKind::Operator, token.start, token.end, vec![(None, ident)]);
            children.push((None, op));
            children.push((None, self.parse_operand()));
        }
        if children.len() == 1 {
            return first;
        }
        self.finish(NodeKind::BinOpExpr, start, children)
    }

    fn parse_operand(&mut self) -> NodeId {
        if !self.at_boundary()
            && matches!(
                self.kind(),
                TokenKind::If | TokenKind::Case | TokenKind::Let | TokenKind::Backslash
            )
        {
            return self.parse_atom();
        }
        if !self.at_atom_start() {
            return self.expression_error();
        }

        let start = self.peek().start;
        let target = self.parse_access_atom();
        let mut children = vec![(Some("target"), target)];
        while self.at_atom_start() {
            children.push((Some("arg"), self.parse_access_atom()));
        }
        if children.len() == 1 {
            return target;
        }
        self.finish(NodeKind::FunctionCallExpr, start, children)
    }

    fn expression_error(&mut self) -> NodeId {
        let closes = matches!(
            self.kind(),
            TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Comma
                | TokenKind::Then
                | TokenKind::Else
                | TokenKind::Of
                | TokenKind::In
                | TokenKind::Arrow
                | TokenKind::Equals
                | TokenKind::Pipe
        );
        if self.at_boundary() || closes {
            self.missing("an expression")
        } else {
            self.error_token("unexpected token in expression")
        }
    }

    fn parse_access_atom(&mut self) -> NodeId {
        let start = self.peek().start;
        let mut target = self.parse_atom();
        while !self.at_boundary()
            && self.kind() == TokenKind::DotField
            && self.peek().start == self.prev_end
        {
            let token = self.bump();
            let field = self.alloc(
                NodeKind::LowerCaseIdentifier,
                token.start + 1,
                token.end,
                Vec::new(),
            );
            target = self.finish(
                NodeKind::FieldAccessExpr,
                start,
                vec![(Some("target"), target), (Some("field"), field)],
            );
        }
        target
    }

    fn parse_atom(&mut self) -> NodeId {
        match self.kind() {
            TokenKind::Lower | TokenKind::QualifiedLower => {
                let token = self.bump();
                let qid = self.value_qid(token);
                self.alloc(NodeKind::ValueExpr, token.start, token.end, vec![(Some("name"), qid)])
            }
            TokenKind::Upper => {
                let token = self.bump();
                let qid = self.upper_qid(token);
                self.alloc(NodeKind::ValueExpr, token.start, token.end, vec![(Some("name"), qid)])
            }
            TokenKind::Int | TokenKind::Float => {
                let token = self.bump();
                self.leaf(NodeKind::NumberConstantExpr, token)
            }
            TokenKind::String => {
                let token = self.bump();
                self.leaf(NodeKind::StringConstantExpr, token)
            }
            TokenKind::Char => {
                let token = self.bump();
                self.leaf(NodeKind::CharConstantExpr, token)
            }
            TokenKind::Minus => {
                let start = self.bump().start;
                let operand = self.parse_access_atom();
                self.finish(NodeKind::NegateExpr, start, vec![(Some("expression"), operand)])
            }
            TokenKind::DotField => {
                let token = self.bump();
                let field = self.alloc(
                    NodeKind::LowerCaseIdentifier,
                    token.start + 1,
                    token.end,
                    Vec::new(),
                );
                self.finish(NodeKind::FieldAccessorFunctionExpr, token.start, vec![(None, field)])
            }
            TokenKind::LParen => self.parse_parenthesized(),
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_record(),
            TokenKind::Backslash => self.parse_lambda(),
            TokenKind::If => self.parse_if(),
            TokenKind::Case => self.parse_case(),
            TokenKind::Let => self.parse_let(),
            _ => self.expression_error(),
        }
    }

    fn parse_parenthesized(&mut self) -> NodeId {
        let open = self.bump();
        if let Some(close) = self.eat_raw(TokenKind::RParen) {
            return self.alloc(NodeKind::UnitExpr, open.start, close.end, Vec::new());
        }
        if is_operator(self.kind()) && self.nth(1).kind == TokenKind::RParen {
            let op = self.bump();
            let ident = self.leaf(NodeKind::OperatorIdentifier, op);
            self.bump();
            return self.finish(
                NodeKind::OperatorAsFunctionExpr,
                open.start,
                vec![(None, ident)],
            );
        }

        let first = self.parse_expr();
        if self.kind() == TokenKind::Comma {
            let mut items = vec![(None, first)];
            while self.eat_raw(TokenKind::Comma).is_some() {
                items.push((None, self.parse_expr()));
            }
            self.expect_raw(TokenKind::RParen, "`)`");
            return self.finish(NodeKind::TupleExpr, open.start, items);
        }
        self.expect_raw(TokenKind::RParen, "`)`");
        self.finish(
            NodeKind::ParenthesizedExpr,
            open.start,
            vec![(Some("expression"), first)],
        )
    }

    fn parse_list(&mut self) -> NodeId {
        let open = self.bump();
        let mut items = Vec::new();
        if self.eat_raw(TokenKind::RBracket).is_none() {
            loop {
                items.push((None, self.parse_expr()));
                if self.eat_raw(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect_raw(TokenKind::RBracket, "`]`");
        }
        self.finish(NodeKind::ListExpr, open.start, items)
    }

    fn parse_record(&mut self) -> NodeId {
        let open = self.bump();
        let mut children = Vec::new();
        if self.eat_raw(TokenKind::RBrace).is_some() {
            return self.finish(NodeKind::RecordExpr, open.start, children);
        }

        if self.at(TokenKind::Lower) && self.nth(1).kind == TokenKind::Pipe {
            let token = self.bump();
            children.push((
                Some("baseRecord"),
                self.leaf(NodeKind::RecordBaseIdentifier, token),
            ));
            self.bump();
        }

        loop {
            if let Some(token) = self.eat(TokenKind::Lower) {
                let name = self.leaf(NodeKind::LowerCaseIdentifier, token);
                let mut parts = vec![(Some("name"), name)];
                if self.expect(TokenKind::Equals, "`=`").is_some() {
                    parts.push((Some("expression"), self.parse_expr()));
                }
                children.push((Some("field"), self.finish(NodeKind::Field, token.start, parts)));
            } else {
                children.push((None, self.missing("a field name")));
                break;
            }
            if self.eat_raw(TokenKind::Comma).is_none() {
                break;
            }
        }

        self.expect_raw(TokenKind::RBrace, "`}`");
        self.finish(NodeKind::RecordExpr, open.start, children)
    }

    fn parse_lambda(&mut self) -> NodeId {
        let start = self.bump().start;
        let mut children = Vec::new();
        while self.at_pattern_atom_start() {
            children.push((Some("param"), self.parse_pattern_atom()));
        }
        if children.is_empty() {
            children.push((None, self.missing("a parameter")));
        }
        if self.expect(TokenKind::Arrow, "`->`").is_some() {
            children.push((Some("expr"), self.parse_expr()));
        }
        self.finish(NodeKind::AnonymousFunctionExpr, start, children)
    }

    fn parse_if(&mut self) -> NodeId {
        let start = self.bump().start;
        let mut children = vec![(Some("condition"), self.parse_expr())];
        if self.expect_raw(TokenKind::Then, "`then`").is_some() {
            children.push((Some("then"), self.parse_expr()));
            if self.expect_raw(TokenKind::Else, "`else`").is_some() {
                let otherwise = if self.kind() == TokenKind::If {
                    self.parse_if()
                } else {
                    self.parse_expr()
                };
                children.push((Some("else"), otherwise));
            }
        }
        self.finish(NodeKind::IfElseExpr, start, children)
    }

    fn parse_case(&mut self) -> NodeId {
        let start = self.bump().start;
        let mut children = vec![(Some("expr"), self.parse_expr())];
        if self.expect_raw(TokenKind::Of, "`of`").is_none() {
            return self.finish(NodeKind::CaseOfExpr, start, children);
        }

        let outer = self.layout.last().copied().unwrap_or(1);
        let column = self.peek().col;
        self.layout.push(column);
        let mut first = true;
        loop {
            let token = self.peek();
            if token.kind == TokenKind::Eof {
                break;
            }
            if first {
                if token.first_on_line && token.col <= outer {
                    break;
                }
            } else if !(token.first_on_line && token.col == column) {
                break;
            }
            self.item_start = self.pos;
            children.push((Some("branch"), self.parse_case_branch()));
            first = false;
        }
        self.layout.pop();

        if first {
            children.push((None, self.missing("a case branch")));
        }
        self.finish(NodeKind::CaseOfExpr, start, children)
    }

    fn parse_case_branch(&mut self) -> NodeId {
        let start = self.peek().start;
        let pattern = self.parse_pattern();
        let pattern = self.wrap_pattern(pattern);
        let mut children = vec![(Some("pattern"), pattern)];
        if self.expect(TokenKind::Arrow, "`->`").is_some() {
            children.push((Some("expr"), self.parse_expr()));
        }
        self.finish(NodeKind::CaseOfBranch, start, children)
    }

    fn parse_let(&mut self) -> NodeId {
        let start = self.bump().start;
        let mut children = Vec::new();

        let outer = self.layout.last().copied().unwrap_or(1);
        let column = self.peek().col;
        self.layout.push(column);
        let mut first = true;
        loop {
            let token = self.peek();
            if matches!(token.kind, TokenKind::In | TokenKind::Eof) {
                break;
            }
            if first {
                if token.first_on_line && token.col <= outer {
                    break;
                }
            } else if !(token.first_on_line && token.col == column) {
                if token.first_on_line && token.col < column {
                    break;
                }
                let error =
                    self.skip_to_boundary("unexpected tokens in let block", Some(TokenKind::In));
                children.push((None, error));
                continue;
            }

            self.item_start = self.pos;
            let decl = match self.kind() {
                TokenKind::Lower if self.nth(1).kind == TokenKind::Colon => {
                    self.parse_type_annotation()
                }
                TokenKind::Lower => self.parse_function_declaration(),
                TokenKind::LParen
                | TokenKind::LBrace
                | TokenKind::LBracket
                | TokenKind::Underscore
                | TokenKind::Upper => self.parse_pattern_declaration(),
                _ => self.skip_to_boundary("expected a declaration", Some(TokenKind::In)),
            };
            children.push((None, decl));
            first = false;
        }
        self.layout.pop();

        if first {
            children.push((None, self.missing("a declaration")));
        }
        if self.expect_raw(TokenKind::In, "`in`").is_some() {
            children.push((Some("body"), self.parse_expr()));
        }
        self.finish(NodeKind::LetInExpr, start, children)
    }
}

fn nodes_start(nodes: &[NodeData], id: NodeId) -> usize {
    nodes[id.index()].start
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
