//! Lexer for Elm source text

use crate::syntax::line_index::LineIndex;
use logos::Logos;

/// Raw tokens as recognized by the generated DFA. Qualified names and
/// operator symbols are assembled from these in [`tokenize`].
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[token("module")]
    Module,
    #[token("exposing")]
    Exposing,
    #[token("import")]
    Import,
    #[token("as")]
    As,
    #[token("type")]
    Type,
    #[token("port")]
    Port,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("case")]
    Case,
    #[token("of")]
    Of,
    #[token("let")]
    Let,
    #[token("in")]
    In,
    #[token("where")]
    Where,

    #[regex(r"[a-z][A-Za-z0-9_]*")]
    Lower,
    #[regex(r"[A-Z][A-Za-z0-9_]*")]
    Upper,
    #[regex(r"\.[a-z][A-Za-z0-9_]*")]
    DotLower,
    #[regex(r"\.[A-Z][A-Za-z0-9_]*")]
    DotUpper,

    #[regex(r"[+\-*/<>=&|^%!?.:@#$~]+")]
    Symbol,

    #[token("\\")]
    Backslash,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token("_")]
    Underscore,

    #[regex(r"[0-9]+")]
    #[regex(r"0x[0-9A-Fa-f]+")]
    Int,
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Float,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[token(r#"""""#, triple_quoted)]
    String,
    #[regex(r"'([^'\\\n]|\\.|\\u\{[0-9A-Fa-f]+\})'")]
    Char,

    #[regex(r"--[^\n]*")]
    LineComment,
    #[token("{-", block_comment)]
    BlockComment,
}

fn triple_quoted(lex: &mut logos::Lexer<RawToken>) -> bool {
    let rest = lex.remainder().as_bytes();
    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            b'\\' => i += 2,
            b'"' if rest[i..].starts_with(b"\"\"\"") => {
                lex.bump(i + 3);
                return true;
            }
            _ => i += 1,
        }
    }
    false
}

fn block_comment(lex: &mut logos::Lexer<RawToken>) -> bool {
    let rest = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i + 1 < rest.len() {
        if rest[i] == b'{' && rest[i + 1] == b'-' {
            depth += 1;
            i += 2;
        } else if rest[i] == b'-' && rest[i + 1] == b'}' {
            depth -= 1;
            i += 2;
            if depth == 0 {
                lex.bump(i);
                return true;
            }
        } else {
            i += 1;
        }
    }
    false
}

/// Token kinds seen by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Module,
    Exposing,
    Import,
    As,
    Type,
    Port,
    If,
    Then,
    Else,
    Case,
    Of,
    Let,
    In,
    Where,

    // Names
    /// `foo`
    Lower,
    /// `Foo` or `Foo.Bar`
    Upper,
    /// `Foo.bar`
    QualifiedLower,
    /// `.field`
    DotField,

    // Symbols
    Equals,
    Arrow,
    Pipe,
    Colon,
    DotDot,
    Dot,
    Minus,
    Operator,

    // Punctuation
    Backslash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Underscore,

    // Literals
    Int,
    Float,
    String,
    Char,

    /// Unrecognized input
    Error,
    Eof,
}

/// A token with its byte range and layout position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub col: usize,
    /// No other token precedes this one on its line
    pub first_on_line: bool,
}

impl Token {
    /// The source text of this token
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

fn classify_symbol(text: &str) -> TokenKind {
    match text {
        "=" => TokenKind::Equals,
        "->" => TokenKind::Arrow,
        "|" => TokenKind::Pipe,
        ":" => TokenKind::Colon,
        ".." => TokenKind::DotDot,
        "." => TokenKind::Dot,
        "-" => TokenKind::Minus,
        _ => TokenKind::Operator,
    }
}

/// Tokenize `source`. The result always ends with an `Eof` token; comments
/// are dropped and unrecognized input becomes `Error` tokens.
pub fn tokenize(source: &str, index: &LineIndex) -> Vec<Token> {
    let mut raw: Vec<(Option<RawToken>, usize, usize)> = Vec::new();
    let mut lexer = RawToken::lexer(source);
    while let Some(result) = lexer.next() {
        let range = lexer.span();
        match result {
            Ok(RawToken::LineComment) | Ok(RawToken::BlockComment) => {}
            Ok(kind) => raw.push((Some(kind), range.start, range.end)),
            Err(()) => raw.push((None, range.start, range.end)),
        }
    }

    let mut tokens: Vec<Token> = Vec::with_capacity(raw.len() + 1);
    let mut last_line = 0;
    let mut i = 0;
    while i < raw.len() {
        let (kind, start, mut end) = raw[i];
        i += 1;
        let kind = match kind {
            Some(RawToken::Upper) => {
                let mut kind = TokenKind::Upper;
                while let Some(&(Some(next), next_start, next_end)) = raw.get(i) {
                    if next_start != end {
                        break;
                    }
                    match next {
                        RawToken::DotUpper => {
                            end = next_end;
                            i += 1;
                        }
                        RawToken::DotLower => {
                            end = next_end;
                            i += 1;
                            kind = TokenKind::QualifiedLower;
                            break;
                        }
                        _ => break,
                    }
                }
                kind
            }
            Some(raw_kind) => match raw_kind {
                RawToken::Module => TokenKind::Module,
                RawToken::Exposing => TokenKind::Exposing,
                RawToken::Import => TokenKind::Import,
                RawToken::As => TokenKind::As,
                RawToken::Type => TokenKind::Type,
                RawToken::Port => TokenKind::Port,
                RawToken::If => TokenKind::If,
                RawToken::Then => TokenKind::Then,
                RawToken::Else => TokenKind::Else,
                RawToken::Case => TokenKind::Case,
                RawToken::Of => TokenKind::Of,
                RawToken::Let => TokenKind::Let,
                RawToken::In => TokenKind::In,
                RawToken::Where => TokenKind::Where,
                RawToken::Lower => TokenKind::Lower,
                RawToken::DotLower => TokenKind::DotField,
                RawToken::Symbol => classify_symbol(&source[start..end]),
                RawToken::Backslash => TokenKind::Backslash,
                RawToken::LParen => TokenKind::LParen,
                RawToken::RParen => TokenKind::RParen,
                RawToken::LBracket => TokenKind::LBracket,
                RawToken::RBracket => TokenKind::RBracket,
                RawToken::LBrace => TokenKind::LBrace,
                RawToken::RBrace => TokenKind::RBrace,
                RawToken::Comma => TokenKind::Comma,
                RawToken::Underscore => TokenKind::Underscore,
                RawToken::Int => TokenKind::Int,
                RawToken::Float => TokenKind::Float,
                RawToken::String => TokenKind::String,
                RawToken::Char => TokenKind::Char,
                RawToken::DotUpper
                | RawToken::Upper
                | RawToken::LineComment
                | RawToken::BlockComment => TokenKind::Error,
            },
            None => TokenKind::Error,
        };

        let (line, col) = index.line_col(start);
        tokens.push(Token {
            kind,
            start,
            end,
            line,
            col,
            first_on_line: line != last_line,
        });
        last_line = line;
    }

    let (line, col) = index.line_col(source.len());
    tokens.push(Token {
        kind: TokenKind::Eof,
        start: source.len(),
        end: source.len(),
        line,
        col,
        first_on_line: true,
    });
    tokens
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
