use super::*;
use pretty_assertions::assert_eq;

fn lex(source: &str) -> Vec<TokenKind> {
    let index = LineIndex::new(source);
    tokenize(source, &index)
        .into_iter()
        .map(|t| t.kind)
        .filter(|k| *k != TokenKind::Eof)
        .collect()
}

fn texts(source: &str) -> Vec<&str> {
    let index = LineIndex::new(source);
    tokenize(source, &index)
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.text(source))
        .collect()
}

#[test]
fn test_keywords() {
    assert_eq!(
        lex("module import exposing case of let in if then else"),
        vec![
            TokenKind::Module,
            TokenKind::Import,
            TokenKind::Exposing,
            TokenKind::Case,
            TokenKind::Of,
            TokenKind::Let,
            TokenKind::In,
            TokenKind::If,
            TokenKind::Then,
            TokenKind::Else,
        ]
    );
}

#[test]
fn test_qualified_names() {
    assert_eq!(
        lex("List.map Platform.Cmd Maybe.Just model.field"),
        vec![
            TokenKind::QualifiedLower,
            TokenKind::Upper,
            TokenKind::Upper,
            TokenKind::Lower,
            TokenKind::DotField,
        ]
    );
    assert_eq!(
        texts("Platform.Cmd.none"),
        vec!["Platform.Cmd.none"]
    );
}

#[test]
fn test_symbols_are_classified() {
    assert_eq!(
        lex("= -> | : .. . - |> :: ++"),
        vec![
            TokenKind::Equals,
            TokenKind::Arrow,
            TokenKind::Pipe,
            TokenKind::Colon,
            TokenKind::DotDot,
            TokenKind::Dot,
            TokenKind::Minus,
            TokenKind::Operator,
            TokenKind::Operator,
            TokenKind::Operator,
        ]
    );
}

#[test]
fn test_literals() {
    assert_eq!(
        lex(r#"42 0xFF 3.14 1e10 "hi" 'c' '\n' """multi
line""""#),
        vec![
            TokenKind::Int,
            TokenKind::Int,
            TokenKind::Float,
            TokenKind::Float,
            TokenKind::String,
            TokenKind::Char,
            TokenKind::Char,
            TokenKind::String,
        ]
    );
}

#[test]
fn test_comments_are_skipped() {
    assert_eq!(
        lex("a -- line comment\n{- block {- nested -} -} b"),
        vec![TokenKind::Lower, TokenKind::Lower]
    );
}

#[test]
fn test_layout_positions() {
    let source = "foo =\n    bar\nbaz";
    let index = LineIndex::new(source);
    let tokens = tokenize(source, &index);

    assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
    assert!(tokens[0].first_on_line);
    assert!(!tokens[1].first_on_line);
    assert_eq!((tokens[2].line, tokens[2].col), (2, 5));
    assert!(tokens[2].first_on_line);
    assert_eq!(tokens[3].col, 1);
    assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
}

#[test]
fn test_unknown_input_becomes_error_token() {
    assert_eq!(
        lex("a ` b"),
        vec![TokenKind::Lower, TokenKind::Error, TokenKind::Lower]
    );
}
