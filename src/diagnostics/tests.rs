use super::error_codes::{patterns, suggestions, types};
use super::*;
use pretty_assertions::assert_eq;

fn span(start: usize, end: usize, from: (usize, usize), to: (usize, usize)) -> Span {
    Span::new(
        "src/Main.elm",
        start,
        end,
        Position::new(from.0, from.1),
        Position::new(to.0, to.1),
    )
}

#[test]
fn test_json_shape() {
    let diag = Diagnostic::error(types::TYPE_MISMATCH)
        .message("Type mismatch")
        .span(span(10, 20, (1, 11), (1, 21)))
        .build();

    let value: serde_json::Value = serde_json::from_str(&diag.to_json()).unwrap();
    assert_eq!(value["code"], "E1001");
    assert_eq!(value["severity"], "error");
    assert_eq!(value["span"]["from"]["line"], 1);
    assert!(value.get("notes").is_none());
}

#[test]
fn test_span_merge() {
    let merged = span(10, 20, (1, 11), (1, 21)).merge(&span(15, 30, (1, 16), (2, 5)));
    assert_eq!((merged.start, merged.end), (10, 30));
    assert_eq!(merged.from, Position::new(1, 11));
    assert_eq!(merged.to, Position::new(2, 5));
}

#[test]
fn test_hint_is_not_an_error() {
    let diag = Diagnostic::hint(suggestions::MISSING_TYPE_ANNOTATION)
        .message("Missing type annotation")
        .build();
    assert!(!diag.is_error());
    assert_eq!(diag.uri(), "");
}

#[test]
fn test_suggestion_edits_serialize() {
    let at = span(0, 0, (3, 1), (3, 1));
    let diag = Diagnostic::hint(suggestions::MISSING_TYPE_ANNOTATION)
        .message("Top-level declaration `x` has no type annotation")
        .span(at.clone())
        .suggestion(Suggestion::insert("Add the inferred type annotation", at, "x : Int\n"))
        .build();

    let json = diag.to_json();
    assert!(json.contains("Add the inferred type annotation"));
    assert!(json.contains("x : Int\\n"));
}

#[test]
fn test_human_readable_underlines_the_span() {
    let source = "module Main exposing (..)\n\nmain =\n    foo\n";
    let diag = Diagnostic::error(types::MISSING_VALUE)
        .message("No definition found for `foo`")
        .span(span(38, 41, (4, 5), (4, 8)))
        .note(Note::new("Is there an import or a typo?"))
        .build();

    insta::assert_snapshot!(diag.to_human_readable(source), @r###"
    src/Main.elm:4:5: error E1002: No definition found for `foo`
      |
    4 |     foo
      |     ^^^
      = note: Is there an import or a typo?
    "###);
}

#[test]
fn test_severity_decides_failure() {
    let redundant = Diagnostic::warning(patterns::REDUNDANT_PATTERN).message("Branch 2 is redundant").build();
    let mismatch = Diagnostic::error(types::TYPE_MISMATCH).message("Type mismatch").build();
    assert!(!redundant.is_error());
    assert!(mismatch.is_error());
    assert!(redundant.to_json().contains("\"severity\":\"warning\""));
}

#[test]
fn test_dedup_keeps_first_of_identical_reports() {
    let at = span(4, 9, (1, 5), (1, 10));
    let report = |message: &str| {
        Diagnostic::error(types::TYPE_MISMATCH)
            .message(message)
            .span(at.clone())
            .build()
    };
    let mut bag = DiagnosticBag::new();
    bag.extend([report("same"), report("same")]);
    bag.extend([report("different"), report("same")]);

    bag.dedup();
    let messages: Vec<String> = bag.take().into_iter().map(|d| d.message).collect();
    assert_eq!(messages, vec!["same".to_string(), "different".to_string()]);
}
