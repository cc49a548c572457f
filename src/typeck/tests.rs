use super::*;
use crate::diagnostics::error_codes::{patterns as pattern_codes, types as type_codes};
use crate::program::FileOptions;
use crate::syntax::FileId;
use pretty_assertions::assert_eq;

fn program(body: &str) -> (Program, FileId) {
    let mut program = Program::with_core();
    let source = format!("module Main exposing (..)\n\n{}", body);
    let id = program.add_file("src/Main.elm", source, FileOptions::project());
    (program, id)
}

fn type_of(body: &str, name: &str) -> String {
    let (program, id) = program(body);
    let file = program.file(id).unwrap();
    let checker = program.type_checker();
    let ty = checker.find_type_of_declaration(file, name).unwrap();
    checker.type_to_string(&ty, Some(file))
}

fn diagnostics(body: &str) -> Vec<Diagnostic> {
    let (program, id) = program(body);
    let file = program.file(id).unwrap();
    program.type_checker().get_diagnostics(file, None).unwrap()
}

fn codes(body: &str) -> Vec<String> {
    diagnostics(body).into_iter().map(|d| d.code).collect()
}

fn reports(body: &str, code: &str) -> bool {
    codes(body).iter().any(|c| c == code)
}

#[test]
fn test_annotated_declaration() {
    let body = "add : Int -> Int -> Int\nadd a b =\n    a + b\n";
    assert_eq!(type_of(body, "add"), "Int -> Int -> Int");
    assert!(codes(body).is_empty());
}

#[test]
fn test_number_constraint_survives_inference() {
    assert_eq!(type_of("double x =\n    x * 2\n", "double"), "number -> number");
}

#[test]
fn test_identity_is_generic() {
    assert_eq!(type_of("identity2 x =\n    x\n", "identity2"), "a -> a");
}

#[test]
fn test_operator_precedence() {
    let body = "a =\n    1 + 2 * 3\n\nb =\n    1 + 2 == 3\n";
    assert_eq!(type_of(body, "a"), "number");
    assert_eq!(type_of(body, "b"), "Bool");
    assert!(codes(body).is_empty());
}

#[test]
fn test_non_associative_operators() {
    assert!(reports("x =\n    1 == 2 == 3\n", type_codes::NON_ASSOCIATIVE_OPERATOR));
}

#[test]
fn test_type_mismatch() {
    let found = diagnostics("x : Int\nx =\n    \"hello\"\n");
    let mismatch = found.iter().find(|d| d.code == type_codes::TYPE_MISMATCH).unwrap();
    assert!(mismatch.message.contains("Int"));
    assert!(mismatch.message.contains("String"));
}

#[test]
fn test_missing_value() {
    let found = diagnostics("x =\n    y\n");
    let missing = found.iter().find(|d| d.code == type_codes::MISSING_VALUE).unwrap();
    assert!(missing.message.contains("`y`"));
}

#[test]
fn test_too_many_arguments() {
    assert!(reports("f : Int -> Int\nf n =\n    n\n\nx =\n    f 1 2\n", type_codes::ARGUMENT_COUNT));
}

#[test]
fn test_too_many_parameters() {
    assert!(reports("f : Int -> Int\nf a b =\n    a\n", type_codes::PARAMETER_COUNT));
}

#[test]
fn test_extra_parameters_keep_annotated_ones() {
    let body = "f : Int -> Int\nf a b =\n    a ++ \"x\"\n";
    assert!(reports(body, type_codes::PARAMETER_COUNT));
    let mismatch = diagnostics(body)
        .into_iter()
        .find(|d| d.code == type_codes::TYPE_MISMATCH)
        .unwrap();
    assert!(mismatch.message.contains("Int"));
}

#[test]
fn test_recursive_value() {
    let found = diagnostics("x =\n    x + 1\n");
    let recursive = found
        .iter()
        .find(|d| d.code == type_codes::RECURSIVE_DECLARATION)
        .unwrap();
    assert!(recursive.message.contains("`x`"));
}

#[test]
fn test_recursive_function_is_fine() {
    let body = "countdown n =\n    if n == 0 then\n        0\n\n    else\n        countdown (n - 1)\n";
    assert!(codes(body).is_empty());
    assert_eq!(type_of(body, "countdown"), "number -> number");
}

#[test]
fn test_recursive_alias_reported_once() {
    let found = codes("type alias A =\n    { a : B }\n\ntype alias B =\n    { b : A }\n");
    let count = found.iter().filter(|c| *c == type_codes::RECURSIVE_ALIAS).count();
    assert_eq!(count, 1);
}

#[test]
fn test_type_argument_count() {
    assert!(reports("x : List\nx =\n    []\n", type_codes::TYPE_ARGUMENT_COUNT));
}

#[test]
fn test_incomplete_case() {
    let body = "type Color\n    = Red\n    | Green\n    | Blue\n\n\
                toInt c =\n    case c of\n        Red ->\n            1\n\n        Green ->\n            2\n";
    let found = diagnostics(body);
    let incomplete = found.iter().find(|d| d.code == pattern_codes::INCOMPLETE_CASE).unwrap();
    assert!(incomplete.message.contains("Blue"));
    assert!(!incomplete.message.contains("Red"));
}

#[test]
fn test_redundant_branch_is_a_warning() {
    let body = "type Color\n    = Red\n    | Green\n\n\
                toInt c =\n    case c of\n        _ ->\n            1\n\n        Red ->\n            2\n";
    let found = diagnostics(body);
    let redundant = found.iter().find(|d| d.code == pattern_codes::REDUNDANT_PATTERN).unwrap();
    assert!(!redundant.is_error());
    assert!(redundant.message.contains("Branch 2"));
}

#[test]
fn test_incomplete_parameter_pattern() {
    assert!(reports("unwrap (Just x) =\n    x\n", pattern_codes::INCOMPLETE_PATTERN));
}

#[test]
fn test_missing_patterns_and_decision_tree() {
    let body = "f m =\n    case m of\n        Just _ ->\n            1\n";
    let (program, id) = program(body);
    let file = program.file(id).unwrap();
    let case = file
        .root()
        .descendants()
        .find(|n| n.is(NodeKind::CaseOfExpr))
        .unwrap()
        .node_ref();
    let checker = program.type_checker();
    assert_eq!(checker.missing_patterns(case), vec!["Nothing".to_string()]);
    assert!(checker.case_decision_tree(case).is_some());
}

#[test]
fn test_record_access_is_extensible() {
    let rendered = type_of("getX r =\n    r.x\n", "getX");
    assert!(rendered.starts_with("{ "));
    assert!(rendered.contains(" | x : "));
}

#[test]
fn test_record_mismatch_lists_fields() {
    let found = diagnostics("p : { x : Int }\np =\n    { y = 1 }\n");
    let mismatch = found.iter().find(|d| d.code == type_codes::TYPE_MISMATCH).unwrap();
    let notes: Vec<&str> = mismatch.notes.iter().map(|n| n.message.as_str()).collect();
    assert!(notes.iter().any(|n| n.contains("Missing field `x`")));
    assert!(notes.iter().any(|n| n.contains("Extra field `y`")));
}

#[test]
fn test_missing_record_field() {
    let body = "p : { x : Int }\np =\n    { x = 1 }\n\ny =\n    p.y\n";
    assert!(reports(body, type_codes::RECORD_FIELD));
}

#[test]
fn test_let_polymorphism() {
    let body = "pair =\n    let\n        id y =\n            y\n    in\n    ( id 1, id \"s\" )\n";
    assert!(codes(body).is_empty());
    assert_eq!(type_of(body, "pair"), "( number, String )");
}

#[test]
fn test_let_annotation_shares_outer_variables() {
    let body = "f : a -> List a\nf x =\n    let\n        wrap : a -> List a\n        wrap y =\n            [ y ]\n    in\n    wrap x\n";
    assert!(codes(body).is_empty());
}

#[test]
fn test_destructured_top_level() {
    let body = "( first, second ) =\n    ( 1, \"two\" )\n\nuseSecond =\n    second\n";
    assert_eq!(type_of(body, "useSecond"), "String");
}

#[test]
fn test_constructor_types() {
    let body = "type Shape\n    = Circle Float\n    | Square Float\n\nunit =\n    Circle\n";
    assert_eq!(type_of(body, "unit"), "Float -> Shape");
}

#[test]
fn test_unknown_declaration() {
    let (program, id) = program("x =\n    1\n");
    let file = program.file(id).unwrap();
    let missing = program.type_checker().find_type_of_declaration(file, "nope");
    assert!(matches!(missing, Err(CheckError::UnknownDeclaration { .. })));
}

#[test]
fn test_results_are_cached() {
    let (program, id) = program("x =\n    1\n\ny =\n    x\n");
    let file = program.file(id).unwrap();
    let checker = program.type_checker();
    checker.get_diagnostics(file, None).unwrap();
    let before = program.cache().borrow().stats();
    checker.get_diagnostics(file, None).unwrap();
    let after = program.cache().borrow().stats();
    assert!(after.hits > before.hits);
    assert_eq!(after.misses, before.misses);
}

fn declaration(file: &SourceFile, name: &str) -> NodeRef {
    file.root()
        .children()
        .filter_map(ValueDeclaration::cast)
        .find(|d| d.name().map(|n| n.text()) == Some(name))
        .unwrap()
        .syntax()
        .node_ref()
}

#[test]
fn test_invalidation_reinfers_only_that_declaration() {
    let (mut program, id) = program("x =\n    1\n\ny =\n    \"y\"\n");
    {
        let file = program.file(id).unwrap();
        let checker = program.type_checker();
        checker.get_diagnostics(file, None).unwrap();
        program.invalidate_value_declaration(declaration(file, "x"));

        let before = program.cache().borrow().stats();
        let y = checker.find_type_of_declaration(file, "y").unwrap();
        assert_eq!(checker.type_to_string(&y, Some(file)), "String");
        let sibling = program.cache().borrow().stats();
        assert!(sibling.hits > before.hits);
        assert_eq!(sibling.misses, before.misses);

        let x = checker.find_type_of_declaration(file, "x").unwrap();
        assert_eq!(checker.type_to_string(&x, Some(file)), "number");
        assert!(program.cache().borrow().stats().misses > sibling.misses);
    }

    program.add_file(
        "src/Main.elm",
        "module Main exposing (..)\n\nx =\n    \"one\"\n\ny =\n    \"y\"\n",
        FileOptions::project(),
    );
    let file = program.file(id).unwrap();
    let checker = program.type_checker();
    let x = checker.find_type_of_declaration(file, "x").unwrap();
    assert_eq!(checker.type_to_string(&x, Some(file)), "String");
}

#[test]
fn test_cancellation() {
    let (program, id) = program("x =\n    1\n");
    let file = program.file(id).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let outcome = program.type_checker().get_diagnostics(file, Some(&token));
    assert!(matches!(outcome, Err(CheckError::Cancelled)));
    assert!(program.type_checker().get_diagnostics(file, None).unwrap().is_empty());
}

#[test]
fn test_missing_annotation_hint() {
    let (program, id) = program("f x =\n    x\n");
    let file = program.file(id).unwrap();
    let hints = program.type_checker().get_suggestion_diagnostics(file);
    assert_eq!(hints.len(), 1);
    assert_eq!(hints[0].code, suggestions::MISSING_TYPE_ANNOTATION);
    assert!(hints[0].message.contains("a -> a"));
    assert_eq!(hints[0].suggestions.len(), 1);
}

#[test]
fn test_find_definition_of_value() {
    let (program, id) = program("helper =\n    1\n\nmain =\n    helper\n");
    let file = program.file(id).unwrap();
    let reference = file
        .root()
        .descendants()
        .find(|n| n.is(NodeKind::ValueExpr))
        .unwrap();
    let found = program.type_checker().find_definition(reference.node_ref());
    let symbol = found.symbol.unwrap();
    assert_eq!(symbol.name, "helper");
    assert!(found.diagnostics.is_empty());
}

#[test]
fn test_find_definition_reports_missing_names() {
    let (program, id) = program("main =\n    nowhere\n");
    let file = program.file(id).unwrap();
    let reference = file
        .root()
        .descendants()
        .find(|n| n.is(NodeKind::ValueExpr))
        .unwrap();
    let found = program.type_checker().find_definition(reference.node_ref());
    assert!(found.symbol.is_none());
    assert_eq!(found.diagnostics[0].code, type_codes::MISSING_VALUE);
}

#[test]
fn test_own_types_render_unqualified() {
    let body = "type Color\n    = Red\n\nc =\n    Red\n";
    assert_eq!(type_of(body, "c"), "Color");
}

#[test]
fn test_missing_import() {
    assert!(reports("import Nowhere\n\nx =\n    1\n", resolution::IMPORT_MISSING));
}
