use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn color() -> Rc<Union> {
    Union::new(
        "Main",
        "Color",
        vec![ctor("Red", 0), ctor("Green", 0), ctor("Blue", 0)],
    )
}

fn bool_union() -> Rc<Union> {
    Union::new("Basics", "Bool", vec![ctor("True", 0), ctor("False", 0)])
}

fn maybe() -> Rc<Union> {
    Union::new("Maybe", "Maybe", vec![ctor("Just", 1), ctor("Nothing", 0)])
}

fn c(union: &Rc<Union>, name: &str) -> Pattern {
    Pattern::ctor(union, name, Vec::new())
}

fn pair(a: Pattern, b: Pattern) -> Pattern {
    Pattern::ctor(&Union::pair(), PAIR, vec![a, b])
}

fn cons(head: Pattern, tail: Pattern) -> Pattern {
    Pattern::ctor(&Union::list(), CONS, vec![head, tail])
}

fn nil() -> Pattern {
    Pattern::ctor(&Union::list(), NIL, Vec::new())
}

fn missing_docs(rows: Vec<Pattern>) -> Vec<String> {
    check_case(rows).missing.iter().map(pattern_to_doc).collect()
}

#[test]
fn test_missing_constructor() {
    let color = color();
    assert_eq!(
        missing_docs(vec![c(&color, "Red"), c(&color, "Green")]),
        vec!["Blue"]
    );
}

#[test]
fn test_wildcard_makes_case_complete() {
    let color = color();
    let check = check_case(vec![c(&color, "Red"), Pattern::Anything]);
    assert!(check.missing.is_empty());
    assert!(check.redundant.is_empty());
}

#[test]
fn test_branch_after_wildcard_is_redundant() {
    let color = color();
    let check = check_case(vec![Pattern::Anything, c(&color, "Red")]);
    assert_eq!(check.redundant, vec![1]);
    assert!(check.missing.is_empty());
}

#[test]
fn test_duplicate_constructor_is_redundant() {
    let color = color();
    let check = check_case(vec![
        c(&color, "Red"),
        c(&color, "Red"),
        c(&color, "Green"),
        c(&color, "Blue"),
    ]);
    assert_eq!(check.redundant, vec![1]);
}

#[test]
fn test_missing_bool_pairs() {
    let b = bool_union();
    let rows = vec![
        pair(c(&b, "True"), c(&b, "True")),
        pair(c(&b, "False"), c(&b, "False")),
    ];
    assert_eq!(
        missing_docs(rows),
        vec!["( True, False )", "( False, True )"]
    );
}

#[test]
fn test_missing_nested_constructor_is_parenthesized() {
    let m = maybe();
    let color = color();
    let rows = vec![
        Pattern::ctor(&m, "Just", vec![c(&color, "Red")]),
        Pattern::ctor(&m, "Just", vec![c(&color, "Green")]),
        c(&m, "Nothing"),
    ];
    assert_eq!(missing_docs(rows), vec!["Just Blue"]);

    let nested = Pattern::ctor(&m, "Just", vec![Pattern::ctor(&m, "Just", vec![Pattern::Anything])]);
    assert_eq!(pattern_to_doc(&nested), "Just (Just _)");
}

#[test]
fn test_missing_list_shapes() {
    assert_eq!(missing_docs(vec![nil()]), vec!["_ :: _"]);
    assert_eq!(missing_docs(vec![cons(Pattern::Anything, Pattern::Anything)]), vec!["[]"]);
    assert_eq!(
        missing_docs(vec![nil(), cons(Pattern::Anything, nil())]),
        vec!["_ :: _ :: _"]
    );
}

#[test]
fn test_list_rendering() {
    let lit = |i| Pattern::Literal(Literal::Int(i));
    assert_eq!(pattern_to_doc(&cons(lit(1), cons(lit(2), nil()))), "[1, 2]");
    assert_eq!(pattern_to_doc(&nil()), "[]");
    let m = maybe();
    let inside = Pattern::ctor(&m, "Just", vec![cons(Pattern::Anything, Pattern::Anything)]);
    assert_eq!(pattern_to_doc(&inside), "Just (_ :: _)");
}

#[test]
fn test_literals_never_exhaust() {
    let rows = vec![
        Pattern::Literal(Literal::Int(0)),
        Pattern::Literal(Literal::Int(1)),
    ];
    assert_eq!(missing_docs(rows), vec!["_"]);

    let check = check_case(vec![
        Pattern::Literal(Literal::Str("a".to_string())),
        Pattern::Literal(Literal::Str("a".to_string())),
        Pattern::Anything,
    ]);
    assert_eq!(check.redundant, vec![1]);
    assert!(check.missing.is_empty());
}

#[test]
fn test_unit_is_exhaustive() {
    let unit = Pattern::ctor(&Union::unit(), UNIT, Vec::new());
    assert!(check_case(vec![unit.clone()]).missing.is_empty());
    assert_eq!(pattern_to_doc(&unit), "()");
}

#[test]
fn test_decision_tree_with_default() {
    let color = color();
    let tree = compile(vec![c(&color, "Red"), c(&color, "Green"), Pattern::Anything]).unwrap();
    insta::assert_snapshot!(tree.render(), @r###"
    _ is Red:
      -> 0
    _ is Green:
      -> 1
    otherwise:
      -> 2
    "###);
}

#[test]
fn test_decision_tree_through_tuple() {
    let b = bool_union();
    let tree = compile(vec![
        pair(c(&b, "True"), Pattern::Anything),
        pair(c(&b, "False"), Pattern::Anything),
    ])
    .unwrap();
    insta::assert_snapshot!(tree.render(), @r###"
    _.0 is True:
      -> 0
    _.0 is False:
      -> 1
    "###);
}

#[test]
fn test_decision_tree_unboxes_single_constructor() {
    let wrapper = Union::new("Main", "Id", vec![ctor("Id", 1)]);
    let m = maybe();
    let tree = compile(vec![
        Pattern::ctor(&wrapper, "Id", vec![c(&m, "Nothing")]),
        Pattern::ctor(&wrapper, "Id", vec![Pattern::Anything]),
    ])
    .unwrap();
    assert_eq!(tree.render(), "_.unbox is Nothing:\n  -> 0\notherwise:\n  -> 1\n");
}

#[test]
fn test_first_irrefutable_branch_matches() {
    assert_eq!(compile(vec![Pattern::Anything, Pattern::Anything]), Some(DecisionTree::Match(0)));
}

#[test]
fn test_no_branches_have_no_tree() {
    assert_eq!(compile(Vec::new()), None);
}

fn color_row() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![
        Just(None),
        Just(Some("Red")),
        Just(Some("Green")),
        Just(Some("Blue")),
    ]
}

proptest! {
    #[test]
    fn prop_trailing_wildcard_is_exhaustive(rows in proptest::collection::vec(color_row(), 0..6)) {
        let color = color();
        let mut patterns: Vec<Pattern> = rows
            .into_iter()
            .map(|r| r.map_or(Pattern::Anything, |name| c(&color, name)))
            .collect();
        patterns.push(Pattern::Anything);
        prop_assert!(check_case(patterns).missing.is_empty());
    }

    #[test]
    fn prop_missing_plus_present_covers_union(rows in proptest::collection::vec(color_row(), 0..6)) {
        let color = color();
        let patterns: Vec<Pattern> = rows
            .iter()
            .map(|r| r.map_or(Pattern::Anything, |name| c(&color, name)))
            .collect();
        let check = check_case(patterns.clone());
        let mut completed = patterns;
        completed.extend(check.missing);
        prop_assert!(check_case(completed).missing.is_empty());
    }

    #[test]
    fn prop_any_branches_compile(rows in proptest::collection::vec(color_row(), 1..6)) {
        let color = color();
        let patterns: Vec<Pattern> = rows
            .into_iter()
            .map(|r| r.map_or(Pattern::Anything, |name| c(&color, name)))
            .collect();
        prop_assert!(compile(patterns).is_some());
    }
}
