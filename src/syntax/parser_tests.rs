use super::*;
use crate::syntax::tree::SyntaxNode;
use pretty_assertions::assert_eq;

fn parse_str(source: &str) -> SyntaxTree {
    parse(FileId(0), "file:///Test.elm", source)
}

fn kinds<'t>(nodes: impl Iterator<Item = SyntaxNode<'t>>) -> Vec<NodeKind> {
    nodes.map(|n| n.kind()).collect()
}

#[test]
fn test_module_header_and_imports() {
    let tree = parse_str(
        "module Main exposing (main, Msg(..), (|>))\n\nimport Html exposing (text)\nimport Platform.Cmd as Cmd\n",
    );
    let root = tree.root();
    assert_eq!(
        kinds(root.children()),
        vec![
            NodeKind::ModuleDeclaration,
            NodeKind::ImportClause,
            NodeKind::ImportClause
        ]
    );

    let module = root.first_child().unwrap();
    assert_eq!(module.child_by_field("name").unwrap().text(), "Main");
    let exposing = module.child_by_field("exposing").unwrap();
    assert_eq!(
        kinds(exposing.children()),
        vec![
            NodeKind::ExposedValue,
            NodeKind::ExposedType,
            NodeKind::ExposedOperator
        ]
    );
    let msg = exposing.child(1).unwrap();
    assert!(msg
        .child_of_kind(NodeKind::ExposedUnionConstructors)
        .is_some());
    assert_eq!(exposing.child(2).unwrap().first_child().unwrap().text(), "|>");

    let import = root.child(2).unwrap();
    assert_eq!(import.child_by_field("moduleName").unwrap().text(), "Platform.Cmd");
    let alias = import.child_by_field("asClause").unwrap();
    assert_eq!(alias.child_by_field("name").unwrap().text(), "Cmd");
    assert_eq!(tree.errors().count(), 0);
}

#[test]
fn test_case_branches_follow_layout() {
    let tree = parse_str(
        "f x =\n    case x of\n        Just y ->\n            y\n\n        Nothing ->\n            0\n\ng = 1\n",
    );
    let root = tree.root();
    assert_eq!(
        kinds(root.children()),
        vec![NodeKind::ValueDeclaration, NodeKind::ValueDeclaration]
    );

    let body = root.first_child().unwrap().child_by_field("body").unwrap();
    assert_eq!(body.kind(), NodeKind::CaseOfExpr);
    let branches: Vec<_> = body.children_by_field("branch").collect();
    assert_eq!(branches.len(), 2);

    let pattern = branches[0].child_by_field("pattern").unwrap();
    assert_eq!(pattern.kind(), NodeKind::Pattern);
    let union = pattern.first_child().unwrap();
    assert_eq!(union.kind(), NodeKind::UnionPattern);
    assert_eq!(union.child_by_field("constructor").unwrap().text(), "Just");
    assert_eq!(union.children_by_field("argPattern").count(), 1);
    assert_eq!(branches[1].child_by_field("expr").unwrap().text(), "0");
    assert_eq!(tree.errors().count(), 0);
}

#[test]
fn test_let_block() {
    let tree = parse_str(
        "h =\n    let\n        a = 1\n        b : Int\n        b = 2\n    in\n    a + b\n",
    );
    let body = tree
        .root()
        .first_child()
        .unwrap()
        .child_by_field("body")
        .unwrap();
    assert_eq!(body.kind(), NodeKind::LetInExpr);
    assert_eq!(
        kinds(body.children()),
        vec![
            NodeKind::ValueDeclaration,
            NodeKind::TypeAnnotation,
            NodeKind::ValueDeclaration,
            NodeKind::BinOpExpr
        ]
    );
    let sum = body.child_by_field("body").unwrap();
    assert_eq!(
        kinds(sum.children()),
        vec![NodeKind::ValueExpr, NodeKind::Operator, NodeKind::ValueExpr]
    );
    assert_eq!(tree.errors().count(), 0);
}

#[test]
fn test_single_line_let() {
    let tree = parse_str("v = let x = 1 in x\n");
    let body = tree.root().first_child().unwrap().child_by_field("body").unwrap();
    assert_eq!(body.kind(), NodeKind::LetInExpr);
    assert_eq!(body.child_by_field("body").unwrap().text(), "x");
    assert_eq!(tree.errors().count(), 0);
}

#[test]
fn test_application_and_operators() {
    let tree = parse_str("x = f a b |> g\n");
    let body = tree.root().first_child().unwrap().child_by_field("body").unwrap();
    assert_eq!(body.kind(), NodeKind::BinOpExpr);
    let call = body.first_child().unwrap();
    assert_eq!(call.kind(), NodeKind::FunctionCallExpr);
    assert_eq!(call.child_by_field("target").unwrap().text(), "f");
    assert_eq!(call.children_by_field("arg").count(), 2);
}

#[test]
fn test_negation_versus_subtraction() {
    let tree = parse_str("y = a - 1\nz = f -1\n");
    let root = tree.root();
    let y = root.child(0).unwrap().child_by_field("body").unwrap();
    assert_eq!(y.kind(), NodeKind::BinOpExpr);
    let z = root.child(1).unwrap().child_by_field("body").unwrap();
    assert_eq!(z.kind(), NodeKind::FunctionCallExpr);
    assert_eq!(
        z.child_by_field("arg").unwrap().kind(),
        NodeKind::NegateExpr
    );
}

#[test]
fn test_records_and_field_access() {
    let tree = parse_str("r = { model | x = 1 }\ns = model.x.y\nt = List.map .name people\n");
    let root = tree.root();

    let update = root.child(0).unwrap().child_by_field("body").unwrap();
    assert_eq!(update.kind(), NodeKind::RecordExpr);
    assert_eq!(update.child_by_field("baseRecord").unwrap().text(), "model");
    assert_eq!(update.children_by_field("field").count(), 1);

    let access = root.child(1).unwrap().child_by_field("body").unwrap();
    assert_eq!(access.kind(), NodeKind::FieldAccessExpr);
    assert_eq!(access.child_by_field("field").unwrap().text(), "y");
    assert_eq!(
        access.child_by_field("target").unwrap().kind(),
        NodeKind::FieldAccessExpr
    );

    let call = root.child(2).unwrap().child_by_field("body").unwrap();
    let args: Vec<_> = call.children_by_field("arg").collect();
    assert_eq!(args[0].kind(), NodeKind::FieldAccessorFunctionExpr);
    let target = call.child_by_field("target").unwrap();
    let qid = target.child_by_field("name").unwrap();
    assert_eq!(
        kinds(qid.children()),
        vec![NodeKind::UpperCaseIdentifier, NodeKind::LowerCaseIdentifier]
    );
}

#[test]
fn test_type_declarations() {
    let tree = parse_str(
        "type Maybe a\n    = Just a\n    | Nothing\n\ntype alias P a = { x : Int, y : List (Maybe a) }\n\nmap : (a -> b) -> List a -> List b\nmap f xs = xs\n",
    );
    let root = tree.root();
    let maybe = root.child(0).unwrap();
    assert_eq!(maybe.kind(), NodeKind::TypeDeclaration);
    assert_eq!(maybe.children_by_field("typeName").count(), 1);
    assert_eq!(maybe.children_by_field("unionVariant").count(), 2);

    let alias = root.child(1).unwrap();
    assert_eq!(alias.kind(), NodeKind::TypeAliasDeclaration);
    let record = alias
        .child_by_field("typeExpression")
        .unwrap()
        .first_child()
        .unwrap();
    assert_eq!(record.kind(), NodeKind::RecordType);
    assert_eq!(record.children_by_field("fieldType").count(), 2);

    let annotation = root.child(2).unwrap();
    assert_eq!(annotation.kind(), NodeKind::TypeAnnotation);
    let segments = annotation.child_by_field("typeExpression").unwrap();
    assert_eq!(segments.child_count(), 3);
    let first = segments.first_child().unwrap();
    assert_eq!(first.kind(), NodeKind::TypeExpression);
    assert_eq!(first.text(), "(a -> b)");
    assert_eq!(tree.errors().count(), 0);
}

#[test]
fn test_patterns() {
    let tree = parse_str(
        "f ((a, b) as pair) [x] { y } =\n    case pair of\n        h :: t ->\n            h\n        _ ->\n            -1\n",
    );
    let left = tree
        .root()
        .first_child()
        .unwrap()
        .child_by_field("functionDeclarationLeft")
        .unwrap();
    let params: Vec<_> = left.children_by_field("param").collect();
    assert_eq!(
        kinds(params.iter().copied()),
        vec![
            NodeKind::Pattern,
            NodeKind::ListPattern,
            NodeKind::RecordPattern
        ]
    );
    let as_pattern = params[0].first_child().unwrap();
    assert_eq!(as_pattern.kind(), NodeKind::Pattern);
    assert_eq!(as_pattern.child_by_field("patternAs").unwrap().text(), "pair");

    let case = tree
        .root()
        .first_child()
        .unwrap()
        .child_by_field("body")
        .unwrap();
    let first_branch = case.child_by_field("branch").unwrap();
    let cons = first_branch
        .child_by_field("pattern")
        .unwrap()
        .first_child()
        .unwrap();
    assert_eq!(cons.kind(), NodeKind::ConsPattern);
    assert_eq!(tree.errors().count(), 0);
}

#[test]
fn test_error_recovery_keeps_later_declarations() {
    let tree = parse_str("a = )\nb = 1\n");
    let root = tree.root();
    let decls = root
        .children()
        .filter(|n| n.is(NodeKind::ValueDeclaration))
        .count();
    assert_eq!(decls, 2);
    assert!(tree.errors().count() >= 1);
    assert!(root.has_error());
}

#[test]
fn test_node_at_offset() {
    let source = "x = foo bar\n";
    let tree = parse_str(source);
    let node = tree.node_at(source.find("bar").unwrap());
    assert_eq!(node.kind(), NodeKind::LowerCaseIdentifier);
    assert_eq!(node.text(), "bar");
    assert!(node
        .ancestors()
        .any(|a| a.is(NodeKind::FunctionCallExpr)));
}
