use super::*;
use crate::diagnostics::error_codes::{binding, resolution};
use crate::syntax::{parse, FileId};
use pretty_assertions::assert_eq;

fn bind_str(source: &str) -> (SyntaxTree, BindResult) {
    let tree = parse(FileId(0), "file:///Test.elm", source);
    let result = bind(&tree, None);
    (tree, result)
}

fn codes(result: &BindResult) -> Vec<&str> {
    result.diagnostics().iter().map(|d| d.code.as_str()).collect()
}

#[test]
fn test_top_level_symbols() {
    let (_, result) = bind_str(
        "module Shapes exposing (..)\n\ntype Shape\n    = Circle Float\n    | Square Float\n\ntype alias Point = { x : Float, y : Float }\n\narea : Shape -> Float\narea shape = 0\n",
    );
    let table = result.root_table();
    assert_eq!(table.get("Shape")[0].kind, SymbolKind::Type);
    assert_eq!(table.get("Circle")[0].kind, SymbolKind::UnionConstructor);
    assert_eq!(table.get("Point")[0].kind, SymbolKind::TypeAlias);
    assert_eq!(table.get("area")[0].kind, SymbolKind::Function);
    assert!(result.non_shadowable_names().contains("area"));
    assert_eq!(result.module_name(), "Shapes");
    assert!(result.diagnostics().is_empty());
}

#[test]
fn test_parameters_bound_in_declaration_container() {
    let (tree, result) = bind_str("f a (b, c) =\n    a\n");
    let decl = tree.root().first_child().unwrap();
    let table = result.table(decl.id()).unwrap();
    let names: Vec<_> = table.names().collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(table
        .symbols()
        .all(|s| s.kind == SymbolKind::FunctionParameter));

    let body = decl.child_by_field("body").unwrap();
    let found = result.lookup(body.id(), "a", |s| s.kind.is_value()).unwrap();
    assert_eq!(found.kind, SymbolKind::FunctionParameter);
}

#[test]
fn test_let_lambda_and_case_containers() {
    let source = "f x =\n    let\n        g = \\y -> y\n    in\n    case x of\n        Just z ->\n            g z\n\n        Nothing ->\n            0\n";
    let (tree, result) = bind_str(source);
    // file, f, let, g, lambda, two branches
    assert_eq!(result.container_count(), 7);

    let z_use = tree.node_at(source.rfind("z").unwrap());
    let z = result.lookup(z_use.id(), "z", |s| s.kind.is_value()).unwrap();
    assert_eq!(z.kind, SymbolKind::CasePattern);
    let g = result.lookup(z_use.id(), "g", |s| s.kind.is_value()).unwrap();
    assert_eq!(g.kind, SymbolKind::Function);

    let y_use = tree.node_at(source.find("-> y").unwrap() + 3);
    let y = result.lookup(y_use.id(), "y", |s| s.kind.is_value()).unwrap();
    assert_eq!(y.kind, SymbolKind::AnonymousFunctionParameter);
    assert!(result.lookup(tree.root().id(), "y", |_| true).is_none());
}

#[test]
fn test_type_variables_scoped_to_declaration() {
    let (tree, result) = bind_str("type Box a = Box a\n");
    let decl = tree.root().first_child().unwrap();
    let table = result.table(decl.id()).unwrap();
    assert_eq!(table.get("a")[0].kind, SymbolKind::TypeVariable);
    assert!(result.root_table().get("a").is_empty());
}

#[test]
fn test_exposing_list() {
    let (_, result) = bind_str(
        "module M exposing (Color(..), Point, view, missing)\n\ntype Color = Red | Green\n\ntype alias Point = { x : Int }\n\nview = 1\n\nhidden = 2\n",
    );
    let exposing = result.exposing();
    let color = &exposing.get("Color")[0];
    let ctors: Vec<_> = color.constructors.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(ctors, vec!["Red", "Green"]);
    assert!(exposing.contains("Point"));
    assert!(exposing.contains("view"));
    assert!(!exposing.contains("hidden"));
    assert_eq!(codes(&result), vec![binding::EXPORT_NOT_FOUND]);
}

#[test]
fn test_exposing_open_alias_is_error() {
    let (_, result) = bind_str("module M exposing (Point(..))\n\ntype alias Point = { x : Int }\n");
    assert_eq!(codes(&result), vec![binding::EXPORT_OPEN_ALIAS]);
    assert!(result.exposing().contains("Point"));
}

#[test]
fn test_wildcard_exposes_everything_top_level() {
    let (_, result) = bind_str("module M exposing (..)\n\nimport Other\n\ntype T = A | B\n\nv = 1\n");
    let exposing = result.exposing();
    assert!(exposing.contains("T"));
    assert_eq!(exposing.get("T")[0].constructors.len(), 2);
    assert!(exposing.contains("v"));
    assert!(!exposing.contains("Other"));
}

#[test]
fn test_imports_bind_local_name() {
    let (_, result) = bind_str("module M exposing (..)\n\nimport Html\nimport Platform.Cmd as Cmd\n");
    let table = result.root_table();
    assert_eq!(table.get("Html")[0].kind, SymbolKind::Import);
    assert_eq!(table.get("Cmd")[0].kind, SymbolKind::Import);
    assert!(!table.contains("Platform.Cmd"));
}

#[test]
fn test_virtual_imports_bound_before_real_ones() {
    let virtual_tree = parse(
        FileId::VIRTUAL_IMPORTS,
        "elmcheck:virtual",
        "import Basics exposing (..)\nimport Maybe exposing (Maybe(..))\n",
    );
    let tree = parse(FileId(0), "file:///M.elm", "module Maybe exposing (..)\n\nx = 1\n");
    let result = bind(&tree, Some(&virtual_tree));
    let table = result.root_table();
    let basics = &table.get("Basics")[0];
    assert_eq!(basics.node.file, FileId::VIRTUAL_IMPORTS);
    // a module never imports itself
    assert!(!table.contains("Maybe"));
}

#[test]
fn test_redefinition() {
    let (_, result) = bind_str("x = 1\n\nx = 2\n");
    assert_eq!(codes(&result), vec![binding::REDEFINITION]);
}

#[test]
fn test_type_and_constructor_share_name() {
    let (_, result) = bind_str("type Id = Id Int\n");
    assert!(result.diagnostics().is_empty());
}

#[test]
fn test_shadowing_top_level_name() {
    let (_, result) = bind_str("x = 1\n\nf x = x\n");
    assert_eq!(codes(&result), vec![binding::SHADOWING]);
}

#[test]
fn test_shadowing_enclosing_parameter() {
    let (_, result) = bind_str("f a =\n    \\a -> a\n");
    assert_eq!(codes(&result), vec![binding::SHADOWING]);
}

#[test]
fn test_shadowing_import_is_allowed() {
    let (_, result) = bind_str("import Html\n\nf text = text\n");
    assert!(result.diagnostics().is_empty());
}

#[test]
fn test_port_outside_port_module() {
    let (_, result) = bind_str("module M exposing (..)\n\nport send : String -> Cmd msg\n");
    assert_eq!(codes(&result), vec![resolution::PORT_IN_NON_PORT_MODULE]);
    let (_, result) = bind_str("port module M exposing (..)\n\nport send : String -> Cmd msg\n");
    assert!(result.diagnostics().is_empty());
    assert_eq!(result.exposing().get("send")[0].kind, SymbolKind::Port);
}

#[test]
fn test_parse_errors_reported_and_binding_continues() {
    let (_, result) = bind_str("a = )\n\nb = 1\n");
    assert!(codes(&result).contains(&crate::diagnostics::error_codes::syntax::PARSE_ERROR));
    assert!(result.root_table().contains("b"));
}

#[test]
fn test_binding_is_deterministic() {
    let source = "module M exposing (f)\n\nf a =\n    let\n        b = a\n    in\n    b\n";
    let (tree, first) = bind_str(source);
    let second = bind(&tree, None);
    let names = |r: &BindResult| {
        r.root_table()
            .symbols()
            .map(|s| (s.name.clone(), s.node, s.kind))
            .collect::<Vec<_>>()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(first.container_count(), second.container_count());
}
