use super::*;
use pretty_assertions::assert_eq;

fn fields(entries: &[(&str, Type)]) -> IndexMap<String, Type> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn render(ty: &Type) -> String {
    type_to_string(ty, None)
}

#[test]
fn test_render_functions_and_unions() {
    let a = Type::Var(TVar::named("a", true));
    let b = Type::Var(TVar::named("b", true));
    let map = Type::function(
        vec![
            Type::function(vec![a.clone()], b.clone()),
            Type::list(a.clone()),
        ],
        Type::list(b.clone()),
    );
    assert_eq!(render(&map), "(a -> b) -> List a -> List b");

    let nested = Type::union(
        "Maybe",
        "Maybe",
        vec![Type::union("Maybe", "Maybe", vec![Type::int()])],
    );
    assert_eq!(render(&nested), "Maybe (Maybe Int)");
    assert_eq!(render(&Type::tuple(vec![Type::int(), Type::string()])), "( Int, String )");
    assert_eq!(render(&Type::Unit), "()");
    assert_eq!(render(&Type::Unknown), "unknown");
}

#[test]
fn test_render_records() {
    let closed = Type::record(fields(&[("x", Type::int()), ("y", Type::float())]), None);
    assert_eq!(render(&closed), "{ x : Int, y : Float }");

    let row = Type::Var(TVar::named("r", true));
    let open = Type::record(fields(&[("name", Type::string())]), Some(row));
    assert_eq!(render(&open), "{ r | name : String }");
    assert_eq!(render(&Type::record(IndexMap::new(), None)), "{}");
}

#[test]
fn test_generated_vars_get_letters_avoiding_source_names() {
    let source_a = Type::Var(TVar::named("a", false));
    let fresh = Type::fresh_var();
    let number = Type::class_var(TypeClass::Number);
    let ty = Type::function(vec![source_a, fresh.clone(), number], fresh);
    assert_eq!(render(&ty), "a -> b -> number -> b");
}

#[test]
fn test_render_alias_name() {
    let record = Type::record(fields(&[("x", Type::int())]), None);
    let aliased = record.with_alias(std::rc::Rc::new(Alias {
        module: "Main".to_string(),
        name: "Model".to_string(),
        parameters: Vec::new(),
    }));
    assert_eq!(render(&aliased), "Model");
}

#[test]
fn test_replace_follows_substitution() {
    let a = TVar::fresh(None);
    let b = TVar::fresh(None);
    let ty = Type::function(vec![Type::Var(a.clone())], Type::list(Type::Var(b.clone())));
    let mut set = DisjointSet::new();
    set.union(&a, Type::Var(b.clone()));
    set.union(&b, Type::int());
    assert_eq!(render(&replace(&ty, &set)), "Int -> List Int");
}

#[test]
fn test_replace_merges_bound_row() {
    let row = TVar::fresh(None);
    let open = Type::record(fields(&[("x", Type::int())]), Some(Type::Var(row.clone())));
    let mut set = DisjointSet::new();
    set.union(&row, Type::record(fields(&[("y", Type::string())]), None));
    let replaced = replace(&open, &set);
    assert_eq!(render(&replaced), "{ x : Int, y : String }");
    match replaced {
        Type::Record(r) => assert!(r.base.is_none()),
        other => panic!("expected a record, got {:?}", other),
    }
}

#[test]
fn test_replace_leaves_unaffected_types_shared() {
    let ty = Type::list(Type::int());
    let replaced = replace(&ty, &DisjointSet::new());
    match (&ty, &replaced) {
        (Type::Union(a), Type::Union(b)) => assert!(std::rc::Rc::ptr_eq(a, b)),
        _ => panic!("expected unions"),
    }
}

#[test]
fn test_freeze_publishes_mutable_record() {
    let record = Type::mutable_record(fields(&[("x", Type::int())]), Type::fresh_var());
    let refs = match &record {
        Type::MutableRecord(r) => r.borrow().field_refs.clone(),
        _ => unreachable!(),
    };
    refs.add("x", crate::syntax::NodeRef::new(crate::syntax::FileId(0), crate::syntax::NodeId(3)));
    let frozen = freeze(&record);
    assert!(matches!(frozen, Type::Record(_)));
    assert!(refs.is_frozen());
    refs.add("y", crate::syntax::NodeRef::new(crate::syntax::FileId(0), crate::syntax::NodeId(4)));
    assert!(refs.get("y").is_empty());
    assert_eq!(refs.get("x").len(), 1);
}

#[test]
fn test_field_reference_merge() {
    let a = FieldReferences::new();
    let b = FieldReferences::new();
    let n1 = crate::syntax::NodeRef::new(crate::syntax::FileId(0), crate::syntax::NodeId(1));
    let n2 = crate::syntax::NodeRef::new(crate::syntax::FileId(0), crate::syntax::NodeId(2));
    a.add("x", n1);
    b.add("x", n2);
    b.freeze();
    FieldReferences::merge(&a, &b);
    assert_eq!(a.get("x"), vec![n1, n2]);
    assert_eq!(b.get("x"), vec![n2]);
}

#[test]
fn test_instantiate_makes_fresh_flexible_vars() {
    let a = TVar::named("a", true);
    let ty = Type::function(vec![Type::Var(a.clone())], Type::Var(a.clone()));
    let inst = instantiate(&ty);
    let vars = inst.vars();
    assert_eq!(vars.len(), 1);
    assert!(vars[0] != a);
    assert!(!vars[0].is_rigid());
    assert_eq!(vars[0].name(), "a");

    let kept = freshen(&ty);
    assert!(kept.vars()[0] == a);
}

#[test]
fn test_uncurry_and_arity() {
    let ty = Type::function(
        vec![Type::int()],
        Type::function(vec![Type::string()], Type::bool()),
    );
    assert_eq!(ty.arity(), 2);
    let (params, ret) = uncurry(&ty);
    assert_eq!(params.len(), 2);
    assert!(ret.is_union_named("Basics", "Bool"));
}
