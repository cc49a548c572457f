//! Built-in type classes and their narrowing rules
//!
//! ```text
//!               number  comparable  appendable  compappend
//! number        number  number      -           -
//! comparable    number  comparable  compappend  compappend
//! appendable    -       compappend  appendable  compappend
//! compappend    -       compappend  compappend  compappend
//! ```

use super::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Number,
    Comparable,
    Appendable,
    CompAppend,
}

impl TypeClass {
    pub const ALL: [TypeClass; 4] = [
        TypeClass::Number,
        TypeClass::Comparable,
        TypeClass::Appendable,
        TypeClass::CompAppend,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TypeClass::Number => "number",
            TypeClass::Comparable => "comparable",
            TypeClass::Appendable => "appendable",
            TypeClass::CompAppend => "compappend",
        }
    }

    /// Class of a type variable, decided by its name prefix
    pub fn from_name(name: &str) -> Option<TypeClass> {
        TypeClass::ALL
            .into_iter()
            .find(|class| name.starts_with(class.name()))
    }
}

/// The class a variable must belong to after unifying variables of classes
/// `a` and `b`, or `None` when no type is in both
pub fn unify_classes(a: TypeClass, b: TypeClass) -> Option<TypeClass> {
    use TypeClass::*;
    match (a, b) {
        _ if a == b => Some(a),
        (Number, Comparable) | (Comparable, Number) => Some(Number),
        (Comparable, Appendable) | (Appendable, Comparable) => Some(CompAppend),
        (Comparable, CompAppend) | (CompAppend, Comparable) => Some(CompAppend),
        (Appendable, CompAppend) | (CompAppend, Appendable) => Some(CompAppend),
        _ => None,
    }
}

/// Whether a rigid variable of class `rigid` can stand where a flexible
/// variable of class `flexible` is expected: only if the rigid class is at
/// least as narrow
pub fn rigid_satisfies(rigid: TypeClass, flexible: TypeClass) -> bool {
    unify_classes(rigid, flexible) == Some(rigid)
}

/// What a concrete type needs to belong to a class
#[derive(Debug, Clone)]
pub enum ClassConstraint {
    Satisfied,
    Unsatisfied,
    /// Member if each component type is in the paired class
    Components(Vec<(Type, TypeClass)>),
}

pub fn class_constraint(class: TypeClass, ty: &Type) -> ClassConstraint {
    let is = |module: &str, name: &str| ty.is_union_named(module, name);
    let number = is("Basics", "Int") || is("Basics", "Float");
    let string = is("String", "String");

    match class {
        TypeClass::Number if number => ClassConstraint::Satisfied,
        TypeClass::Comparable if number || string || is("Char", "Char") => {
            ClassConstraint::Satisfied
        }
        TypeClass::Appendable if string || is("List", "List") => ClassConstraint::Satisfied,
        TypeClass::CompAppend if string => ClassConstraint::Satisfied,
        TypeClass::Comparable | TypeClass::CompAppend => match ty {
            Type::Union(u) if u.module == "List" && u.name == "List" => {
                ClassConstraint::Components(
                    u.params
                        .iter()
                        .map(|p| (p.clone(), TypeClass::Comparable))
                        .collect(),
                )
            }
            Type::Tuple(t) if class == TypeClass::Comparable && t.types.len() <= 3 => {
                ClassConstraint::Components(
                    t.types
                        .iter()
                        .map(|p| (p.clone(), TypeClass::Comparable))
                        .collect(),
                )
            }
            Type::Unknown => ClassConstraint::Satisfied,
            _ => ClassConstraint::Unsatisfied,
        },
        _ if ty.is_unknown() => ClassConstraint::Satisfied,
        _ => ClassConstraint::Unsatisfied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use super::TypeClass::*;

    fn class() -> impl Strategy<Value = TypeClass> {
        prop::sample::select(TypeClass::ALL.to_vec())
    }

    #[test]
    fn test_truth_table() {
        let table = [
            (Number, Number, Some(Number)),
            (Number, Comparable, Some(Number)),
            (Number, Appendable, None),
            (Number, CompAppend, None),
            (Comparable, Comparable, Some(Comparable)),
            (Comparable, Appendable, Some(CompAppend)),
            (Comparable, CompAppend, Some(CompAppend)),
            (Appendable, Appendable, Some(Appendable)),
            (Appendable, CompAppend, Some(CompAppend)),
            (CompAppend, CompAppend, Some(CompAppend)),
        ];
        for (a, b, expected) in table {
            assert_eq!(unify_classes(a, b), expected, "{:?} + {:?}", a, b);
            assert_eq!(unify_classes(b, a), expected, "{:?} + {:?}", b, a);
        }
    }

    #[test]
    fn test_rigid_rules() {
        assert!(rigid_satisfies(Number, Comparable));
        assert!(!rigid_satisfies(Comparable, Number));
        assert!(rigid_satisfies(CompAppend, Appendable));
        assert!(rigid_satisfies(CompAppend, Comparable));
        assert!(!rigid_satisfies(Appendable, CompAppend));
        assert!(!rigid_satisfies(Number, Appendable));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(TypeClass::from_name("number"), Some(Number));
        assert_eq!(TypeClass::from_name("comparable2"), Some(Comparable));
        assert_eq!(TypeClass::from_name("compappend"), Some(CompAppend));
        assert_eq!(TypeClass::from_name("appendableList"), Some(Appendable));
        assert_eq!(TypeClass::from_name("a"), None);
        assert_eq!(TypeClass::from_name("num"), None);
    }

    #[test]
    fn test_concrete_membership() {
        assert!(matches!(
            class_constraint(Number, &Type::float()),
            ClassConstraint::Satisfied
        ));
        assert!(matches!(
            class_constraint(Number, &Type::string()),
            ClassConstraint::Unsatisfied
        ));
        assert!(matches!(
            class_constraint(Appendable, &Type::list(Type::bool())),
            ClassConstraint::Satisfied
        ));
        match class_constraint(CompAppend, &Type::list(Type::int())) {
            ClassConstraint::Components(parts) => {
                assert_eq!(parts.len(), 1);
                assert_eq!(parts[0].1, Comparable);
            }
            other => panic!("expected components, got {:?}", other),
        }
        assert!(matches!(
            class_constraint(Comparable, &Type::bool()),
            ClassConstraint::Unsatisfied
        ));
    }

    proptest! {
        #[test]
        fn unify_is_symmetric(a in class(), b in class()) {
            prop_assert_eq!(unify_classes(a, b), unify_classes(b, a));
        }

        #[test]
        fn unify_is_idempotent(a in class()) {
            prop_assert_eq!(unify_classes(a, a), Some(a));
        }

        #[test]
        fn narrowed_class_is_compatible_with_both(a in class(), b in class()) {
            if let Some(c) = unify_classes(a, b) {
                prop_assert_eq!(unify_classes(c, a), Some(c));
                prop_assert_eq!(unify_classes(c, b), Some(c));
            }
        }

        #[test]
        fn unify_is_associative(a in class(), b in class(), c in class()) {
            let left = unify_classes(a, b).and_then(|ab| unify_classes(ab, c));
            let right = unify_classes(b, c).and_then(|bc| unify_classes(a, bc));
            prop_assert_eq!(left, right);
        }
    }
}
