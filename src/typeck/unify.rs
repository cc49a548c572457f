//! Unification over the type lattice
//!
//! `unify(expected, actual)` extends the substitution so both sides denote
//! the same type, or reports why they cannot. A failed unification may
//! leave bindings made along the way; callers treat the whole expression
//! as `Unknown` afterwards.

use crate::types::{
    class_constraint, curry, replace, rigid_satisfies, unify_classes, ClassConstraint,
    DisjointSet, FieldReferences, TVar, Type,
};
use indexmap::IndexMap;

/// Field-level difference between two records that failed to unify
#[derive(Debug, Clone, Default)]
pub struct RecordDiff {
    /// Fields the actual record has but the expected one does not
    pub extra: Vec<String>,
    /// Fields the expected record has but the actual one does not
    pub missing: Vec<String>,
    /// `(field, expected, actual)`
    pub mismatched: Vec<(String, Type, Type)>,
}

impl RecordDiff {
    pub fn is_empty(&self) -> bool {
        self.extra.is_empty() && self.missing.is_empty() && self.mismatched.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum UnifyError {
    Mismatch,
    /// Binding the variable would make the type contain itself
    Infinite(TVar),
    Record(RecordDiff),
}

pub fn unify(set: &mut DisjointSet, expected: &Type, actual: &Type) -> Result<(), UnifyError> {
    Unifier { set }.unify(expected, actual)
}

struct Unifier<'s> {
    set: &'s mut DisjointSet,
}

/// A record seen with its row resolved as far as the substitution allows
struct Row {
    fields: IndexMap<String, Type>,
    base: Option<TVar>,
    refs: FieldReferences,
}

impl Unifier<'_> {
    fn unify(&mut self, expected: &Type, actual: &Type) -> Result<(), UnifyError> {
        let a = self.set.get(expected);
        let b = self.set.get(actual);

        match (&a, &b) {
            (Type::Unknown, _)
            | (_, Type::Unknown)
            | (Type::InProgressBinding, _)
            | (_, Type::InProgressBinding) => Ok(()),
            (Type::Var(x), Type::Var(y)) => self.unify_vars(x, y),
            (Type::Var(x), other) | (other, Type::Var(x)) => self.bind_var(x, other),
            (Type::Function(f), Type::Function(g)) => {
                let n = f.params.len().min(g.params.len());
                for (p, q) in f.params.iter().zip(&g.params) {
                    self.unify(p, q)?;
                }
                let left = curry(f.params[n..].to_vec(), f.ret.clone());
                let right = curry(g.params[n..].to_vec(), g.ret.clone());
                self.unify(&left, &right)
            }
            (Type::Tuple(s), Type::Tuple(t)) if s.types.len() == t.types.len() => {
                for (p, q) in s.types.iter().zip(&t.types) {
                    self.unify(p, q)?;
                }
                Ok(())
            }
            (Type::Union(u), Type::Union(v))
                if u.module == v.module && u.name == v.name && u.params.len() == v.params.len() =>
            {
                for (p, q) in u.params.iter().zip(&v.params) {
                    self.unify(p, q)?;
                }
                Ok(())
            }
            (Type::Unit, Type::Unit) => Ok(()),
            (
                Type::Record(_) | Type::MutableRecord(_),
                Type::Record(_) | Type::MutableRecord(_),
            ) => self.unify_records(&a, &b),
            _ => Err(UnifyError::Mismatch),
        }
    }

    fn unify_vars(&mut self, x: &TVar, y: &TVar) -> Result<(), UnifyError> {
        if x == y {
            return Ok(());
        }
        match (x.is_rigid(), y.is_rigid()) {
            (false, false) => match (x.class(), y.class()) {
                (None, _) => self.link(x, y),
                (_, None) => self.link(y, x),
                (Some(cx), Some(cy)) => match unify_classes(cx, cy) {
                    None => Err(UnifyError::Mismatch),
                    Some(c) if c == cy => self.link(x, y),
                    Some(c) if c == cx => self.link(y, x),
                    Some(c) => {
                        let narrowed = TVar::fresh(Some(c));
                        self.link(x, &narrowed)?;
                        self.link(y, &narrowed)
                    }
                },
            },
            (true, false) => self.flexible_to_rigid(y, x),
            (false, true) => self.flexible_to_rigid(x, y),
            (true, true) => Err(UnifyError::Mismatch),
        }
    }

    fn link(&mut self, from: &TVar, to: &TVar) -> Result<(), UnifyError> {
        self.set.union(from, Type::Var(to.clone()));
        Ok(())
    }

    fn flexible_to_rigid(&mut self, flexible: &TVar, rigid: &TVar) -> Result<(), UnifyError> {
        match (flexible.class(), rigid.class()) {
            (None, _) => self.link(flexible, rigid),
            (Some(f), Some(r)) if rigid_satisfies(r, f) => self.link(flexible, rigid),
            _ => Err(UnifyError::Mismatch),
        }
    }

    fn bind_var(&mut self, var: &TVar, ty: &Type) -> Result<(), UnifyError> {
        if var.is_rigid() {
            return Err(UnifyError::Mismatch);
        }
        let resolved = replace(ty, self.set);
        if resolved.contains_var(var) {
            return Err(UnifyError::Infinite(var.clone()));
        }
        let components = match var.class() {
            None => Vec::new(),
            Some(class) => match class_constraint(class, &resolved) {
                ClassConstraint::Satisfied => Vec::new(),
                ClassConstraint::Unsatisfied => return Err(UnifyError::Mismatch),
                ClassConstraint::Components(parts) => parts,
            },
        };
        self.set.union(var, ty.clone());
        for (part, class) in components {
            self.unify(&Type::class_var(class), &part)?;
        }
        Ok(())
    }

    fn row(&self, ty: &Type) -> Row {
        match replace(ty, self.set) {
            Type::Record(r) => Row {
                fields: r.fields.clone(),
                base: r.base.as_ref().and_then(|b| b.as_var().cloned()),
                refs: r.field_refs.clone(),
            },
            _ => Row {
                fields: IndexMap::new(),
                base: None,
                refs: FieldReferences::new(),
            },
        }
    }

    fn unify_records(&mut self, expected: &Type, actual: &Type) -> Result<(), UnifyError> {
        let a = self.row(expected);
        let b = self.row(actual);
        let mut diff = RecordDiff::default();

        for (name, ta) in &a.fields {
            if let Some(tb) = b.fields.get(name) {
                if self.unify(ta, tb).is_err() {
                    diff.mismatched.push((
                        name.clone(),
                        replace(ta, self.set),
                        replace(tb, self.set),
                    ));
                }
            }
        }

        let only_a = subtract(&a.fields, &b.fields);
        let only_b = subtract(&b.fields, &a.fields);

        match (&a.base, &b.base) {
            (None, None) => {
                diff.missing.extend(only_a.keys().cloned());
                diff.extra.extend(only_b.keys().cloned());
            }
            (Some(row), None) => {
                diff.missing.extend(only_a.keys().cloned());
                if diff.is_empty() {
                    self.bind_var(row, &Type::record(only_b, None))?;
                }
            }
            (None, Some(row)) => {
                diff.extra.extend(only_b.keys().cloned());
                if diff.is_empty() {
                    self.bind_var(row, &Type::record(only_a, None))?;
                }
            }
            (Some(ra), Some(rb)) if ra == rb => {
                diff.missing.extend(only_a.keys().cloned());
                diff.extra.extend(only_b.keys().cloned());
            }
            (Some(ra), Some(rb)) => {
                if !diff.is_empty() {
                    return Err(UnifyError::Record(diff));
                }
                match (only_a.is_empty(), only_b.is_empty()) {
                    (true, true) => self.unify_vars(ra, rb)?,
                    (_, true) => self.bind_var(rb, &Type::record(only_a, Some(Type::Var(ra.clone()))))?,
                    (true, _) => self.bind_var(ra, &Type::record(only_b, Some(Type::Var(rb.clone()))))?,
                    _ => {
                        let rest = Type::fresh_var();
                        self.bind_var(ra, &Type::record(only_b, Some(rest.clone())))?;
                        self.bind_var(rb, &Type::record(only_a, Some(rest)))?;
                    }
                }
            }
        }

        if !diff.is_empty() {
            return Err(UnifyError::Record(diff));
        }
        FieldReferences::merge(&a.refs, &b.refs);
        Ok(())
    }
}

fn subtract(from: &IndexMap<String, Type>, other: &IndexMap<String, Type>) -> IndexMap<String, Type> {
    from.iter()
        .filter(|(k, _)| !other.contains_key(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{type_to_string, TypeClass};

    fn fields(entries: &[(&str, Type)]) -> IndexMap<String, Type> {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn show(set: &DisjointSet, ty: &Type) -> String {
        type_to_string(&replace(ty, set), None)
    }

    #[test]
    fn test_var_binding_is_shared() {
        let mut set = DisjointSet::new();
        let a = Type::fresh_var();
        unify(&mut set, &a, &Type::int()).unwrap();
        assert_eq!(show(&set, &Type::list(a)), "List Int");
    }

    #[test]
    fn test_rigid_vars_only_match_themselves() {
        let mut set = DisjointSet::new();
        let a = Type::Var(TVar::named("a", true));
        let b = Type::Var(TVar::named("b", true));
        assert!(unify(&mut set, &a, &a.clone()).is_ok());
        assert!(unify(&mut set, &a, &b).is_err());
        assert!(unify(&mut set, &a, &Type::int()).is_err());
        let flexible = Type::fresh_var();
        assert!(unify(&mut set, &flexible, &a).is_ok());
        assert_eq!(show(&set, &flexible), "a");
    }

    #[test]
    fn test_class_vars() {
        let mut set = DisjointSet::new();
        let n = Type::class_var(TypeClass::Number);
        assert!(unify(&mut set, &n, &Type::string()).is_err());
        assert!(unify(&mut set, &n, &Type::float()).is_ok());

        let c = Type::class_var(TypeClass::Comparable);
        let ap = Type::class_var(TypeClass::Appendable);
        unify(&mut set, &c, &ap).unwrap();
        assert_eq!(show(&set, &c), "compappend");

        let rigid_number = Type::Var(TVar::named("number", true));
        let comparable = Type::class_var(TypeClass::Comparable);
        assert!(unify(&mut set, &comparable, &rigid_number).is_ok());
        let rigid_comparable = Type::Var(TVar::named("comparable", true));
        let number = Type::class_var(TypeClass::Number);
        assert!(unify(&mut set, &number, &rigid_comparable).is_err());
    }

    #[test]
    fn test_comparable_list_constrains_elements() {
        let mut set = DisjointSet::new();
        let element = Type::fresh_var();
        let c = Type::class_var(TypeClass::Comparable);
        unify(&mut set, &c, &Type::list(element.clone())).unwrap();
        assert_eq!(show(&set, &element), "comparable");
        assert!(unify(&mut set, &element, &Type::function(vec![Type::int()], Type::int())).is_err());
    }

    #[test]
    fn test_occurs_check() {
        let mut set = DisjointSet::new();
        let a = Type::fresh_var();
        let err = unify(&mut set, &a, &Type::list(a.clone())).unwrap_err();
        assert!(matches!(err, UnifyError::Infinite(_)));
    }

    #[test]
    fn test_curried_functions_line_up() {
        let mut set = DisjointSet::new();
        let r = Type::fresh_var();
        let flat = Type::function(vec![Type::int(), Type::string()], Type::bool());
        let partial = Type::function(vec![Type::int()], r.clone());
        unify(&mut set, &flat, &partial).unwrap();
        assert_eq!(show(&set, &r), "String -> Bool");
    }

    #[test]
    fn test_open_record_against_closed() {
        let mut set = DisjointSet::new();
        let row = Type::fresh_var();
        let open = Type::record(fields(&[("x", Type::fresh_var())]), Some(row.clone()));
        let closed = Type::record(fields(&[("x", Type::int()), ("y", Type::int())]), None);
        unify(&mut set, &open, &closed).unwrap();
        assert_eq!(show(&set, &open), "{ x : Int, y : Int }");
    }

    #[test]
    fn test_closed_records_report_diff() {
        let mut set = DisjointSet::new();
        let expected = Type::record(fields(&[("x", Type::int()), ("y", Type::int())]), None);
        let actual = Type::record(fields(&[("x", Type::string()), ("z", Type::int())]), None);
        match unify(&mut set, &expected, &actual) {
            Err(UnifyError::Record(diff)) => {
                assert_eq!(diff.missing, vec!["y".to_string()]);
                assert_eq!(diff.extra, vec!["z".to_string()]);
                assert_eq!(diff.mismatched.len(), 1);
                assert_eq!(diff.mismatched[0].0, "x");
            }
            other => panic!("expected a record diff, got {:?}", other),
        }
    }

    #[test]
    fn test_two_open_records_share_a_row() {
        let mut set = DisjointSet::new();
        let a = Type::record(fields(&[("x", Type::int())]), Some(Type::fresh_var()));
        let b = Type::record(fields(&[("y", Type::int())]), Some(Type::fresh_var()));
        unify(&mut set, &a, &b).unwrap();
        let a = show(&set, &a);
        assert!(a.contains("x : Int") && a.contains("y : Int"), "{}", a);
        assert!(a.starts_with("{ a | "), "{}", a);
    }

    #[test]
    fn test_record_field_references_merge() {
        use crate::syntax::{FileId, NodeId, NodeRef};
        let mut set = DisjointSet::new();
        let a = Type::record(fields(&[("x", Type::int())]), None);
        let b = Type::record(fields(&[("x", Type::int())]), None);
        let site = NodeRef::new(FileId(0), NodeId(7));
        if let Type::Record(r) = &b {
            r.field_refs.add("x", site);
        }
        unify(&mut set, &a, &b).unwrap();
        if let Type::Record(r) = &a {
            assert_eq!(r.field_refs.get("x"), vec![site]);
        }
    }
}
