//! Applying substitutions, freezing and instantiating types

use super::{
    Alias, DisjointSet, FieldReferences, FunctionType, RecordType, TVar, TupleType, Type,
    UnionType,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

/// Apply the substitution in `set` to `ty`. Subtrees without a bound
/// variable are shared rather than rebuilt. In-progress records come out as
/// snapshots.
pub fn replace(ty: &Type, set: &DisjointSet) -> Type {
    if !would_change(ty, set) {
        return ty.clone();
    }
    match ty {
        Type::Var(_) => {
            let resolved = set.get(ty);
            match &resolved {
                Type::Var(_) => resolved,
                _ => replace(&resolved, set),
            }
        }
        Type::Function(f) => Type::Function(Rc::new(FunctionType {
            params: f.params.iter().map(|p| replace(p, set)).collect(),
            ret: replace(&f.ret, set),
            alias: replace_alias(&f.alias, set),
        })),
        Type::Tuple(t) => Type::Tuple(Rc::new(TupleType {
            types: t.types.iter().map(|t| replace(t, set)).collect(),
            alias: replace_alias(&t.alias, set),
        })),
        Type::Union(u) => Type::Union(Rc::new(UnionType {
            module: u.module.clone(),
            name: u.name.clone(),
            params: u.params.iter().map(|p| replace(p, set)).collect(),
            alias: replace_alias(&u.alias, set),
        })),
        Type::Record(r) => {
            let fields = r
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), replace(v, set)))
                .collect();
            build_record(
                fields,
                r.base.as_ref(),
                r.field_refs.clone(),
                replace_alias(&r.alias, set),
                set,
            )
        }
        Type::MutableRecord(r) => {
            let r = r.borrow();
            let fields = r
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), replace(v, set)))
                .collect();
            build_record(fields, Some(&r.base), r.field_refs.clone(), None, set)
        }
        Type::Unit | Type::Unknown | Type::InProgressBinding => ty.clone(),
    }
}

fn would_change(ty: &Type, set: &DisjointSet) -> bool {
    match ty {
        Type::Var(v) => set.contains(v),
        Type::Function(f) => {
            f.params.iter().any(|p| would_change(p, set))
                || would_change(&f.ret, set)
                || alias_would_change(&f.alias, set)
        }
        Type::Tuple(t) => {
            t.types.iter().any(|t| would_change(t, set)) || alias_would_change(&t.alias, set)
        }
        Type::Union(u) => {
            u.params.iter().any(|p| would_change(p, set)) || alias_would_change(&u.alias, set)
        }
        Type::Record(r) => {
            r.fields.values().any(|t| would_change(t, set))
                || r.base.as_ref().map(|b| would_change(b, set)).unwrap_or(false)
                || alias_would_change(&r.alias, set)
        }
        Type::MutableRecord(_) => true,
        Type::Unit | Type::Unknown | Type::InProgressBinding => false,
    }
}

fn alias_would_change(alias: &Option<Rc<Alias>>, set: &DisjointSet) -> bool {
    alias
        .as_ref()
        .map(|a| a.parameters.iter().any(|p| would_change(p, set)))
        .unwrap_or(false)
}

fn replace_alias(alias: &Option<Rc<Alias>>, set: &DisjointSet) -> Option<Rc<Alias>> {
    let alias = alias.as_ref()?;
    if !alias.parameters.iter().any(|p| would_change(p, set)) {
        return Some(Rc::clone(alias));
    }
    Some(Rc::new(Alias {
        module: alias.module.clone(),
        name: alias.name.clone(),
        parameters: alias.parameters.iter().map(|p| replace(p, set)).collect(),
    }))
}

/// Close over the resolved row: a base bound to another record contributes
/// its fields, and the result keeps that record's own base
fn build_record(
    fields: IndexMap<String, Type>,
    base: Option<&Type>,
    field_refs: FieldReferences,
    alias: Option<Rc<Alias>>,
    set: &DisjointSet,
) -> Type {
    let record = |fields: IndexMap<String, Type>, base: Option<Type>| {
        Type::Record(Rc::new(RecordType {
            fields,
            base,
            field_refs: field_refs.clone(),
            alias: alias.clone(),
        }))
    };
    let Some(base) = base else {
        return record(fields, None);
    };
    match replace(base, set) {
        Type::Var(v) => record(fields, Some(Type::Var(v))),
        Type::Record(inner) => {
            let mut merged = fields;
            for (name, ty) in &inner.fields {
                if !merged.contains_key(name) {
                    merged.insert(name.clone(), ty.clone());
                }
            }
            record(merged, inner.base.clone())
        }
        _ => record(fields, None),
    }
}

/// Publish a type: in-progress records become records and every field
/// reference table stops accepting additions
pub fn freeze(ty: &Type) -> Type {
    match ty {
        Type::Var(_) | Type::Unit | Type::Unknown | Type::InProgressBinding => ty.clone(),
        Type::Function(f) => Type::Function(Rc::new(FunctionType {
            params: f.params.iter().map(freeze).collect(),
            ret: freeze(&f.ret),
            alias: f.alias.clone(),
        })),
        Type::Tuple(t) => Type::Tuple(Rc::new(TupleType {
            types: t.types.iter().map(freeze).collect(),
            alias: t.alias.clone(),
        })),
        Type::Union(u) => {
            if u.params.is_empty() {
                return ty.clone();
            }
            Type::Union(Rc::new(UnionType {
                module: u.module.clone(),
                name: u.name.clone(),
                params: u.params.iter().map(freeze).collect(),
                alias: u.alias.clone(),
            }))
        }
        Type::Record(r) => {
            r.field_refs.freeze();
            Type::Record(Rc::new(RecordType {
                fields: r
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), freeze(v)))
                    .collect(),
                base: r.base.as_ref().map(freeze),
                field_refs: r.field_refs.clone(),
                alias: r.alias.clone(),
            }))
        }
        Type::MutableRecord(r) => {
            let r = r.borrow();
            r.field_refs.freeze();
            Type::Record(Rc::new(RecordType {
                fields: r
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), freeze(v)))
                    .collect(),
                base: Some(freeze(&r.base)),
                field_refs: r.field_refs.clone(),
                alias: None,
            }))
        }
    }
}

/// Rebuild `ty`, substituting variables for which `f` returns a type
pub fn map_vars(ty: &Type, f: &mut impl FnMut(&TVar) -> Option<Type>) -> Type {
    match ty {
        Type::Var(v) => f(v).unwrap_or_else(|| ty.clone()),
        Type::Function(func) => Type::Function(Rc::new(FunctionType {
            params: func.params.iter().map(|p| map_vars(p, f)).collect(),
            ret: map_vars(&func.ret, f),
            alias: map_alias(&func.alias, f),
        })),
        Type::Tuple(t) => Type::Tuple(Rc::new(TupleType {
            types: t.types.iter().map(|t| map_vars(t, f)).collect(),
            alias: map_alias(&t.alias, f),
        })),
        Type::Union(u) => {
            if u.params.is_empty() {
                return ty.clone();
            }
            Type::Union(Rc::new(UnionType {
                module: u.module.clone(),
                name: u.name.clone(),
                params: u.params.iter().map(|p| map_vars(p, f)).collect(),
                alias: map_alias(&u.alias, f),
            }))
        }
        Type::Record(r) => Type::Record(Rc::new(RecordType {
            fields: r
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), map_vars(v, f)))
                .collect(),
            base: r.base.as_ref().map(|b| map_vars(b, f)),
            field_refs: r.field_refs.clone(),
            alias: map_alias(&r.alias, f),
        })),
        Type::MutableRecord(r) => {
            let r = r.borrow();
            Type::Record(Rc::new(RecordType {
                fields: r
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), map_vars(v, f)))
                    .collect(),
                base: Some(map_vars(&r.base, f)),
                field_refs: r.field_refs.clone(),
                alias: None,
            }))
        }
        Type::Unit | Type::Unknown | Type::InProgressBinding => ty.clone(),
    }
}

fn map_alias(
    alias: &Option<Rc<Alias>>,
    f: &mut impl FnMut(&TVar) -> Option<Type>,
) -> Option<Rc<Alias>> {
    let alias = alias.as_ref()?;
    Some(Rc::new(Alias {
        module: alias.module.clone(),
        name: alias.name.clone(),
        parameters: alias.parameters.iter().map(|p| map_vars(p, f)).collect(),
    }))
}

/// Copy of `ty` with every flexible variable replaced by a fresh one, so
/// two uses of a cached type never share variables. Rigid variables stay.
pub fn freshen(ty: &Type) -> Type {
    let mut fresh: HashMap<TVar, Type> = HashMap::new();
    map_vars(ty, &mut |v| {
        if v.is_rigid() {
            return None;
        }
        Some(
            fresh
                .entry(v.clone())
                .or_insert_with(|| Type::Var(v.copy(false)))
                .clone(),
        )
    })
}

/// Freshen and flexify in one pass: every variable, rigid or not, becomes
/// a new flexible variable. Used at each reference to a declaration.
pub fn instantiate(ty: &Type) -> Type {
    let mut fresh: HashMap<TVar, Type> = HashMap::new();
    map_vars(ty, &mut |v| {
        Some(
            fresh
                .entry(v.clone())
                .or_insert_with(|| Type::Var(v.copy(false)))
                .clone(),
        )
    })
}
