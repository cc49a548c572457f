//! Type representation
//!
//! Types are immutable, reference-counted trees. The one exception is
//! [`Type::MutableRecord`], the in-progress shape of a record that field
//! accesses keep extending during inference; [`freeze`] turns it into a
//! published [`Type::Record`].

mod disjoint_set;
mod render;
mod replace;
mod typeclass;

#[cfg(test)]
mod tests;

pub use disjoint_set::DisjointSet;
pub use render::{type_to_string, Qualifier, TypeRenderer};
pub use replace::{freeze, freshen, instantiate, map_vars, replace};
pub use typeclass::{class_constraint, rigid_satisfies, unify_classes, ClassConstraint, TypeClass};

use crate::syntax::NodeRef;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Type variable. Equality is identity.
#[derive(Clone)]
pub struct TVar(Rc<TVarData>);

#[derive(Debug)]
struct TVarData {
    name: String,
    rigid: bool,
    /// Named by the checker rather than written in source
    generated: bool,
}

impl TVar {
    /// A variable written in source, `a` or `comparable`
    pub fn named(name: impl Into<String>, rigid: bool) -> Self {
        TVar(Rc::new(TVarData {
            name: name.into(),
            rigid,
            generated: false,
        }))
    }

    /// A fresh flexible variable, optionally constrained to `class`
    pub fn fresh(class: Option<TypeClass>) -> Self {
        TVar(Rc::new(TVarData {
            name: class.map(TypeClass::name).unwrap_or("a").to_string(),
            rigid: false,
            generated: true,
        }))
    }

    /// New identity with the same name and origin
    pub fn copy(&self, rigid: bool) -> Self {
        TVar(Rc::new(TVarData {
            name: self.0.name.clone(),
            rigid,
            generated: self.0.generated,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_rigid(&self) -> bool {
        self.0.rigid
    }

    pub fn is_generated(&self) -> bool {
        self.0.generated
    }

    pub fn class(&self) -> Option<TypeClass> {
        TypeClass::from_name(&self.0.name)
    }
}

impl PartialEq for TVar {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TVar {}

impl Hash for TVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for TVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}@{:x}",
            if self.0.rigid { "'" } else { "" },
            self.0.name,
            (Rc::as_ptr(&self.0) as usize) & 0xffff
        )
    }
}

/// The alias a type was written through, e.g. `Model`
#[derive(Debug, Clone)]
pub struct Alias {
    pub module: String,
    pub name: String,
    pub parameters: Vec<Type>,
}

/// Source sites that mention each record field
#[derive(Debug, Clone, Default)]
pub struct FieldReferences(Rc<RefCell<FieldRefsData>>);

#[derive(Debug, Default)]
struct FieldRefsData {
    frozen: bool,
    refs: IndexMap<String, Vec<NodeRef>>,
}

impl FieldReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_frozen(&self) -> bool {
        self.0.borrow().frozen
    }

    pub fn freeze(&self) {
        self.0.borrow_mut().frozen = true;
    }

    /// Record that `node` refers to `field`. Frozen tables are left alone.
    pub fn add(&self, field: &str, node: NodeRef) {
        let mut data = self.0.borrow_mut();
        if data.frozen {
            return;
        }
        let sites = data.refs.entry(field.to_string()).or_default();
        if !sites.contains(&node) {
            sites.push(node);
        }
    }

    pub fn get(&self, field: &str) -> Vec<NodeRef> {
        self.0.borrow().refs.get(field).cloned().unwrap_or_default()
    }

    pub fn fields(&self) -> Vec<String> {
        self.0.borrow().refs.keys().cloned().collect()
    }

    pub fn ptr_eq(&self, other: &FieldReferences) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Share every reference of each side with the other. A frozen side
    /// only gives.
    pub fn merge(a: &FieldReferences, b: &FieldReferences) {
        if a.ptr_eq(b) {
            return;
        }
        let from_a: Vec<(String, NodeRef)> = a.entries();
        let from_b: Vec<(String, NodeRef)> = b.entries();
        for (field, node) in from_b {
            a.add(&field, node);
        }
        for (field, node) in from_a {
            b.add(&field, node);
        }
    }

    fn entries(&self) -> Vec<(String, NodeRef)> {
        self.0
            .borrow()
            .refs
            .iter()
            .flat_map(|(f, nodes)| nodes.iter().map(move |n| (f.clone(), *n)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Type,
    pub alias: Option<Rc<Alias>>,
}

#[derive(Debug, Clone)]
pub struct TupleType {
    pub types: Vec<Type>,
    pub alias: Option<Rc<Alias>>,
}

#[derive(Debug, Clone)]
pub struct UnionType {
    pub module: String,
    pub name: String,
    pub params: Vec<Type>,
    pub alias: Option<Rc<Alias>>,
}

#[derive(Debug, Clone)]
pub struct RecordType {
    pub fields: IndexMap<String, Type>,
    /// Row variable of an extensible record
    pub base: Option<Type>,
    pub field_refs: FieldReferences,
    pub alias: Option<Rc<Alias>>,
}

/// In-progress record; field access adds to it
#[derive(Debug, Clone)]
pub struct MutableRecordType {
    pub fields: IndexMap<String, Type>,
    pub base: Type,
    pub field_refs: FieldReferences,
}

/// A type
#[derive(Debug, Clone)]
pub enum Type {
    Var(TVar),
    Function(Rc<FunctionType>),
    Tuple(Rc<TupleType>),
    Union(Rc<UnionType>),
    Record(Rc<RecordType>),
    MutableRecord(Rc<RefCell<MutableRecordType>>),
    Unit,
    /// No information; never reported again once reported once
    Unknown,
    /// Placeholder while a pattern's own type is being worked out
    InProgressBinding,
}

impl Type {
    pub fn var(var: TVar) -> Type {
        Type::Var(var)
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        Type::Function(Rc::new(FunctionType {
            params,
            ret,
            alias: None,
        }))
    }

    pub fn tuple(types: Vec<Type>) -> Type {
        Type::Tuple(Rc::new(TupleType { types, alias: None }))
    }

    pub fn union(module: &str, name: &str, params: Vec<Type>) -> Type {
        Type::Union(Rc::new(UnionType {
            module: module.to_string(),
            name: name.to_string(),
            params,
            alias: None,
        }))
    }

    pub fn record(fields: IndexMap<String, Type>, base: Option<Type>) -> Type {
        Type::Record(Rc::new(RecordType {
            fields,
            base,
            field_refs: FieldReferences::new(),
            alias: None,
        }))
    }

    pub fn mutable_record(fields: IndexMap<String, Type>, base: Type) -> Type {
        Type::MutableRecord(Rc::new(RefCell::new(MutableRecordType {
            fields,
            base,
            field_refs: FieldReferences::new(),
        })))
    }

    pub fn int() -> Type {
        Type::union("Basics", "Int", Vec::new())
    }

    pub fn float() -> Type {
        Type::union("Basics", "Float", Vec::new())
    }

    pub fn bool() -> Type {
        Type::union("Basics", "Bool", Vec::new())
    }

    pub fn string() -> Type {
        Type::union("String", "String", Vec::new())
    }

    pub fn char() -> Type {
        Type::union("Char", "Char", Vec::new())
    }

    pub fn list(element: Type) -> Type {
        Type::union("List", "List", vec![element])
    }

    pub fn fresh_var() -> Type {
        Type::Var(TVar::fresh(None))
    }

    pub fn class_var(class: TypeClass) -> Type {
        Type::Var(TVar::fresh(Some(class)))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    /// `module.name` union with any parameters
    pub fn is_union_named(&self, module: &str, name: &str) -> bool {
        matches!(self, Type::Union(u) if u.module == module && u.name == name)
    }

    pub fn as_var(&self) -> Option<&TVar> {
        match self {
            Type::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn alias(&self) -> Option<&Rc<Alias>> {
        match self {
            Type::Function(f) => f.alias.as_ref(),
            Type::Tuple(t) => t.alias.as_ref(),
            Type::Union(u) => u.alias.as_ref(),
            Type::Record(r) => r.alias.as_ref(),
            _ => None,
        }
    }

    /// Same type seen through `alias`
    pub fn with_alias(&self, alias: Rc<Alias>) -> Type {
        match self {
            Type::Function(f) => Type::Function(Rc::new(FunctionType {
                alias: Some(alias),
                ..FunctionType::clone(f)
            })),
            Type::Tuple(t) => Type::Tuple(Rc::new(TupleType {
                alias: Some(alias),
                ..TupleType::clone(t)
            })),
            Type::Union(u) => Type::Union(Rc::new(UnionType {
                alias: Some(alias),
                ..UnionType::clone(u)
            })),
            Type::Record(r) => Type::Record(Rc::new(RecordType {
                alias: Some(alias),
                ..RecordType::clone(r)
            })),
            other => other.clone(),
        }
    }

    /// Parameter count of a curried function type, counting a returned
    /// function's parameters too
    pub fn arity(&self) -> usize {
        match self {
            Type::Function(f) => f.params.len() + f.ret.arity(),
            _ => 0,
        }
    }

    /// Every type variable, in order of first appearance
    pub fn vars(&self) -> Vec<TVar> {
        let mut out = Vec::new();
        collect_vars(self, &mut out);
        out
    }

    /// Whether `var` occurs anywhere in this type
    pub fn contains_var(&self, var: &TVar) -> bool {
        match self {
            Type::Var(v) => v == var,
            Type::Function(f) => {
                f.params.iter().any(|p| p.contains_var(var)) || f.ret.contains_var(var)
            }
            Type::Tuple(t) => t.types.iter().any(|t| t.contains_var(var)),
            Type::Union(u) => u.params.iter().any(|p| p.contains_var(var)),
            Type::Record(r) => {
                r.fields.values().any(|t| t.contains_var(var))
                    || r.base.as_ref().map(|b| b.contains_var(var)).unwrap_or(false)
            }
            Type::MutableRecord(r) => {
                let r = r.borrow();
                r.fields.values().any(|t| t.contains_var(var)) || r.base.contains_var(var)
            }
            Type::Unit | Type::Unknown | Type::InProgressBinding => false,
        }
    }
}

fn collect_vars(ty: &Type, out: &mut Vec<TVar>) {
    match ty {
        Type::Var(v) => {
            if !out.contains(v) {
                out.push(v.clone());
            }
        }
        Type::Function(f) => {
            f.params.iter().for_each(|p| collect_vars(p, out));
            collect_vars(&f.ret, out);
        }
        Type::Tuple(t) => t.types.iter().for_each(|t| collect_vars(t, out)),
        Type::Union(u) => u.params.iter().for_each(|p| collect_vars(p, out)),
        Type::Record(r) => {
            if let Some(base) = &r.base {
                collect_vars(base, out);
            }
            r.fields.values().for_each(|t| collect_vars(t, out));
        }
        Type::MutableRecord(r) => {
            let r = r.borrow();
            collect_vars(&r.base, out);
            r.fields.values().for_each(|t| collect_vars(t, out));
        }
        Type::Unit | Type::Unknown | Type::InProgressBinding => {}
    }
}

/// Build a curried function type from a list of parameters
pub fn curry(params: Vec<Type>, ret: Type) -> Type {
    if params.is_empty() {
        ret
    } else {
        Type::function(params, ret)
    }
}

/// Split a function type into all of its parameters and the final result,
/// flattening returned functions
pub fn uncurry(ty: &Type) -> (Vec<Type>, Type) {
    let mut params = Vec::new();
    let mut current = ty.clone();
    loop {
        let next = match &current {
            Type::Function(f) => {
                params.extend(f.params.iter().cloned());
                f.ret.clone()
            }
            _ => break,
        };
        current = next;
    }
    (params, current)
}
