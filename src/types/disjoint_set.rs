//! Substitution as a union-find over type variables

use super::{TVar, Type};
use std::collections::HashMap;

/// Maps variables to what they were unified with. Lookups follow chains of
/// variable-to-variable links to the representative.
#[derive(Debug, Clone, Default)]
pub struct DisjointSet {
    map: HashMap<TVar, Type>,
}

impl DisjointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `var := ty`. Binding a variable to itself is a no-op.
    pub fn union(&mut self, var: &TVar, ty: Type) {
        if let Type::Var(target) = &ty {
            if target == var {
                return;
            }
        }
        self.map.insert(var.clone(), ty);
    }

    pub fn contains(&self, var: &TVar) -> bool {
        self.map.contains_key(var)
    }

    /// Representative of `ty`: follows variable links until an unbound
    /// variable or a non-variable type is reached
    pub fn get(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        // Links never form a cycle, the bound only guards against engine bugs
        for _ in 0..=self.map.len() {
            let next = match &current {
                Type::Var(v) => match self.map.get(v) {
                    Some(next) => next.clone(),
                    None => return current,
                },
                _ => return current,
            };
            current = next;
        }
        panic!("substitution contains a cycle through {:?}", ty);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn vars(&self) -> impl Iterator<Item = &TVar> {
        self.map.keys()
    }
}
