//! Rendering types as Elm source text

use super::{TVar, Type, TypeClass};
use std::collections::{HashMap, HashSet};

/// Decides how a type name is written in a given file
pub trait Qualifier {
    fn qualify(&self, module: &str, name: &str) -> String;
}

/// Renders types, giving checker-made variables stable letter names. One
/// renderer shared across the types of a message keeps names consistent.
pub struct TypeRenderer<'q> {
    qualifier: Option<&'q dyn Qualifier>,
    names: HashMap<TVar, String>,
    reserved: HashSet<String>,
    next_letter: usize,
}

impl<'q> TypeRenderer<'q> {
    pub fn new(qualifier: Option<&'q dyn Qualifier>) -> Self {
        Self {
            qualifier,
            names: HashMap::new(),
            reserved: HashSet::new(),
            next_letter: 0,
        }
    }

    pub fn render(&mut self, ty: &Type) -> String {
        for var in ty.vars() {
            if !var.is_generated() {
                self.reserved.insert(var.name().to_string());
            }
        }
        let mut out = String::new();
        self.write(ty, &mut out, false);
        out
    }

    fn qualified(&self, module: &str, name: &str) -> String {
        match self.qualifier {
            Some(q) => q.qualify(module, name),
            None => name.to_string(),
        }
    }

    fn var_name(&mut self, var: &TVar) -> String {
        if !var.is_generated() {
            return var.name().to_string();
        }
        if let Some(name) = self.names.get(var) {
            return name.clone();
        }
        let name = match var.class() {
            Some(class) => self.class_name(class),
            None => self.letter_name(),
        };
        self.reserved.insert(name.clone());
        self.names.insert(var.clone(), name.clone());
        name
    }

    fn class_name(&self, class: TypeClass) -> String {
        let base = class.name();
        if !self.reserved.contains(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{}{}", base, i))
            .find(|n| !self.reserved.contains(n))
            .unwrap_or_else(|| base.to_string())
    }

    fn letter_name(&mut self) -> String {
        loop {
            let index = self.next_letter;
            self.next_letter += 1;
            let letter = char::from(b'a' + (index % 26) as u8);
            let name = if index < 26 {
                letter.to_string()
            } else {
                format!("{}{}", letter, index / 26)
            };
            if !self.reserved.contains(&name) {
                return name;
            }
        }
    }

    /// `parens` wraps anything that is not atomic
    fn write(&mut self, ty: &Type, out: &mut String, parens: bool) {
        if let Some(alias) = ty.alias() {
            let name = self.qualified(&alias.module, &alias.name);
            if alias.parameters.is_empty() {
                out.push_str(&name);
                return;
            }
            if parens {
                out.push('(');
            }
            out.push_str(&name);
            for param in &alias.parameters {
                out.push(' ');
                self.write(param, out, true);
            }
            if parens {
                out.push(')');
            }
            return;
        }

        match ty {
            Type::Var(v) => {
                let name = self.var_name(v);
                out.push_str(&name);
            }
            Type::Function(f) => {
                if parens {
                    out.push('(');
                }
                for param in &f.params {
                    let is_function = matches!(param, Type::Function(p) if p.alias.is_none());
                    self.write(param, out, is_function);
                    out.push_str(" -> ");
                }
                self.write(&f.ret, out, false);
                if parens {
                    out.push(')');
                }
            }
            Type::Tuple(t) => {
                out.push_str("( ");
                for (i, item) in t.types.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write(item, out, false);
                }
                out.push_str(" )");
            }
            Type::Union(u) => {
                let name = self.qualified(&u.module, &u.name);
                let wrap = parens && !u.params.is_empty();
                if wrap {
                    out.push('(');
                }
                out.push_str(&name);
                for param in &u.params {
                    out.push(' ');
                    self.write(param, out, true);
                }
                if wrap {
                    out.push(')');
                }
            }
            Type::Record(r) => {
                let base = r.base.clone();
                let fields: Vec<(String, Type)> =
                    r.fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                self.write_record(&fields, base.as_ref(), out);
            }
            Type::MutableRecord(r) => {
                let (fields, base) = {
                    let r = r.borrow();
                    let fields: Vec<(String, Type)> =
                        r.fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                    (fields, r.base.clone())
                };
                self.write_record(&fields, Some(&base), out);
            }
            Type::Unit => out.push_str("()"),
            Type::Unknown | Type::InProgressBinding => out.push_str("unknown"),
        }
    }

    fn write_record(&mut self, fields: &[(String, Type)], base: Option<&Type>, out: &mut String) {
        if fields.is_empty() && base.is_none() {
            out.push_str("{}");
            return;
        }
        out.push_str("{ ");
        if let Some(base) = base {
            self.write(base, out, false);
            if fields.is_empty() {
                out.push_str(" }");
                return;
            }
            out.push_str(" | ");
        }
        for (i, (name, ty)) in fields.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(name);
            out.push_str(" : ");
            self.write(ty, out, false);
        }
        out.push_str(" }");
    }
}

/// Render `ty`, qualifying names the way `qualifier` says
pub fn type_to_string(ty: &Type, qualifier: Option<&dyn Qualifier>) -> String {
    TypeRenderer::new(qualifier).render(ty)
}
