//! Pattern exhaustiveness and redundancy
//!
//! Source patterns are simplified to three shapes (wildcards, literals and
//! constructors) and checked column by column against a pattern matrix.
//! Unit, tuples and lists are modeled as ordinary unions so one algorithm
//! covers all of them.

mod decision_tree;

#[cfg(test)]
mod tests;

pub use decision_tree::{compile, DecisionTree, Path, Test};

use crate::expression::{LiteralKind, Pattern as SourcePattern};
use crate::syntax::SyntaxNode;
use std::rc::Rc;

pub const UNIT: &str = "#0";
pub const PAIR: &str = "#2";
pub const TRIPLE: &str = "#3";
pub const CONS: &str = "::";
pub const NIL: &str = "[]";

/// One constructor of a union, with the number of arguments it takes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtorInfo {
    pub name: String,
    pub arity: usize,
}

/// A union type as far as pattern matching cares: all its constructors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Union {
    pub module: String,
    pub name: String,
    pub alts: Vec<CtorInfo>,
}

impl Union {
    pub fn new(module: &str, name: &str, alts: Vec<CtorInfo>) -> Rc<Union> {
        Rc::new(Union {
            module: module.to_string(),
            name: name.to_string(),
            alts,
        })
    }

    pub fn unit() -> Rc<Union> {
        Union::new("", UNIT, vec![ctor(UNIT, 0)])
    }

    pub fn pair() -> Rc<Union> {
        Union::new("", PAIR, vec![ctor(PAIR, 2)])
    }

    pub fn triple() -> Rc<Union> {
        Union::new("", TRIPLE, vec![ctor(TRIPLE, 3)])
    }

    pub fn list() -> Rc<Union> {
        Union::new("List", "List", vec![ctor(NIL, 0), ctor(CONS, 2)])
    }

    pub fn arity_of(&self, name: &str) -> Option<usize> {
        self.alts.iter().find(|c| c.name == name).map(|c| c.arity)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.alts.iter().position(|c| c.name == name)
    }
}

fn ctor(name: &str, arity: usize) -> CtorInfo {
    CtorInfo {
        name: name.to_string(),
        arity,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i64),
    Chr(String),
    Str(String),
    /// Floats cannot be matched exhaustively; kept by source text
    Float(String),
}

/// A simplified pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Anything,
    Literal(Literal),
    Ctor {
        union: Rc<Union>,
        name: String,
        args: Vec<Pattern>,
    },
}

impl Pattern {
    pub fn ctor(union: &Rc<Union>, name: &str, args: Vec<Pattern>) -> Pattern {
        Pattern::Ctor {
            union: Rc::clone(union),
            name: name.to_string(),
            args,
        }
    }
}

/// Simplify a source pattern. `resolve` maps the constructor name node of
/// a union pattern to its union; unresolvable constructors match anything
/// since they were already reported.
pub fn simplify<'t>(
    pattern: SourcePattern<'t>,
    resolve: &mut impl FnMut(SyntaxNode<'t>) -> Option<Rc<Union>>,
) -> Pattern {
    match pattern {
        SourcePattern::Lower(_)
        | SourcePattern::Anything(_)
        | SourcePattern::Record(_)
        | SourcePattern::Error(_) => Pattern::Anything,
        SourcePattern::As(_) => match pattern.as_parts() {
            Some((inner, _)) => simplify(inner, resolve),
            None => Pattern::Anything,
        },
        SourcePattern::Unit(_) => Pattern::ctor(&Union::unit(), UNIT, Vec::new()),
        SourcePattern::Tuple(tuple) => {
            let items: Vec<Pattern> = tuple.items().map(|p| simplify(p, resolve)).collect();
            match items.len() {
                2 => Pattern::ctor(&Union::pair(), PAIR, items),
                3 => Pattern::ctor(&Union::triple(), TRIPLE, items),
                _ => Pattern::Anything,
            }
        }
        SourcePattern::List(list) => {
            let union = Union::list();
            let items: Vec<Pattern> = list.items().map(|p| simplify(p, resolve)).collect();
            items
                .into_iter()
                .rev()
                .fold(Pattern::ctor(&union, NIL, Vec::new()), |tail, head| {
                    Pattern::ctor(&union, CONS, vec![head, tail])
                })
        }
        SourcePattern::Cons(cons) => {
            let head = cons.head().map(|p| simplify(p, resolve)).unwrap_or(Pattern::Anything);
            let tail = cons.tail().map(|p| simplify(p, resolve)).unwrap_or(Pattern::Anything);
            Pattern::ctor(&Union::list(), CONS, vec![head, tail])
        }
        SourcePattern::Union(union_pattern) => {
            let Some(name_node) = union_pattern.constructor() else {
                return Pattern::Anything;
            };
            let Some(union) = resolve(name_node) else {
                return Pattern::Anything;
            };
            let text = name_node.text();
            let name = text.rsplit('.').next().unwrap_or(text);
            let Some(arity) = union.arity_of(name) else {
                return Pattern::Anything;
            };
            let mut args: Vec<Pattern> = union_pattern.args().map(|p| simplify(p, resolve)).collect();
            args.resize(arity, Pattern::Anything);
            Pattern::ctor(&union, name, args)
        }
        SourcePattern::Literal(node, kind) => Pattern::Literal(literal(node.text(), kind)),
    }
}

fn literal(text: &str, kind: LiteralKind) -> Literal {
    match kind {
        LiteralKind::Int => parse_int(text)
            .map(Literal::Int)
            .unwrap_or_else(|| Literal::Float(text.to_string())),
        LiteralKind::Float => Literal::Float(text.to_string()),
        LiteralKind::String => Literal::Str(strip_quotes(text, '"')),
        LiteralKind::Char => Literal::Chr(strip_quotes(text, '\'')),
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -value } else { value })
}

fn strip_quotes(text: &str, quote: char) -> String {
    let text = text.strip_prefix("\"\"\"").and_then(|t| t.strip_suffix("\"\"\"")).unwrap_or(text);
    text.trim_start_matches(quote).trim_end_matches(quote).to_string()
}

// -------------------------------------------------------------------
// Exhaustiveness
// -------------------------------------------------------------------

/// Rows not covered by `matrix`, each `n` patterns wide
pub fn is_exhaustive(matrix: &[Vec<Pattern>], n: usize) -> Vec<Vec<Pattern>> {
    if matrix.is_empty() {
        return vec![vec![Pattern::Anything; n]];
    }
    if n == 0 {
        return Vec::new();
    }

    let ctors = collect_ctors(matrix);
    let Some(union) = ctors.first().map(|(_, u)| Rc::clone(u)) else {
        let rest: Vec<Vec<Pattern>> = matrix.iter().filter_map(|r| specialize_by_anything(r)).collect();
        return is_exhaustive(&rest, n - 1)
            .into_iter()
            .map(|row| prepend(Pattern::Anything, row))
            .collect();
    };

    if ctors.len() < union.alts.len() {
        let rest: Vec<Vec<Pattern>> = matrix.iter().filter_map(|r| specialize_by_anything(r)).collect();
        let missing_rest = is_exhaustive(&rest, n - 1);
        let mut out = Vec::new();
        for alt in &union.alts {
            if ctors.iter().any(|(name, _)| *name == alt.name) {
                continue;
            }
            let missing = Pattern::ctor(&union, &alt.name, vec![Pattern::Anything; alt.arity]);
            for row in &missing_rest {
                out.push(prepend(missing.clone(), row.clone()));
            }
        }
        return out;
    }

    let mut out = Vec::new();
    for alt in &union.alts {
        let specialized: Vec<Vec<Pattern>> = matrix
            .iter()
            .filter_map(|r| specialize_by_ctor(&alt.name, alt.arity, r))
            .collect();
        for row in is_exhaustive(&specialized, alt.arity + n - 1) {
            out.push(recover_ctor(&union, &alt.name, alt.arity, row));
        }
    }
    out
}

/// Whether `vector` matches some value no row of `matrix` matches
pub fn is_useful(matrix: &[Vec<Pattern>], vector: &[Pattern]) -> bool {
    if matrix.is_empty() {
        return true;
    }
    let Some((first, rest)) = vector.split_first() else {
        return false;
    };
    match first {
        Pattern::Ctor { name, args, .. } => {
            let specialized: Vec<Vec<Pattern>> = matrix
                .iter()
                .filter_map(|r| specialize_by_ctor(name, args.len(), r))
                .collect();
            let mut next = args.clone();
            next.extend_from_slice(rest);
            is_useful(&specialized, &next)
        }
        Pattern::Anything => match complete_union(matrix) {
            None => {
                let specialized: Vec<Vec<Pattern>> =
                    matrix.iter().filter_map(|r| specialize_by_anything(r)).collect();
                is_useful(&specialized, rest)
            }
            Some(union) => union.alts.iter().any(|alt| {
                let specialized: Vec<Vec<Pattern>> = matrix
                    .iter()
                    .filter_map(|r| specialize_by_ctor(&alt.name, alt.arity, r))
                    .collect();
                let mut next = vec![Pattern::Anything; alt.arity];
                next.extend_from_slice(rest);
                is_useful(&specialized, &next)
            }),
        },
        Pattern::Literal(lit) => {
            let specialized: Vec<Vec<Pattern>> = matrix
                .iter()
                .filter_map(|r| specialize_by_literal(lit, r))
                .collect();
            is_useful(&specialized, rest)
        }
    }
}

fn prepend(first: Pattern, mut row: Vec<Pattern>) -> Vec<Pattern> {
    row.insert(0, first);
    row
}

fn recover_ctor(union: &Rc<Union>, name: &str, arity: usize, mut row: Vec<Pattern>) -> Vec<Pattern> {
    let rest = row.split_off(arity.min(row.len()));
    prepend(Pattern::ctor(union, name, row), rest)
}

/// Constructors heading the first column, in first-seen order
fn collect_ctors(matrix: &[Vec<Pattern>]) -> Vec<(String, Rc<Union>)> {
    let mut ctors: Vec<(String, Rc<Union>)> = Vec::new();
    for row in matrix {
        if let Some(Pattern::Ctor { union, name, .. }) = row.first() {
            if !ctors.iter().any(|(n, _)| n == name) {
                ctors.push((name.clone(), Rc::clone(union)));
            }
        }
    }
    ctors
}

fn complete_union(matrix: &[Vec<Pattern>]) -> Option<Rc<Union>> {
    let ctors = collect_ctors(matrix);
    let (_, union) = ctors.first()?;
    (ctors.len() == union.alts.len()).then(|| Rc::clone(union))
}

fn specialize_by_ctor(ctor: &str, arity: usize, row: &[Pattern]) -> Option<Vec<Pattern>> {
    let (first, rest) = row.split_first()?;
    match first {
        Pattern::Ctor { name, args, .. } if name == ctor => {
            let mut out = args.clone();
            out.extend_from_slice(rest);
            Some(out)
        }
        Pattern::Anything => {
            let mut out = vec![Pattern::Anything; arity];
            out.extend_from_slice(rest);
            Some(out)
        }
        // a literal next to constructors only happens in ill-typed code
        Pattern::Ctor { .. } | Pattern::Literal(_) => None,
    }
}

fn specialize_by_literal(literal: &Literal, row: &[Pattern]) -> Option<Vec<Pattern>> {
    let (first, rest) = row.split_first()?;
    match first {
        Pattern::Literal(lit) if lit == literal => Some(rest.to_vec()),
        Pattern::Anything => Some(rest.to_vec()),
        Pattern::Literal(_) | Pattern::Ctor { .. } => None,
    }
}

fn specialize_by_anything(row: &[Pattern]) -> Option<Vec<Pattern>> {
    match row.split_first()? {
        (Pattern::Anything, rest) => Some(rest.to_vec()),
        _ => None,
    }
}

/// Outcome of checking the branches of one `case`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseCheck {
    /// Zero-based indexes of branches no value can reach
    pub redundant: Vec<usize>,
    /// Values no branch matches
    pub missing: Vec<Pattern>,
}

/// Check a list of single-column rows in branch order. Redundant rows are
/// left out of the matrix the missing patterns are computed from.
pub fn check_case(rows: Vec<Pattern>) -> CaseCheck {
    let mut checked: Vec<Vec<Pattern>> = Vec::new();
    let mut redundant = Vec::new();
    for (index, pattern) in rows.into_iter().enumerate() {
        let row = vec![pattern];
        if is_useful(&checked, &row) {
            checked.push(row);
        } else {
            redundant.push(index);
        }
    }
    let missing = is_exhaustive(&checked, 1)
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .collect();
    CaseCheck { redundant, missing }
}

// -------------------------------------------------------------------
// Rendering
// -------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Context {
    Arg,
    Head,
    Unambiguous,
}

/// Render a pattern the way it would be written in source
pub fn pattern_to_doc(pattern: &Pattern) -> String {
    to_doc(pattern, Context::Unambiguous)
}

enum Delisted<'p> {
    NonList(&'p Pattern),
    FiniteList(Vec<&'p Pattern>),
    Conses(Vec<&'p Pattern>, &'p Pattern),
}

fn delist(pattern: &Pattern) -> Delisted<'_> {
    let mut entries = Vec::new();
    let mut current = pattern;
    loop {
        match current {
            Pattern::Ctor { name, args, .. } if name == NIL && args.is_empty() => {
                return Delisted::FiniteList(entries);
            }
            Pattern::Ctor { name, args, .. } if name == CONS && args.len() == 2 => {
                entries.push(&args[0]);
                current = &args[1];
            }
            _ if entries.is_empty() => return Delisted::NonList(current),
            _ => return Delisted::Conses(entries, current),
        }
    }
}

fn to_doc(pattern: &Pattern, context: Context) -> String {
    match delist(pattern) {
        Delisted::NonList(Pattern::Anything) => "_".to_string(),
        Delisted::NonList(Pattern::Literal(lit)) => match lit {
            Literal::Int(i) => i.to_string(),
            Literal::Chr(c) => format!("'{}'", c),
            Literal::Str(s) => format!("\"{}\"", s),
            Literal::Float(f) => f.clone(),
        },
        Delisted::NonList(Pattern::Ctor { name, args, .. }) => match (name.as_str(), args.as_slice()) {
            (UNIT, []) => "()".to_string(),
            (PAIR, [a, b]) => format!(
                "( {}, {} )",
                to_doc(a, Context::Unambiguous),
                to_doc(b, Context::Unambiguous)
            ),
            (TRIPLE, [a, b, c]) => format!(
                "( {}, {}, {} )",
                to_doc(a, Context::Unambiguous),
                to_doc(b, Context::Unambiguous),
                to_doc(c, Context::Unambiguous)
            ),
            _ => {
                let mut doc = name.clone();
                for arg in args {
                    doc.push(' ');
                    doc.push_str(&to_doc(arg, Context::Arg));
                }
                if context == Context::Arg && !args.is_empty() {
                    format!("({})", doc)
                } else {
                    doc
                }
            }
        },
        Delisted::FiniteList(entries) if entries.is_empty() => "[]".to_string(),
        Delisted::FiniteList(entries) => {
            let items: Vec<String> = entries
                .iter()
                .map(|e| to_doc(e, Context::Unambiguous))
                .collect();
            format!("[{}]", items.join(", "))
        }
        Delisted::Conses(heads, last) => {
            let mut doc = to_doc(last, Context::Unambiguous);
            for head in heads.iter().rev() {
                doc = format!("{} :: {}", to_doc(head, Context::Head), doc);
            }
            if context == Context::Unambiguous {
                doc
            } else {
                format!("({})", doc)
            }
        }
    }
}
