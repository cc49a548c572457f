//! Decision trees for `case` expressions
//!
//! The tree says which position of the scrutinee to test first and where
//! each outcome leads. Paths are chosen to keep default branches small,
//! then to keep the branching factor small.

use super::{Literal, Pattern, NIL};
use std::fmt;

/// Position inside the value being matched
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Path {
    Index(usize, Box<Path>),
    Unbox(Box<Path>),
    Empty,
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Empty => write!(f, "_"),
            Path::Index(index, inner) => write!(f, "{}.{}", inner, index),
            Path::Unbox(inner) => write!(f, "{}.unbox", inner),
        }
    }
}

/// What is checked at a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Test {
    IsCtor {
        name: String,
        index: usize,
        num_alts: usize,
    },
    IsCons,
    IsNil,
    IsBool(bool),
    IsInt(i64),
    IsChr(String),
    IsStr(String),
    IsFloat(String),
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Test::IsCtor { name, .. } => write!(f, "{}", name),
            Test::IsCons => write!(f, "::"),
            Test::IsNil => write!(f, "[]"),
            Test::IsBool(true) => write!(f, "True"),
            Test::IsBool(false) => write!(f, "False"),
            Test::IsInt(i) => write!(f, "{}", i),
            Test::IsChr(c) => write!(f, "'{}'", c),
            Test::IsStr(s) => write!(f, "\"{}\"", s),
            Test::IsFloat(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionTree {
    /// Index of the branch that runs
    Match(usize),
    Decision {
        path: Path,
        edges: Vec<(Test, DecisionTree)>,
        default: Option<Box<DecisionTree>>,
    },
}

impl DecisionTree {
    /// Indented outline, one test per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(0, &mut out);
        out
    }

    fn render_into(&self, depth: usize, out: &mut String) {
        let pad = "  ".repeat(depth);
        match self {
            DecisionTree::Match(goal) => out.push_str(&format!("{}-> {}\n", pad, goal)),
            DecisionTree::Decision { path, edges, default } => {
                for (test, tree) in edges {
                    out.push_str(&format!("{}{} is {}:\n", pad, path, test));
                    tree.render_into(depth + 1, out);
                }
                if let Some(tree) = default {
                    out.push_str(&format!("{}otherwise:\n", pad));
                    tree.render_into(depth + 1, out);
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Branch {
    goal: usize,
    patterns: Vec<(Path, Pattern)>,
}

/// Build the tree for branches given in source order, or nothing when
/// there are no branches
pub fn compile(patterns: Vec<Pattern>) -> Option<DecisionTree> {
    let branches = patterns
        .into_iter()
        .enumerate()
        .map(|(goal, pattern)| Branch {
            goal,
            patterns: vec![(Path::Empty, pattern)],
        })
        .collect();
    to_decision_tree(branches)
}

fn to_decision_tree(raw: Vec<Branch>) -> Option<DecisionTree> {
    let branches: Vec<Branch> = raw.into_iter().map(flatten_branch).collect();

    if let Some(goal) = check_for_match(&branches) {
        return Some(DecisionTree::Match(goal));
    }

    let path = pick_path(&branches)?;
    let (edges, fallback) = gather_edges(&branches, &path);
    let mut edges = edges
        .into_iter()
        .map(|(test, branches)| Some((test, to_decision_tree(branches)?)))
        .collect::<Option<Vec<(Test, DecisionTree)>>>()?;

    Some(match (edges.len(), fallback.is_empty()) {
        (1, true) => edges.remove(0).1,
        (_, true) => DecisionTree::Decision {
            path,
            edges,
            default: None,
        },
        (0, false) => to_decision_tree(fallback)?,
        (_, false) => DecisionTree::Decision {
            path,
            edges,
            default: Some(Box::new(to_decision_tree(fallback)?)),
        },
    })
}

fn flatten_branch(branch: Branch) -> Branch {
    let mut patterns = Vec::new();
    for (path, pattern) in branch.patterns {
        flatten(path, pattern, &mut patterns);
    }
    Branch {
        goal: branch.goal,
        patterns,
    }
}

/// Single-constructor unions never need a test; their fields are pulled
/// up to their own paths instead
fn flatten(path: Path, pattern: Pattern, out: &mut Vec<(Path, Pattern)>) {
    match pattern {
        Pattern::Ctor { union, args, .. } if union.alts.len() == 1 => {
            for (path, arg) in unboxed(path, args) {
                flatten(path, arg, out);
            }
        }
        other => out.push((path, other)),
    }
}

fn unboxed(path: Path, mut args: Vec<Pattern>) -> Vec<(Path, Pattern)> {
    if args.len() == 1 {
        let arg = args.remove(0);
        vec![(Path::Unbox(Box::new(path)), arg)]
    } else {
        sub_positions(&path, args)
    }
}

fn sub_positions(path: &Path, args: Vec<Pattern>) -> Vec<(Path, Pattern)> {
    args.into_iter()
        .enumerate()
        .map(|(index, arg)| (Path::Index(index, Box::new(path.clone())), arg))
        .collect()
}

fn needs_tests(pattern: &Pattern) -> bool {
    !matches!(pattern, Pattern::Anything)
}

fn check_for_match(branches: &[Branch]) -> Option<usize> {
    let first = branches.first()?;
    first
        .patterns
        .iter()
        .all(|(_, p)| !needs_tests(p))
        .then_some(first.goal)
}

fn lookup<'b>(path: &Path, branch: &'b Branch) -> Option<&'b Pattern> {
    branch.patterns.iter().find(|(p, _)| p == path).map(|(_, pattern)| pattern)
}

fn test_for(pattern: &Pattern) -> Option<Test> {
    match pattern {
        Pattern::Anything => None,
        Pattern::Ctor { union, name, .. } => {
            if union.module == "List" && union.name == "List" {
                return Some(if name == NIL { Test::IsNil } else { Test::IsCons });
            }
            if union.module == "Basics" && union.name == "Bool" {
                return Some(Test::IsBool(name == "True"));
            }
            Some(Test::IsCtor {
                name: name.clone(),
                index: union.index_of(name).unwrap_or(0),
                num_alts: union.alts.len(),
            })
        }
        Pattern::Literal(Literal::Int(i)) => Some(Test::IsInt(*i)),
        Pattern::Literal(Literal::Chr(c)) => Some(Test::IsChr(c.clone())),
        Pattern::Literal(Literal::Str(s)) => Some(Test::IsStr(s.clone())),
        Pattern::Literal(Literal::Float(x)) => Some(Test::IsFloat(x.clone())),
    }
}

/// Distinct tests at a path, ordered by their last occurrence
fn tests_at_path(path: &Path, branches: &[Branch]) -> Vec<Test> {
    let mut unique: Vec<Test> = Vec::new();
    for test in branches.iter().rev().filter_map(|b| lookup(path, b).and_then(test_for)) {
        if !unique.contains(&test) {
            unique.insert(0, test);
        }
    }
    unique
}

fn is_complete(tests: &[Test]) -> bool {
    match tests.first() {
        Some(Test::IsCtor { num_alts, .. }) => *num_alts == tests.len(),
        Some(Test::IsCons | Test::IsNil | Test::IsBool(_)) => tests.len() == 2,
        _ => false,
    }
}

fn is_irrelevant_to(path: &Path, branch: &Branch) -> bool {
    lookup(path, branch).map_or(true, |p| !needs_tests(p))
}

type Edges = Vec<(Test, Vec<Branch>)>;

fn gather_edges(branches: &[Branch], path: &Path) -> (Edges, Vec<Branch>) {
    let tests = tests_at_path(path, branches);
    let fallback = if is_complete(&tests) {
        Vec::new()
    } else {
        branches
            .iter()
            .filter(|b| is_irrelevant_to(path, b))
            .cloned()
            .collect()
    };
    let edges = tests
        .into_iter()
        .map(|test| {
            let relevant = branches
                .iter()
                .filter_map(|b| to_relevant_branch(&test, path, b))
                .collect();
            (test, relevant)
        })
        .collect();
    (edges, fallback)
}

/// The branch as it looks once `test` succeeded at `path`, or nothing if
/// it cannot match then
fn to_relevant_branch(test: &Test, path: &Path, branch: &Branch) -> Option<Branch> {
    let Some(position) = branch.patterns.iter().position(|(p, _)| p == path) else {
        return Some(branch.clone());
    };
    let pattern = &branch.patterns[position].1;
    if !needs_tests(pattern) {
        return Some(branch.clone());
    }
    if test_for(pattern).as_ref() != Some(test) {
        return None;
    }

    let mut patterns = branch.patterns[..position].to_vec();
    if let Pattern::Ctor { union, args, .. } = pattern {
        let args = args.clone();
        if union.alts.len() == 1 {
            patterns.extend(unboxed(path.clone(), args));
        } else {
            patterns.extend(sub_positions(path, args));
        }
    }
    patterns.extend_from_slice(&branch.patterns[position + 1..]);
    Some(Branch {
        goal: branch.goal,
        patterns,
    })
}

/// Empty only when there are no branches left
fn pick_path(branches: &[Branch]) -> Option<Path> {
    let all_paths: Vec<Path> = branches
        .iter()
        .flat_map(|b| b.patterns.iter())
        .filter(|(_, pattern)| needs_tests(pattern))
        .map(|(path, _)| path.clone())
        .collect();

    let small_defaults = |path: &Path| branches.iter().filter(|b| is_irrelevant_to(path, b)).count();
    let mut tied = bests(all_paths, small_defaults);
    if tied.len() == 1 {
        return tied.pop();
    }

    let branching_factor = |path: &Path| {
        let (edges, fallback) = gather_edges(branches, path);
        edges.len() + usize::from(!fallback.is_empty())
    };
    bests(tied, branching_factor).into_iter().next()
}

/// Minimal-weight paths; later ties come first
fn bests(paths: Vec<Path>, weight: impl Fn(&Path) -> usize) -> Vec<Path> {
    let mut min = usize::MAX;
    let mut out: Vec<Path> = Vec::new();
    for path in paths {
        let w = weight(&path);
        if w < min {
            min = w;
            out = vec![path];
        } else if w == min {
            out.insert(0, path);
        }
    }
    out
}
