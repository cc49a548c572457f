//! Syntax tree provider: lexer, layout-aware parser and the immutable tree
//! the rest of the engine reads.

pub mod lexer;
pub mod line_index;
pub mod parser;
pub mod tree;

pub use line_index::LineIndex;
pub use parser::parse;
pub use tree::{FileId, NodeId, NodeKind, NodeRef, SyntaxNode, SyntaxTree};
