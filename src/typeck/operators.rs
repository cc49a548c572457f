//! Operator precedence
//!
//! The parser keeps `a + b * c` as a flat chain. The tree is rebuilt here
//! from the infix declarations of the operators in the chain.

use crate::expression::{Associativity, BinOpPart, Expr};
use crate::syntax::SyntaxNode;

#[derive(Debug)]
pub(super) enum OpTree<'t> {
    Operand(Expr<'t>),
    Binary {
        /// `Operator` node
        op: SyntaxNode<'t>,
        left: Box<OpTree<'t>>,
        right: Box<OpTree<'t>>,
    },
}

#[derive(Debug, Clone, Copy)]
pub(super) struct OperatorInfo {
    pub precedence: u8,
    pub associativity: Associativity,
}

impl Default for OperatorInfo {
    /// What an operator without a visible infix declaration gets
    fn default() -> Self {
        Self {
            precedence: 9,
            associativity: Associativity::Left,
        }
    }
}

#[derive(Debug)]
pub(super) enum OperatorError<'t> {
    /// Two operators of equal precedence that cannot be chained
    NonAssociative {
        first: SyntaxNode<'t>,
        second: SyntaxNode<'t>,
    },
    /// Operands and operators do not alternate
    Malformed,
}

pub(super) fn build<'t>(
    parts: Vec<BinOpPart<'t>>,
    info: impl Fn(SyntaxNode<'t>) -> OperatorInfo,
) -> Result<OpTree<'t>, OperatorError<'t>> {
    let mut operands = Vec::new();
    let mut operators = Vec::new();
    for (index, part) in parts.into_iter().enumerate() {
        match (index % 2, part) {
            (0, BinOpPart::Operand(expr)) => operands.push(expr),
            (1, BinOpPart::Operator(op)) => operators.push((op, info(op))),
            _ => return Err(OperatorError::Malformed),
        }
    }
    if operands.len() != operators.len() + 1 {
        return Err(OperatorError::Malformed);
    }

    check_associativity(&operators)?;

    let mut climber = Climber {
        operands: operands.into_iter(),
        operators: operators.into_iter().peekable(),
    };
    climber.climb(0)
}

/// Each operator against the next one that binds no tighter
fn check_associativity<'t>(operators: &[(SyntaxNode<'t>, OperatorInfo)]) -> Result<(), OperatorError<'t>> {
    for (i, (op, info)) in operators.iter().enumerate() {
        let next = operators[i + 1..]
            .iter()
            .find(|(_, other)| other.precedence <= info.precedence);
        let Some((other_op, other)) = next else {
            continue;
        };
        if other.precedence < info.precedence {
            continue;
        }
        let chains = match (info.associativity, other.associativity) {
            (Associativity::Left, Associativity::Left) | (Associativity::Right, Associativity::Right) => true,
            _ => false,
        };
        if !chains {
            return Err(OperatorError::NonAssociative {
                first: *op,
                second: *other_op,
            });
        }
    }
    Ok(())
}

struct Climber<'t, O, P>
where
    O: Iterator<Item = Expr<'t>>,
    P: Iterator<Item = (SyntaxNode<'t>, OperatorInfo)>,
{
    operands: O,
    operators: std::iter::Peekable<P>,
}

impl<'t, O, P> Climber<'t, O, P>
where
    O: Iterator<Item = Expr<'t>>,
    P: Iterator<Item = (SyntaxNode<'t>, OperatorInfo)>,
{
    fn climb(&mut self, min: u8) -> Result<OpTree<'t>, OperatorError<'t>> {
        let mut left = OpTree::Operand(self.operands.next().ok_or(OperatorError::Malformed)?);
        while let Some((op, info)) = self.operators.next_if(|(_, info)| info.precedence >= min) {
            let next_min = match info.associativity {
                Associativity::Right => info.precedence,
                _ => info.precedence + 1,
            };
            let right = self.climb(next_min)?;
            left = OpTree::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }
}
