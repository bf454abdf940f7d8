//! Expression-tree construction and evaluation
//!
//! Works on a normalized token stream (no hex, no `!`, unary `-`/`*` folded
//! into their operands except `-` before a parenthesized group).  Two
//! decoupled stages:
//!
//! 1. [`parse`] builds an explicit [`ExprNode`] tree by *main-operator
//!    selection*: scan the range left to right, skip over matched
//!    parenthesized groups so only top-level operators are candidates, and
//!    split at the rightmost candidate of the weakest-binding precedence
//!    tier present.  Rightmost-within-tier yields left-associative grouping.
//! 2. [`eval_tree`] folds the tree to a `u32` with wrapping 32-bit
//!    arithmetic, collecting division-by-zero diagnostics instead of
//!    aborting.
//!
//! Parenthesis balance is verified over the whole stream before any
//! operator scanning, so an unbalanced input is rejected up front and can
//! never desynchronize the scan.

use super::normalize::parse_number;
use super::token::{Token, TokenKind};
use super::ExprError;
use crate::machine::{register_index, Machine};

/// Binary operators surviving normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    LessEqual,
    And,
    Or,
}

/// Non-fatal conditions raised while evaluating a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalDiagnostic {
    /// A `/` subterm had a zero divisor; its value was taken as 0.
    DivisionByZero,
}

/// An expression tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprNode {
    /// A 32-bit constant (sign-marked decimal text, already wrapped).
    Literal(u32),
    /// A general-purpose register, by index into the register table.
    Register(usize),
    /// Negation of a parenthesized subexpression.
    Negate(Box<ExprNode>),
    Binary {
        op: BinOp,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
}

/// Precedence tier of a binary operator token, weakest binding first.
/// `None` for non-operator tokens.
fn binary_op(kind: TokenKind) -> Option<(BinOp, u8)> {
    match kind {
        TokenKind::Or => Some((BinOp::Or, 0)),
        TokenKind::And => Some((BinOp::And, 1)),
        TokenKind::Equal => Some((BinOp::Equal, 2)),
        TokenKind::NotEqual => Some((BinOp::NotEqual, 2)),
        TokenKind::LessEqual => Some((BinOp::LessEqual, 3)),
        TokenKind::Plus => Some((BinOp::Add, 4)),
        TokenKind::Minus => Some((BinOp::Sub, 4)),
        TokenKind::Star => Some((BinOp::Mul, 5)),
        TokenKind::Slash => Some((BinOp::Div, 5)),
        _ => None,
    }
}

/// Verify parenthesis balance over the whole stream.
fn check_balance(tokens: &[Token]) -> Result<(), ExprError> {
    let mut depth: i32 = 0;
    for tok in tokens {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth < 0 {
                    return Err(ExprError::UnbalancedParens);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ExprError::UnbalancedParens);
    }
    Ok(())
}

/// Index of the `)` matching the `(` at `open`, searching no further than
/// `q`.  The stream is balance-checked before parsing, so failure here
/// cannot happen for input that got this far.
fn matching_paren(
    tokens: &[Token],
    open: usize,
    q: usize,
) -> Result<usize, ExprError> {
    let mut depth = 0;
    for (i, tok) in tokens.iter().enumerate().take(q + 1).skip(open) {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(ExprError::UnbalancedParens)
}

/// Build the expression tree for a normalized, non-empty token stream.
pub fn parse(tokens: &[Token]) -> Result<ExprNode, ExprError> {
    check_balance(tokens)?;
    parse_range(tokens, 0, tokens.len() - 1)
}

/// Build the tree for the inclusive range `[p, q]`.
pub fn parse_range(
    tokens: &[Token],
    p: usize,
    q: usize,
) -> Result<ExprNode, ExprError> {
    if p > q {
        return Err(ExprError::Malformed("missing operand".to_string()));
    }

    if p == q {
        let tok = &tokens[p];
        return match tok.kind {
            TokenKind::Register => register_index(&tok.text)
                .map(ExprNode::Register)
                .ok_or_else(|| ExprError::UnknownRegister(tok.text.clone())),
            TokenKind::Number => parse_number(&tok.text).map(ExprNode::Literal),
            _ => Err(ExprError::Malformed(format!(
                "expected an operand, found {}",
                tok
            ))),
        };
    }

    // A matched pair wrapping the whole range is just thrown away.
    if tokens[p].kind == TokenKind::LParen
        && tokens[q].kind == TokenKind::RParen
        && matching_paren(tokens, p, q)? == q
    {
        return parse_range(tokens, p + 1, q - 1);
    }

    // Main-operator selection: rightmost candidate of the weakest tier at
    // the top nesting level.  An operator is a candidate only in binary
    // position, i.e. something that can end an operand sits to its left.
    let mut best: Option<(u8, usize, BinOp)> = None;
    let mut i = p;
    while i <= q {
        if tokens[i].kind == TokenKind::LParen {
            i = matching_paren(tokens, i, q)?;
        } else if let Some((op, tier)) = binary_op(tokens[i].kind) {
            let binary_position = i > p && tokens[i - 1].kind.is_operand_end();
            if binary_position {
                match best {
                    Some((best_tier, _, _)) if tier > best_tier => {}
                    _ => best = Some((tier, i, op)),
                }
            }
        }
        i += 1;
    }

    if let Some((_, op_idx, op)) = best {
        if op_idx == q {
            return Err(ExprError::Malformed(format!(
                "missing right operand for {}",
                tokens[op_idx]
            )));
        }
        let lhs = parse_range(tokens, p, op_idx - 1)?;
        let rhs = parse_range(tokens, op_idx + 1, q)?;
        return Ok(ExprNode::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        });
    }

    // No binary operator at the top level: a leading `-` negates the rest
    // (the `-(...)` form survives normalization), anything else does not
    // form an expression.
    if tokens[p].kind == TokenKind::Minus {
        let inner = parse_range(tokens, p + 1, q)?;
        return Ok(ExprNode::Negate(Box::new(inner)));
    }

    Err(ExprError::Malformed(
        "no operator between operands".to_string(),
    ))
}

/// Fold a tree to its 32-bit value, reading live machine state.
///
/// Both operands of `&&`/`||` are always evaluated (no short-circuit), so a
/// division by zero on either side is still diagnosed.
pub fn eval_tree<M: Machine>(
    node: &ExprNode,
    machine: &M,
    diagnostics: &mut Vec<EvalDiagnostic>,
) -> u32 {
    match node {
        ExprNode::Literal(value) => *value,
        ExprNode::Register(index) => machine.read_register(*index),
        ExprNode::Negate(inner) => {
            eval_tree(inner, machine, diagnostics).wrapping_neg()
        }
        ExprNode::Binary { op, lhs, rhs } => {
            let l = eval_tree(lhs, machine, diagnostics);
            let r = eval_tree(rhs, machine, diagnostics);
            match op {
                BinOp::Add => l.wrapping_add(r),
                BinOp::Sub => l.wrapping_sub(r),
                BinOp::Mul => l.wrapping_mul(r),
                BinOp::Div => {
                    if r == 0 {
                        diagnostics.push(EvalDiagnostic::DivisionByZero);
                        0
                    } else {
                        l / r
                    }
                }
                BinOp::Equal => (l == r) as u32,
                BinOp::NotEqual => (l != r) as u32,
                BinOp::LessEqual => (l <= r) as u32,
                BinOp::And => (l != 0 && r != 0) as u32,
                BinOp::Or => (l != 0 || r != 0) as u32,
            }
        }
    }
}
