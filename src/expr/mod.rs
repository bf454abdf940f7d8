//! Monitor expression evaluation
//!
//! This module turns expression text into a 32-bit value in four stages:
//! - [`lexer`]: ordered-rule tokenization (text → tokens)
//! - [`normalize`]: linear rewrite passes that canonicalize hex literals and
//!   fold the unary `-`, `!`, and `*` (dereference) ambiguities away
//! - [`eval`]: main-operator selection over the normalized stream, building
//!   an explicit expression tree, then evaluating it
//! - [`token`]: token definitions shared by the stages
//!
//! # Evaluation contract
//!
//! [`evaluate`] is the structured entry point: a `u32` result plus a list of
//! non-fatal diagnostics (currently only division by zero, which yields 0
//! for the offending subterm instead of aborting).  [`evaluate_expression`]
//! is the monitor-facing wrapper: `(value, success)`, with `(0, false)` for
//! any malformed input.
//!
//! Every call owns its token stream and diagnostics, so a failed call can
//! never leak state into the next one and at most one evaluation being in
//! flight is a convention of the caller, not a requirement of this code.

pub mod eval;
pub mod lexer;
pub mod normalize;
pub mod token;

use crate::machine::Machine;
use std::fmt;
use tracing::{debug, trace};

pub use eval::{BinOp, EvalDiagnostic, ExprNode};
pub use token::{LexError, LexErrorKind, Token, TokenKind, MAX_TOKENS};

/// Why an evaluation call failed.
///
/// All variants are user errors: they fail the one call that produced them
/// and leave nothing behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// Tokenization failed.
    Lex(LexError),
    /// The expression contained no tokens at all.
    Empty,
    /// Parentheses in the expression do not balance.
    UnbalancedParens,
    /// The token stream does not form an expression (missing operand,
    /// adjacent operands, a stray operator, ...).
    Malformed(String),
    /// A `$`-prefixed name that is not in the register table.
    UnknownRegister(String),
    /// A literal that does not fit the 32-bit value domain.
    BadLiteral(String),
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::Lex(err) => write!(f, "{}", err),
            ExprError::Empty => write!(f, "empty expression"),
            ExprError::UnbalancedParens => {
                write!(f, "unbalanced parentheses")
            }
            ExprError::Malformed(reason) => {
                write!(f, "malformed expression: {}", reason)
            }
            ExprError::UnknownRegister(name) => {
                write!(f, "unknown register '{}'", name)
            }
            ExprError::BadLiteral(text) => {
                write!(f, "literal '{}' out of range", text)
            }
        }
    }
}

impl std::error::Error for ExprError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExprError::Lex(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LexError> for ExprError {
    fn from(err: LexError) -> Self {
        ExprError::Lex(err)
    }
}

/// Result of a successful evaluation: the value plus any non-fatal
/// diagnostics raised along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub value: u32,
    pub diagnostics: Vec<EvalDiagnostic>,
}

impl Evaluation {
    /// Whether any subterm divided by zero during this evaluation.
    pub fn division_by_zero(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, EvalDiagnostic::DivisionByZero))
    }
}

/// Evaluate an expression against live machine state.
pub fn evaluate<M: Machine>(
    machine: &M,
    text: &str,
) -> Result<Evaluation, ExprError> {
    let tokens = lexer::tokenize(text)?;
    let tokens = normalize::normalize(tokens, machine)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }

    let tree = eval::parse(&tokens)?;
    let mut diagnostics = Vec::new();
    let value = eval::eval_tree(&tree, machine, &mut diagnostics);
    trace!(expr = text, value, "expression evaluated");

    Ok(Evaluation { value, diagnostics })
}

/// Monitor-facing evaluation: `(value, success)`.
///
/// Any error maps to `(0, false)`; division by zero is not an error here
/// (the result is still produced, with 0 for the offending subterm).
pub fn evaluate_expression<M: Machine>(machine: &M, text: &str) -> (u32, bool) {
    match evaluate(machine, text) {
        Ok(eval) => (eval.value, true),
        Err(err) => {
            debug!(expr = text, %err, "expression evaluation failed");
            (0, false)
        }
    }
}
