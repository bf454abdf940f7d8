//! Token-stream normalization passes
//!
//! Four left-to-right passes rewrite the raw token stream into one the
//! evaluator can treat as purely binary.  Each pass builds a fresh vector
//! rather than compacting in place, so removing a token can never shift an
//! index out from under the scan.
//!
//! Pass order matters: hex canonicalization runs first so the later passes
//! only ever see decimal `Number` operands, and unary-minus folding runs
//! before dereference folding so `*-4` dereferences the folded `-4`.
//!
//! After normalization no `!` tokens remain, and `-`/`*` in unary position
//! before a numeric operand have been folded into the operand.  The one
//! surviving unary form is `-` directly before `(`, which the parser
//! resolves as negation of the parenthesized subexpression.

use super::token::{Token, TokenKind};
use super::ExprError;
use crate::machine::Machine;

/// Run all normalization passes over a freshly lexed token stream.
pub fn normalize<M: Machine>(
    tokens: Vec<Token>,
    machine: &M,
) -> Result<Vec<Token>, ExprError> {
    let tokens = canonicalize_hex(tokens)?;
    let tokens = fold_unary_minus(tokens);
    let tokens = fold_unary_not(tokens)?;
    fold_dereference(tokens, machine)
}

/// Parse the decimal text of a normalized operand, sign mark included,
/// wrapping into the 32-bit value domain.
pub(super) fn parse_number(text: &str) -> Result<u32, ExprError> {
    text.parse::<i64>()
        .map(|v| v as u32)
        .map_err(|_| ExprError::BadLiteral(text.to_string()))
}

/// Pass 1: rewrite every `HexNumber` as a decimal `Number`.
fn canonicalize_hex(tokens: Vec<Token>) -> Result<Vec<Token>, ExprError> {
    tokens
        .into_iter()
        .map(|tok| {
            if tok.kind != TokenKind::HexNumber {
                return Ok(tok);
            }
            let digits = &tok.text[2..]; // lexer guarantees the 0x prefix
            let value = u32::from_str_radix(digits, 16)
                .map_err(|_| ExprError::BadLiteral(tok.text.clone()))?;
            Ok(Token::new(TokenKind::Number, value.to_string()))
        })
        .collect()
}

/// Pass 2: fold a unary `-` into the number that follows it.
///
/// A `-` is unary when nothing before it can end an operand and a `Number`
/// follows; the sign mark becomes part of the operand's text.
fn fold_unary_minus(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let unary = tokens[i].kind == TokenKind::Minus
            && (i == 0 || !tokens[i - 1].kind.is_operand_end())
            && matches!(
                tokens.get(i + 1),
                Some(next) if next.kind == TokenKind::Number
            );
        if unary {
            let operand = &tokens[i + 1];
            out.push(Token::new(
                TokenKind::Number,
                format!("-{}", operand.text),
            ));
            i += 2;
        } else {
            out.push(tokens[i].clone());
            i += 1;
        }
    }
    out
}

/// Pass 3: fold `!`, which is always unary, into the number that follows it
/// (`0` becomes `1`, anything else becomes `0`).
fn fold_unary_not(tokens: Vec<Token>) -> Result<Vec<Token>, ExprError> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind == TokenKind::Not {
            let operand = match tokens.get(i + 1) {
                Some(next) if next.kind == TokenKind::Number => next,
                _ => {
                    return Err(ExprError::Malformed(
                        "'!' must be followed by a number".to_string(),
                    ))
                }
            };
            let value = parse_number(&operand.text)?;
            let negated = if value == 0 { "1" } else { "0" };
            out.push(Token::new(TokenKind::Number, negated));
            i += 2;
        } else {
            out.push(tokens[i].clone());
            i += 1;
        }
    }
    Ok(out)
}

/// Pass 4: fold a unary `*` (memory dereference) by reading 4 bytes from
/// the emulated memory at the operand's value.
///
/// A `*` is a dereference when nothing before it can end an operand and a
/// `Number` follows.  Registers and parenthesized addresses are not valid
/// dereference targets; they are rejected later as malformed.
fn fold_dereference<M: Machine>(
    tokens: Vec<Token>,
    machine: &M,
) -> Result<Vec<Token>, ExprError> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let unary = tokens[i].kind == TokenKind::Star
            && (i == 0 || !tokens[i - 1].kind.is_operand_end())
            && matches!(
                tokens.get(i + 1),
                Some(next) if next.kind == TokenKind::Number
            );
        if unary {
            let addr = parse_number(&tokens[i + 1].text)?;
            let value = machine.read_memory_u32(addr);
            out.push(Token::new(TokenKind::Number, value.to_string()));
            i += 2;
        } else {
            out.push(tokens[i].clone());
            i += 1;
        }
    }
    Ok(out)
}
