//! Token definitions for the expression lexer
//!
//! Every token carries its literal spelling so that later passes can rewrite
//! operand text in place of the original (the normalizer turns `0x10` into
//! `16`, and folds a unary minus into the digits that follow it).  Numeric
//! payloads are always derived from the text, never cached.

use std::fmt;

/// Hard cap on the number of tokens a single expression may produce.
///
/// Monitor expressions are typed on a command line; anything longer than
/// this is rejected rather than evaluated.
pub const MAX_TOKENS: usize = 100;

/// All token variants produced by the lexer.
///
/// Whitespace is discarded during lexing and has no variant here, so a
/// token stream contains only material tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Decimal integer literal (possibly sign-marked after normalization).
    Number,
    /// `0x`/`0X` hexadecimal literal; eliminated by normalization.
    HexNumber,
    /// `$`-prefixed register reference.
    Register,

    Plus,  // +
    Minus, // -
    Star,  // * (binary multiply, or unary dereference before normalization)
    Slash, // /

    LParen, // (
    RParen, // )

    Not,       // ! (always unary; eliminated by normalization)
    Equal,     // ==
    NotEqual,  // !=
    And,       // &&
    Or,        // ||
    LessEqual, // <=
}

impl TokenKind {
    /// Whether this token can terminate an operand: a ground value or a
    /// closing parenthesis.  Used by the unary-folding passes to decide
    /// whether a following `-` or `*` is binary.
    pub fn is_operand_end(self) -> bool {
        matches!(
            self,
            TokenKind::Number
                | TokenKind::HexNumber
                | TokenKind::Register
                | TokenKind::RParen
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Number => "number",
            TokenKind::HexNumber => "hex number",
            TokenKind::Register => "register",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Not => "'!'",
            TokenKind::Equal => "'=='",
            TokenKind::NotEqual => "'!='",
            TokenKind::And => "'&&'",
            TokenKind::Or => "'||'",
            TokenKind::LessEqual => "'<='",
        };
        f.write_str(s)
    }
}

/// A single lexical unit: kind plus its spelling in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.text)
    }
}

/// Why tokenization failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// No lexer rule matched at the offset.
    NoRule,
    /// The expression produced more than [`MAX_TOKENS`] tokens.
    TokenLimit,
}

/// Tokenization failure at a byte offset into the expression text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub offset: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LexErrorKind::NoRule => {
                write!(f, "unrecognized input at offset {}", self.offset)
            }
            LexErrorKind::TokenLimit => write!(
                f,
                "expression exceeds {} tokens at offset {}",
                MAX_TOKENS, self.offset
            ),
        }
    }
}

impl std::error::Error for LexError {}
