//! Ordered-rule tokenizer for monitor expressions
//!
//! The lexer tries a fixed list of rules at the current scan position and
//! takes the first one that matches there.  Rule *order* is what
//! disambiguates: `!=` is listed ahead of `!`, and the hex rule ahead of the
//! decimal rule, so neither needs longest-match logic.  If no rule matches,
//! the whole evaluation fails with the offending byte offset.

use super::token::{LexError, LexErrorKind, Token, TokenKind, MAX_TOKENS};

/// What a rule matches at the scan position.
enum Pattern {
    /// A run of ASCII whitespace.
    Whitespace,
    /// An exact operator or parenthesis spelling.
    Literal(&'static str),
    /// `$`, then letters, then optional trailing digits.
    Register,
    /// `0x`/`0X` followed by at least one hex digit.
    Hex,
    /// A run of at least one decimal digit.
    Decimal,
}

struct Rule {
    pattern: Pattern,
    /// `None` for discarded matches (whitespace).
    kind: Option<TokenKind>,
}

/// Rules in priority order.  Two-character operators must stay ahead of
/// their one-character prefixes (`!=` before `!`), and hex ahead of decimal
/// so `0x10` is not cut at the `0`.
const RULES: [Rule; 16] = [
    Rule {
        pattern: Pattern::Whitespace,
        kind: None,
    },
    Rule {
        pattern: Pattern::Literal("+"),
        kind: Some(TokenKind::Plus),
    },
    Rule {
        pattern: Pattern::Literal("-"),
        kind: Some(TokenKind::Minus),
    },
    Rule {
        pattern: Pattern::Literal("*"),
        kind: Some(TokenKind::Star),
    },
    Rule {
        pattern: Pattern::Literal("/"),
        kind: Some(TokenKind::Slash),
    },
    Rule {
        pattern: Pattern::Literal("("),
        kind: Some(TokenKind::LParen),
    },
    Rule {
        pattern: Pattern::Literal(")"),
        kind: Some(TokenKind::RParen),
    },
    Rule {
        pattern: Pattern::Literal("<="),
        kind: Some(TokenKind::LessEqual),
    },
    Rule {
        pattern: Pattern::Literal("=="),
        kind: Some(TokenKind::Equal),
    },
    Rule {
        pattern: Pattern::Literal("!="),
        kind: Some(TokenKind::NotEqual),
    },
    Rule {
        pattern: Pattern::Literal("||"),
        kind: Some(TokenKind::Or),
    },
    Rule {
        pattern: Pattern::Literal("&&"),
        kind: Some(TokenKind::And),
    },
    Rule {
        pattern: Pattern::Literal("!"),
        kind: Some(TokenKind::Not),
    },
    Rule {
        pattern: Pattern::Register,
        kind: Some(TokenKind::Register),
    },
    Rule {
        pattern: Pattern::Hex,
        kind: Some(TokenKind::HexNumber),
    },
    Rule {
        pattern: Pattern::Decimal,
        kind: Some(TokenKind::Number),
    },
];

/// Length of the match for `pattern` at the start of `rest`, if any.
fn match_at(pattern: &Pattern, rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    match pattern {
        Pattern::Whitespace => {
            let len = bytes
                .iter()
                .take_while(|b| b.is_ascii_whitespace())
                .count();
            (len > 0).then_some(len)
        }
        Pattern::Literal(lit) => rest.starts_with(lit).then(|| lit.len()),
        Pattern::Register => {
            if bytes.first() != Some(&b'$') {
                return None;
            }
            let letters = bytes[1..]
                .iter()
                .take_while(|b| b.is_ascii_alphabetic())
                .count();
            let digits = bytes[1 + letters..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count();
            Some(1 + letters + digits)
        }
        Pattern::Hex => {
            if bytes.len() < 3 || bytes[0] != b'0' {
                return None;
            }
            if bytes[1] != b'x' && bytes[1] != b'X' {
                return None;
            }
            let digits = bytes[2..]
                .iter()
                .take_while(|b| b.is_ascii_hexdigit())
                .count();
            (digits > 0).then_some(2 + digits)
        }
        Pattern::Decimal => {
            let len = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            (len > 0).then_some(len)
        }
    }
}

/// Tokenize an expression into a flat token stream.
///
/// Whitespace is consumed but never emitted.  Fails with the byte offset of
/// the first position where no rule matches, or where the token cap is hit.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut position = 0;

    while position < text.len() {
        let rest = &text[position..];
        let matched = RULES
            .iter()
            .find_map(|rule| {
                match_at(&rule.pattern, rest).map(|len| (rule.kind, len))
            })
            .ok_or(LexError {
                kind: LexErrorKind::NoRule,
                offset: position,
            })?;

        let (kind, len) = matched;
        if let Some(kind) = kind {
            if tokens.len() == MAX_TOKENS {
                return Err(LexError {
                    kind: LexErrorKind::TokenLimit,
                    offset: position,
                });
            }
            tokens.push(Token::new(kind, &rest[..len]));
        }
        position += len;
    }

    Ok(tokens)
}
