// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version string ordering.
//!
//! Port versions are plain strings with no enforced scheme, so the catalog
//! orders them through a comparator seam instead of demanding semver from
//! recipe authors. [`NaturalOrder`] is the default comparator, and knows
//! that "1.10" comes after "1.2".

use std::cmp::Ordering;

/// Total order over port version strings.
pub trait VersionOrder {
    /// Compare two version strings.
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

/// Segment-wise natural version comparator.
///
/// Versions are decomposed into alternating numeric and non-numeric tokens.
/// The separators '.', '-', '_', and '~' delimit tokens without being
/// compared themselves. Tokens compare numerically when both are numeric
/// (leading zeros are insignificant), lexically when both are not, and a
/// numeric token sorts after a non-numeric one. When one token stream is a
/// prefix of the other, the longer stream wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaturalOrder;

impl VersionOrder for NaturalOrder {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        let lhs = tokenize(a);
        let rhs = tokenize(b);

        let mut left = lhs.iter();
        let mut right = rhs.iter();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(x), Some(y)) => match compare_tokens(x, y) {
                    Ordering::Equal => continue,
                    decided => return decided,
                },
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Number(&'a str),
    Text(&'a str),
}

const SEPARATORS: [char; 4] = ['.', '-', '_', '~'];

fn tokenize(version: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for piece in version.split(SEPARATORS) {
        let mut start = 0;
        let mut numeric = None;
        for (at, symbol) in piece.char_indices() {
            let is_digit = symbol.is_ascii_digit();
            match numeric {
                Some(previous) if previous != is_digit => {
                    tokens.push(token(&piece[start..at], previous));
                    start = at;
                    numeric = Some(is_digit);
                }
                Some(_) => {}
                None => numeric = Some(is_digit),
            }
        }
        if let Some(previous) = numeric {
            tokens.push(token(&piece[start..], previous));
        }
    }

    tokens
}

fn token(text: &str, numeric: bool) -> Token<'_> {
    if numeric {
        Token::Number(text)
    } else {
        Token::Text(text)
    }
}

fn compare_tokens(x: &Token<'_>, y: &Token<'_>) -> Ordering {
    match (x, y) {
        (Token::Number(x), Token::Number(y)) => compare_numeric(x, y),
        (Token::Text(x), Token::Text(y)) => x.cmp(y),
        (Token::Number(_), Token::Text(_)) => Ordering::Greater,
        (Token::Text(_), Token::Number(_)) => Ordering::Less,
    }
}

// Digit strings may exceed any machine integer, so compare the trimmed
// digits by length first, then lexically.
fn compare_numeric(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}
