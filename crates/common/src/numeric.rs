//! Numeric parsing and display helpers for price-like values
//!
//! Trading UIs and APIs render prices as text ("1,234.56", "-0.5", "+12").
//! [`parse_tolerant_number`] accepts exactly these shapes:
//!
//! - optional surrounding whitespace
//! - an optional leading `+` or `-`
//! - an integer part whose digits may be grouped with `,` (a comma must sit
//!   between two digits)
//! - an optional `.` followed by fraction digits
//!
//! At least one digit is required. Exponents, currency symbols, `NaN` and
//! `inf` are rejected.

use thiserror::Error;

/// Reason a string was rejected by [`parse_tolerant_number`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseNumberError {
    #[error("empty input")]
    Empty,

    #[error("no digits in {0:?}")]
    NoDigits(String),

    #[error("unexpected character {ch:?} at offset {offset} in {input:?}")]
    UnexpectedChar {
        input: String,
        ch: char,
        offset: usize,
    },

    #[error("misplaced thousands separator in {0:?}")]
    MisplacedSeparator(String),
}

/// Parse a number that may carry a sign and thousands separators.
pub fn parse_tolerant_number(text: &str) -> Result<f64, ParseNumberError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseNumberError::Empty);
    }

    let mut cleaned = String::with_capacity(trimmed.len());
    let mut digits = 0usize;
    let mut seen_point = false;
    let mut prev: Option<char> = None;

    for (offset, ch) in trimmed.char_indices() {
        match ch {
            '+' | '-' if offset == 0 => cleaned.push(ch),
            '0'..='9' => {
                digits += 1;
                cleaned.push(ch);
            }
            ',' if !seen_point => {
                if !prev.is_some_and(|p| p.is_ascii_digit()) {
                    return Err(ParseNumberError::MisplacedSeparator(trimmed.to_string()));
                }
            }
            '.' if !seen_point => {
                if prev == Some(',') {
                    return Err(ParseNumberError::MisplacedSeparator(trimmed.to_string()));
                }
                seen_point = true;
                cleaned.push(ch);
            }
            _ => {
                return Err(ParseNumberError::UnexpectedChar {
                    input: trimmed.to_string(),
                    ch,
                    offset,
                })
            }
        }
        prev = Some(ch);
    }

    if prev == Some(',') {
        return Err(ParseNumberError::MisplacedSeparator(trimmed.to_string()));
    }
    if digits == 0 {
        return Err(ParseNumberError::NoDigits(trimmed.to_string()));
    }

    cleaned
        .parse::<f64>()
        .map_err(|_| ParseNumberError::NoDigits(trimmed.to_string()))
}

/// Number of digits after the decimal point in a rendered number
pub fn decimal_places(text: &str) -> usize {
    text.trim()
        .split_once('.')
        .map(|(_, frac)| frac.chars().take_while(|c| c.is_ascii_digit()).count())
        .unwrap_or(0)
}

/// Format `value` with a fixed number of decimals and `,` thousands grouping.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
