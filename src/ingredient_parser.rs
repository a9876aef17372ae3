//! # Ingredient Parser
//!
//! Parses one free-text ingredient statement into a quantity, a canonical
//! unit, an ingredient name and trailing notes.
//!
//! ## Features
//!
//! - Whole numbers, decimals, fractions (1/2) and mixed numbers (1 1/2)
//! - Unicode fractions (½, ⅓, ¾, ...), glued or spaced ("1½ cups")
//! - Ranges (2-3, 2 to 3); only the lower bound is kept numerically
//! - Unit synonyms and plurals, canonicalized through [`crate::units`]
//! - Notes from a trailing parenthetical, comma clause or dash clause
//! - Non-numeric amounts ("salt to taste") kept as quantity text
//!
//! Parsing never fails on messy input: an unreadable quantity degrades to
//! `qty_num = None` and the rest of the line is still extracted.
//!
//! ## Usage
//!
//! ```rust
//! use mealplanner::ingredient_parser::parse;
//!
//! let parsed = parse("1 1/2 cups chopped onions (white)").unwrap();
//! assert_eq!(parsed.qty_num, Some(1.5));
//! assert_eq!(parsed.unit, "cup");
//! assert_eq!(parsed.name, "chopped onions");
//! assert_eq!(parsed.notes, "white");
//! ```

use crate::measurement_patterns::{
    DASH_CLAUSE, FRACTION, LEADING_QUANTITY, TRAILING_PARENTHETICAL, TWO_WORD_UNITS,
    VULGAR_FRACTIONS, WHITESPACE,
};
use crate::units::CanonicalUnit;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount phrases that stand in for a number at the end of a line
const TEXTUAL_AMOUNTS: [&str; 5] = [
    "to taste",
    "as needed",
    "as required",
    "for garnish",
    "for serving",
];

/// Structured result of parsing one ingredient statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIngredient {
    /// Numeric quantity; `None` when absent or unreadable
    pub qty_num: Option<f64>,
    /// Quantity phrase as written, with the unit word ("2 to 3 cups")
    pub qty_text: String,
    /// Canonical unit code, or empty
    pub unit: String,
    /// Ingredient name, original case
    pub name: String,
    /// Extracted notes joined with "; "
    pub notes: String,
}

impl ParsedIngredient {
    /// Lowercased name used as grouping input
    pub fn grouping_name(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Errors that can occur while reading a quantity token
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    InvalidNumber(String),
    DivisionByZero,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidNumber(token) => write!(f, "Invalid number format: {token}"),
            ParseError::DivisionByZero => write!(f, "Division by zero in fraction"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a multi-line ingredient block, skipping blank lines
pub fn parse_ingredient_list(text: &str) -> Vec<ParsedIngredient> {
    text.lines().filter_map(parse).collect()
}

/// Parse a single ingredient statement.
///
/// Returns `None` for empty or whitespace-only input.
pub fn parse(text: &str) -> Option<ParsedIngredient> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let normalized = replace_vulgar_fractions(text);
    trace!("Parsing ingredient line: '{}' -> '{}'", text, normalized);

    let mut qty_num = None;
    let mut quantity_phrase = String::new();
    let mut rest = normalized.as_str();

    if let Some(captures) = LEADING_QUANTITY.captures(&normalized) {
        let first = collapse_whitespace(&captures["first"]);
        qty_num = match parse_quantity_token(&first) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Unreadable quantity '{}' in '{}': {}", first, text, e);
                None
            }
        };
        quantity_phrase = match captures.name("second") {
            Some(second) => format!("{first} to {}", collapse_whitespace(second.as_str())),
            None => first,
        };
        rest = &normalized[captures.get(0).map_or(0, |m| m.end())..];
    }

    let (unit, unit_word, remainder) = if quantity_phrase.is_empty() {
        (String::new(), "", rest)
    } else {
        take_unit(rest)
    };

    let mut qty_text = match (quantity_phrase.is_empty(), unit_word.is_empty()) {
        (true, _) => String::new(),
        (false, true) => quantity_phrase,
        (false, false) => format!("{quantity_phrase} {unit_word}"),
    };

    let (mut name, mut notes) = split_name_and_notes(remainder);

    if qty_text.is_empty() {
        if let Some((stripped, phrase)) = strip_textual_amount(&name) {
            name = stripped;
            qty_text = phrase.to_string();
        } else if let Some((rest, phrase)) = take_textual_note(&notes) {
            notes = rest;
            qty_text = phrase.to_string();
        }
    }

    debug!(
        "Parsed '{}': qty={:?} unit='{}' name='{}' notes='{}'",
        text, qty_num, unit, name, notes
    );

    Some(ParsedIngredient {
        qty_num,
        qty_text,
        unit,
        name,
        notes,
    })
}

/// Rewrite unicode vulgar fractions to ASCII `a/b`, separating them from a
/// preceding whole number and a following word.
pub fn replace_vulgar_fractions(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '⁄' {
            out.push('/');
            continue;
        }
        match VULGAR_FRACTIONS.iter().find(|(glyph, _)| *glyph == c) {
            Some((_, ascii)) => {
                if out.chars().last().is_some_and(|prev| prev.is_ascii_digit()) {
                    out.push(' ');
                }
                out.push_str(ascii);
                if chars.peek().is_some_and(|next| next.is_alphabetic()) {
                    out.push(' ');
                }
            }
            None => out.push(c),
        }
    }

    out
}

/// Numeric value of one quantity token ("2", "1.5", "1/2", "1 1/2")
fn parse_quantity_token(token: &str) -> Result<f64, ParseError> {
    if let Some(captures) = FRACTION.captures(token) {
        let whole: f64 = match captures.name("whole") {
            Some(w) => w
                .as_str()
                .parse()
                .map_err(|_| ParseError::InvalidNumber(token.to_string()))?,
            None => 0.0,
        };
        let numerator: f64 = captures["num"]
            .parse()
            .map_err(|_| ParseError::InvalidNumber(token.to_string()))?;
        let denominator: f64 = captures["den"]
            .parse()
            .map_err(|_| ParseError::InvalidNumber(token.to_string()))?;

        if denominator == 0.0 {
            return Err(ParseError::DivisionByZero);
        }

        return Ok(whole + numerator / denominator);
    }

    token
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber(token.to_string()))
}

/// Split a unit off the front of `rest`.
///
/// Returns the canonical code, the unit word as written, and what follows it.
/// When the first word is not a known unit nothing is consumed.
fn take_unit(rest: &str) -> (String, &str, &str) {
    let rest = rest.trim_start();
    let (first, after_first) = split_first_word(rest);
    let (second, after_second) = split_first_word(after_first);

    if !second.is_empty() {
        let two_words = format!("{} {}", first.to_lowercase(), second.to_lowercase());
        if TWO_WORD_UNITS.contains(&two_words.as_str()) {
            let written = rest[..rest.len() - after_second.len()].trim_end();
            return (CanonicalUnit::FluidOunce.code().to_string(), written, after_second);
        }
    }

    let word = first.trim_end_matches(',');
    match CanonicalUnit::lookup(word) {
        Some(unit) => (unit.code().to_string(), word, after_first),
        None => (String::new(), "", rest),
    }
}

/// First whitespace-delimited word of `s` and the text after it
fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    }
}

/// Separate the ingredient name from trailing notes
fn split_name_and_notes(remainder: &str) -> (String, String) {
    let mut name = remainder.trim().to_string();
    let mut notes: Vec<String> = Vec::new();

    if let Some(captures) = TRAILING_PARENTHETICAL.captures(&name) {
        let note = captures["note"].trim().to_string();
        let start = captures.get(0).map_or(name.len(), |m| m.start());
        name.truncate(start);
        if !note.is_empty() {
            notes.push(note);
        }
    }

    if let Some(i) = name.find(',') {
        let note = name[i + 1..].trim().to_string();
        name.truncate(i);
        if !note.is_empty() {
            notes.push(note);
        }
    }

    if let Some(m) = DASH_CLAUSE.find(&name) {
        let note = name[m.end()..].trim().to_string();
        let start = m.start();
        name.truncate(start);
        if !note.is_empty() {
            notes.push(note);
        }
    }

    let mut name = collapse_whitespace(name.trim());
    if name.to_lowercase().starts_with("of ") {
        if let Some(tail) = name.get(3..) {
            name = tail.trim_start().to_string();
        }
    }

    (name, notes.join("; "))
}

/// Strip a trailing textual amount ("salt to taste" -> "salt", "to taste")
fn strip_textual_amount(name: &str) -> Option<(String, &'static str)> {
    let lower = name.to_lowercase();
    TEXTUAL_AMOUNTS.iter().find_map(|phrase| {
        let stripped = lower.strip_suffix(phrase)?;
        if !stripped.is_empty() && !stripped.ends_with(' ') {
            return None;
        }
        let head = name.get(..stripped.len())?;
        Some((head.trim().to_string(), *phrase))
    })
}

/// Pull a textual amount out of the notes ("salt, to taste"). Returns the
/// remaining notes and the phrase.
fn take_textual_note(notes: &str) -> Option<(String, &'static str)> {
    let mut parts: Vec<String> = notes.split("; ").map(str::to_string).collect();
    let (position, head, phrase) = parts.iter().enumerate().find_map(|(position, part)| {
        strip_textual_amount(part).map(|(head, phrase)| (position, head, phrase))
    })?;
    parts[position] = head.trim_end_matches(',').trim().to_string();
    parts.retain(|part| !part.is_empty());
    Some((parts.join("; "), phrase))
}

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}
