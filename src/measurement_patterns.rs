//! # Measurement Patterns Module
//!
//! Regex patterns and lookup tables used by the quantity parser.

use lazy_static::lazy_static;
use regex::Regex;

/// One quantity token: mixed number, simple fraction, decimal or whole number.
/// Alternatives are ordered so the longest form wins.
const QUANTITY_TOKEN: &str = r"\d+\s+\d+/\d+|\d+/\d+|\d+(?:\.\d+)?|\.\d+";

/// Unicode vulgar fractions and their ASCII spelling
pub const VULGAR_FRACTIONS: [(char, &str); 18] = [
    ('½', "1/2"),
    ('⅓', "1/3"),
    ('⅔', "2/3"),
    ('¼', "1/4"),
    ('¾', "3/4"),
    ('⅕', "1/5"),
    ('⅖', "2/5"),
    ('⅗', "3/5"),
    ('⅘', "4/5"),
    ('⅙', "1/6"),
    ('⅚', "5/6"),
    ('⅐', "1/7"),
    ('⅛', "1/8"),
    ('⅜', "3/8"),
    ('⅝', "5/8"),
    ('⅞', "7/8"),
    ('⅑', "1/9"),
    ('⅒', "1/10"),
];

/// Units spelled with two words; checked before single-word units
pub const TWO_WORD_UNITS: [&str; 4] = ["fl oz", "fluid ounce", "fluid ounces", "fl. oz"];

lazy_static! {
    /// Leading quantity with an optional range: "1 1/2", "2-3", "2 to 3"
    pub static ref LEADING_QUANTITY: Regex = Regex::new(&format!(
        r"(?i)^(?P<first>{QUANTITY_TOKEN})(?:\s*(?:-|–|—|\bto\b)\s*(?P<second>{QUANTITY_TOKEN}))?"
    ))
    .expect("Leading quantity pattern should be valid");

    /// A single fraction, possibly with a whole part
    pub static ref FRACTION: Regex =
        Regex::new(r"^(?:(?P<whole>\d+)\s+)?(?P<num>\d+)/(?P<den>\d+)$")
            .expect("Fraction pattern should be valid");

    /// Trailing parenthetical note: "onions (white)"
    pub static ref TRAILING_PARENTHETICAL: Regex =
        Regex::new(r"\s*\((?P<note>[^()]*)\)\s*$").expect("Parenthetical pattern should be valid");

    /// Dash clause separator: "butter - softened"
    pub static ref DASH_CLAUSE: Regex =
        Regex::new(r"\s+[-–—]\s+").expect("Dash clause pattern should be valid");

    /// Runs of whitespace
    pub static ref WHITESPACE: Regex =
        Regex::new(r"\s+").expect("Whitespace pattern should be valid");
}
