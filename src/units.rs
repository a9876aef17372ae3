//! # Unit Canonicalization and Conversion
//!
//! Maps the many spellings of a measurement unit found in recipe text to a
//! closed set of canonical units, and converts quantities between units of the
//! same physical dimension.
//!
//! ## Usage
//!
//! ```rust
//! use mealplanner::units::{canonicalize, convert};
//!
//! assert_eq!(canonicalize("Tablespoons"), "tbsp");
//! assert_eq!(canonicalize("lbs"), "lb");
//!
//! let cups = convert(16.0, "tbsp", "cup");
//! assert!(cups.ok);
//! assert!((cups.qty.unwrap() - 1.0).abs() < 1e-6);
//!
//! // count-like units never convert into each other
//! assert!(!convert(1.0, "clove", "head").ok);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Physical dimension of a unit. Only units sharing a dimension can be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Liquid and dry volume, rooted at milliliters
    Volume,
    /// Weight, rooted at grams
    Mass,
    /// Discrete or container-like amounts that only add up with themselves
    Count,
}

/// Canonical measurement units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalUnit {
    // Volume units
    Teaspoon,
    Tablespoon,
    FluidOunce,
    Cup,
    Pint,
    Quart,
    Gallon,
    Milliliter,
    Centiliter,
    Deciliter,
    Liter,

    // Weight units
    Milligram,
    Gram,
    Kilogram,
    Ounce,
    Pound,

    // Count-like units
    Each,
    Clove,
    Slice,
    Pinch,
    Dash,
    Can,
    Jar,
    Package,
    Bunch,
    Stick,
    Bottle,
    Sprig,
    Head,
    Stalk,
    Handful,
    Bag,
    Box,
    Drop,
}

/// Every canonical unit, in declaration order
pub const ALL_UNITS: [CanonicalUnit; 34] = [
    CanonicalUnit::Teaspoon,
    CanonicalUnit::Tablespoon,
    CanonicalUnit::FluidOunce,
    CanonicalUnit::Cup,
    CanonicalUnit::Pint,
    CanonicalUnit::Quart,
    CanonicalUnit::Gallon,
    CanonicalUnit::Milliliter,
    CanonicalUnit::Centiliter,
    CanonicalUnit::Deciliter,
    CanonicalUnit::Liter,
    CanonicalUnit::Milligram,
    CanonicalUnit::Gram,
    CanonicalUnit::Kilogram,
    CanonicalUnit::Ounce,
    CanonicalUnit::Pound,
    CanonicalUnit::Each,
    CanonicalUnit::Clove,
    CanonicalUnit::Slice,
    CanonicalUnit::Pinch,
    CanonicalUnit::Dash,
    CanonicalUnit::Can,
    CanonicalUnit::Jar,
    CanonicalUnit::Package,
    CanonicalUnit::Bunch,
    CanonicalUnit::Stick,
    CanonicalUnit::Bottle,
    CanonicalUnit::Sprig,
    CanonicalUnit::Head,
    CanonicalUnit::Stalk,
    CanonicalUnit::Handful,
    CanonicalUnit::Bag,
    CanonicalUnit::Box,
    CanonicalUnit::Drop,
];

/// Unit spellings and their canonical unit. Plurals ending in a plain `s` and
/// trailing periods are handled by [`CanonicalUnit::lookup`].
static UNIT_MAPPINGS: LazyLock<HashMap<&'static str, CanonicalUnit>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Volume units
    map.insert("tsp", CanonicalUnit::Teaspoon);
    map.insert("tsps", CanonicalUnit::Teaspoon);
    map.insert("teaspoon", CanonicalUnit::Teaspoon);
    map.insert("tbsp", CanonicalUnit::Tablespoon);
    map.insert("tbsps", CanonicalUnit::Tablespoon);
    map.insert("tbs", CanonicalUnit::Tablespoon);
    map.insert("tbl", CanonicalUnit::Tablespoon);
    map.insert("tablespoon", CanonicalUnit::Tablespoon);
    map.insert("fl-oz", CanonicalUnit::FluidOunce);
    map.insert("fl oz", CanonicalUnit::FluidOunce);
    map.insert("floz", CanonicalUnit::FluidOunce);
    map.insert("fluid ounce", CanonicalUnit::FluidOunce);
    map.insert("fluid ounces", CanonicalUnit::FluidOunce);
    map.insert("cup", CanonicalUnit::Cup);
    map.insert("c", CanonicalUnit::Cup);
    map.insert("pint", CanonicalUnit::Pint);
    map.insert("pt", CanonicalUnit::Pint);
    map.insert("quart", CanonicalUnit::Quart);
    map.insert("qt", CanonicalUnit::Quart);
    map.insert("gallon", CanonicalUnit::Gallon);
    map.insert("gal", CanonicalUnit::Gallon);
    map.insert("ml", CanonicalUnit::Milliliter);
    map.insert("milliliter", CanonicalUnit::Milliliter);
    map.insert("millilitre", CanonicalUnit::Milliliter);
    map.insert("cl", CanonicalUnit::Centiliter);
    map.insert("centiliter", CanonicalUnit::Centiliter);
    map.insert("centilitre", CanonicalUnit::Centiliter);
    map.insert("dl", CanonicalUnit::Deciliter);
    map.insert("deciliter", CanonicalUnit::Deciliter);
    map.insert("decilitre", CanonicalUnit::Deciliter);
    map.insert("l", CanonicalUnit::Liter);
    map.insert("liter", CanonicalUnit::Liter);
    map.insert("litre", CanonicalUnit::Liter);

    // Weight units
    map.insert("mg", CanonicalUnit::Milligram);
    map.insert("milligram", CanonicalUnit::Milligram);
    map.insert("g", CanonicalUnit::Gram);
    map.insert("gr", CanonicalUnit::Gram);
    map.insert("gram", CanonicalUnit::Gram);
    map.insert("gramme", CanonicalUnit::Gram);
    map.insert("kg", CanonicalUnit::Kilogram);
    map.insert("kilo", CanonicalUnit::Kilogram);
    map.insert("kilogram", CanonicalUnit::Kilogram);
    map.insert("kilogramme", CanonicalUnit::Kilogram);
    map.insert("oz", CanonicalUnit::Ounce);
    map.insert("ounce", CanonicalUnit::Ounce);
    map.insert("lb", CanonicalUnit::Pound);
    map.insert("lbs", CanonicalUnit::Pound);
    map.insert("pound", CanonicalUnit::Pound);

    // Count-like units
    map.insert("each", CanonicalUnit::Each);
    map.insert("ea", CanonicalUnit::Each);
    map.insert("piece", CanonicalUnit::Each);
    map.insert("pc", CanonicalUnit::Each);
    map.insert("whole", CanonicalUnit::Each);
    map.insert("clove", CanonicalUnit::Clove);
    map.insert("slice", CanonicalUnit::Slice);
    map.insert("pinch", CanonicalUnit::Pinch);
    map.insert("pinches", CanonicalUnit::Pinch);
    map.insert("dash", CanonicalUnit::Dash);
    map.insert("dashes", CanonicalUnit::Dash);
    map.insert("can", CanonicalUnit::Can);
    map.insert("tin", CanonicalUnit::Can);
    map.insert("jar", CanonicalUnit::Jar);
    map.insert("package", CanonicalUnit::Package);
    map.insert("pkg", CanonicalUnit::Package);
    map.insert("packet", CanonicalUnit::Package);
    map.insert("bunch", CanonicalUnit::Bunch);
    map.insert("bunches", CanonicalUnit::Bunch);
    map.insert("stick", CanonicalUnit::Stick);
    map.insert("bottle", CanonicalUnit::Bottle);
    map.insert("sprig", CanonicalUnit::Sprig);
    map.insert("head", CanonicalUnit::Head);
    map.insert("stalk", CanonicalUnit::Stalk);
    map.insert("handful", CanonicalUnit::Handful);
    map.insert("bag", CanonicalUnit::Bag);
    map.insert("box", CanonicalUnit::Box);
    map.insert("boxes", CanonicalUnit::Box);
    map.insert("drop", CanonicalUnit::Drop);

    map
});

impl CanonicalUnit {
    /// Stable short code used in storage and display
    pub const fn code(self) -> &'static str {
        match self {
            CanonicalUnit::Teaspoon => "tsp",
            CanonicalUnit::Tablespoon => "tbsp",
            CanonicalUnit::FluidOunce => "fl-oz",
            CanonicalUnit::Cup => "cup",
            CanonicalUnit::Pint => "pint",
            CanonicalUnit::Quart => "quart",
            CanonicalUnit::Gallon => "gallon",
            CanonicalUnit::Milliliter => "ml",
            CanonicalUnit::Centiliter => "cl",
            CanonicalUnit::Deciliter => "dl",
            CanonicalUnit::Liter => "l",
            CanonicalUnit::Milligram => "mg",
            CanonicalUnit::Gram => "g",
            CanonicalUnit::Kilogram => "kg",
            CanonicalUnit::Ounce => "oz",
            CanonicalUnit::Pound => "lb",
            CanonicalUnit::Each => "each",
            CanonicalUnit::Clove => "clove",
            CanonicalUnit::Slice => "slice",
            CanonicalUnit::Pinch => "pinch",
            CanonicalUnit::Dash => "dash",
            CanonicalUnit::Can => "can",
            CanonicalUnit::Jar => "jar",
            CanonicalUnit::Package => "package",
            CanonicalUnit::Bunch => "bunch",
            CanonicalUnit::Stick => "stick",
            CanonicalUnit::Bottle => "bottle",
            CanonicalUnit::Sprig => "sprig",
            CanonicalUnit::Head => "head",
            CanonicalUnit::Stalk => "stalk",
            CanonicalUnit::Handful => "handful",
            CanonicalUnit::Bag => "bag",
            CanonicalUnit::Box => "box",
            CanonicalUnit::Drop => "drop",
        }
    }

    /// Physical dimension of this unit
    pub const fn dimension(self) -> Dimension {
        match self {
            CanonicalUnit::Teaspoon
            | CanonicalUnit::Tablespoon
            | CanonicalUnit::FluidOunce
            | CanonicalUnit::Cup
            | CanonicalUnit::Pint
            | CanonicalUnit::Quart
            | CanonicalUnit::Gallon
            | CanonicalUnit::Milliliter
            | CanonicalUnit::Centiliter
            | CanonicalUnit::Deciliter
            | CanonicalUnit::Liter => Dimension::Volume,
            CanonicalUnit::Milligram
            | CanonicalUnit::Gram
            | CanonicalUnit::Kilogram
            | CanonicalUnit::Ounce
            | CanonicalUnit::Pound => Dimension::Mass,
            _ => Dimension::Count,
        }
    }

    /// Factor to the dimension's base unit (ml for volume, g for mass).
    /// Count-like units have no factor.
    pub const fn base_factor(self) -> Option<f64> {
        match self {
            CanonicalUnit::Teaspoon => Some(4.928_921_593_75),
            CanonicalUnit::Tablespoon => Some(14.786_764_781_25),
            CanonicalUnit::FluidOunce => Some(29.573_529_562_5),
            CanonicalUnit::Cup => Some(236.588_236_5),
            CanonicalUnit::Pint => Some(473.176_473),
            CanonicalUnit::Quart => Some(946.352_946),
            CanonicalUnit::Gallon => Some(3_785.411_784),
            CanonicalUnit::Milliliter => Some(1.0),
            CanonicalUnit::Centiliter => Some(10.0),
            CanonicalUnit::Deciliter => Some(100.0),
            CanonicalUnit::Liter => Some(1_000.0),
            CanonicalUnit::Milligram => Some(0.001),
            CanonicalUnit::Gram => Some(1.0),
            CanonicalUnit::Kilogram => Some(1_000.0),
            CanonicalUnit::Ounce => Some(28.349_523_125),
            CanonicalUnit::Pound => Some(453.592_37),
            _ => None,
        }
    }

    /// Look up a unit spelling, case-insensitively.
    ///
    /// Accepts canonical codes, the synonyms in the mapping table, a trailing
    /// period ("tbsp.") and regular plurals ("cups", "cloves").
    pub fn lookup(unit: &str) -> Option<Self> {
        let unit = unit.trim().to_lowercase();
        let unit = unit.trim_end_matches('.');
        if unit.is_empty() {
            return None;
        }

        if let Some(found) = UNIT_MAPPINGS.get(unit) {
            return Some(*found);
        }

        // Try without pluralization
        if unit.len() > 1 {
            if let Some(singular) = unit.strip_suffix('s') {
                if let Some(found) = UNIT_MAPPINGS.get(singular) {
                    return Some(*found);
                }
            }
        }

        None
    }
}

impl fmt::Display for CanonicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Canonicalize a unit spelling to its canonical code.
///
/// Unknown strings pass through trimmed and lowercased.
pub fn canonicalize(unit: &str) -> String {
    match CanonicalUnit::lookup(unit) {
        Some(canonical) => canonical.code().to_string(),
        None => unit.trim().to_lowercase(),
    }
}

/// Outcome of a unit conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    /// Whether the two units were convertible
    pub ok: bool,
    /// The converted quantity, present only when `ok`
    pub qty: Option<f64>,
}

impl Conversion {
    fn converted(qty: f64) -> Self {
        Self { ok: true, qty: Some(qty) }
    }

    fn incompatible() -> Self {
        Self { ok: false, qty: None }
    }
}

/// Convert `qty` from one unit into another.
///
/// Succeeds when both units canonicalize to the same volume or mass dimension,
/// or when they canonicalize to the same unit. Anything else, count-like units
/// included, is reported as `ok: false`.
pub fn convert(qty: f64, from_unit: &str, to_unit: &str) -> Conversion {
    let (Some(from), Some(to)) = (CanonicalUnit::lookup(from_unit), CanonicalUnit::lookup(to_unit))
    else {
        return Conversion::incompatible();
    };

    if from == to {
        return Conversion::converted(qty);
    }
    if from.dimension() != to.dimension() {
        return Conversion::incompatible();
    }

    match (from.base_factor(), to.base_factor()) {
        (Some(from_factor), Some(to_factor)) => {
            Conversion::converted(qty * from_factor / to_factor)
        }
        _ => Conversion::incompatible(),
    }
}

/// Whether two unit spellings may be converted into one another
pub fn compatible(a: &str, b: &str) -> bool {
    convert(1.0, a, b).ok
}
