//! # Shopping-List Data Model
//!
//! Data structures flowing through a shopping-list build:
//!
//! - **IngredientLine**: one stored ingredient statement of a recipe (input)
//! - **AggregatedItem**: the merged purchase line for one canonical ingredient
//! - **ShoppingGroup**: items assigned to one store
//! - **PantryDeduction** / **PantryWarning**: pantry report rows
//! - **ShoppingList**: the response handed to the caller
//!
//! Everything except `IngredientLine` and `PantryStock` is derived and rebuilt
//! on every build.

use crate::units::canonicalize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance key of an ingredient line: recipe id and line index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId {
    #[serde(rename = "rid")]
    pub recipe_id: i64,
    #[serde(rename = "idx")]
    pub line_index: i64,
}

impl SourceId {
    pub fn new(recipe_id: i64, line_index: i64) -> Self {
        Self { recipe_id, line_index }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.recipe_id, self.line_index)
    }
}

/// A stored ingredient statement belonging to a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub recipe_id: i64,
    pub line_index: i64,
    /// Original free text; never rewritten after capture
    pub raw_text: String,
    /// Extracted ingredient name, lowercased
    pub name: String,
    pub qty_num: Option<f64>,
    /// Quantity and unit as shown when no numeric merge is possible
    pub qty_text: String,
    /// Canonical unit code, or empty
    pub unit: String,
    pub category: String,
    /// Assigned store; empty means unassigned
    pub store_id: String,
}

impl IngredientLine {
    /// Create a line with just a name; quantities, category and store are empty
    pub fn new(recipe_id: i64, line_index: i64, name: &str) -> Self {
        Self {
            recipe_id,
            line_index,
            raw_text: name.to_string(),
            name: name.to_lowercase(),
            qty_num: None,
            qty_text: String::new(),
            unit: String::new(),
            category: String::new(),
            store_id: String::new(),
        }
    }

    /// Set the numeric quantity and unit; the display text is derived from them
    pub fn with_quantity(mut self, qty: f64, unit: &str) -> Self {
        self.qty_num = Some(qty);
        self.unit = unit.to_string();
        self.qty_text = format_quantity(qty, unit);
        self
    }

    /// Set a textual quantity that has no numeric value ("to taste", "a knob")
    pub fn with_qty_text(mut self, text: &str) -> Self {
        self.qty_text = text.to_string();
        self
    }

    pub fn with_raw_text(mut self, raw: &str) -> Self {
        self.raw_text = raw.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_store(mut self, store_id: &str) -> Self {
        self.store_id = store_id.to_string();
        self
    }

    pub fn source_id(&self) -> SourceId {
        SourceId::new(self.recipe_id, self.line_index)
    }
}

/// Merged purchase line for one canonical ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedItem {
    /// Grouping identity
    pub canonical_key: String,
    /// First-seen name, used for presentation
    pub display_title: String,
    /// Every name folded into this item, in input order
    pub original_names: Vec<String>,
    pub qty_num: Option<f64>,
    pub qty_text: String,
    pub unit: String,
    pub category: String,
    pub store_id: String,
    /// First-seen raw ingredient statement
    pub example: String,
    /// Every contributing line, in input order
    pub source_ids: Vec<SourceId>,
    pub is_merged: bool,
    pub count: usize,
    pub from_pantry: bool,
    pub partial_pantry: bool,
    /// Set once an incompatible merge happened; the quantity stays textual
    #[serde(skip)]
    pub(crate) text_only: bool,
    /// Textual quantities without a number, kept next to a numeric total
    #[serde(skip)]
    pub(crate) loose_text: Vec<String>,
}

impl AggregatedItem {
    /// Seed an item from the first line of its group
    pub fn from_line(canonical_key: &str, legacy_key: &str, line: &IngredientLine) -> Self {
        Self {
            canonical_key: canonical_key.to_string(),
            display_title: legacy_key.to_string(),
            original_names: vec![line.name.clone()],
            qty_num: line.qty_num,
            qty_text: line.qty_text.clone(),
            unit: canonicalize(&line.unit),
            category: line.category.clone(),
            store_id: line.store_id.clone(),
            example: line.raw_text.clone(),
            source_ids: vec![line.source_id()],
            is_merged: false,
            count: 1,
            from_pantry: false,
            partial_pantry: false,
            text_only: false,
            loose_text: Vec::new(),
        }
    }

    /// Whether the item carries a single numeric quantity
    pub fn is_numeric(&self) -> bool {
        self.qty_num.is_some()
    }
}

/// Store-specific slice of the shopping list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingGroup {
    #[serde(rename = "StoreId")]
    pub store_id: String,
    #[serde(rename = "Items")]
    pub items: Vec<ShoppingItem>,
}

impl ShoppingGroup {
    /// Whether this is the group of items without an assigned store
    pub fn is_unassigned(&self) -> bool {
        self.store_id.is_empty()
    }
}

/// Display row of the shopping list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShoppingItem {
    pub category: String,
    pub ingredient_norm: String,
    pub qty_num: Option<f64>,
    pub qty_text: String,
    pub unit: String,
    pub examples: String,
    pub is_merged: bool,
    pub original_names: Vec<String>,
    pub source_ids: Vec<SourceId>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_pantry: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial_pantry: bool,
}

impl From<AggregatedItem> for ShoppingItem {
    fn from(item: AggregatedItem) -> Self {
        Self {
            category: item.category,
            ingredient_norm: item.display_title,
            qty_num: item.qty_num,
            qty_text: item.qty_text,
            unit: item.unit,
            examples: item.example,
            is_merged: item.is_merged,
            original_names: item.original_names,
            source_ids: item.source_ids,
            count: item.count,
            from_pantry: item.from_pantry,
            partial_pantry: item.partial_pantry,
        }
    }
}

/// A stored pantry row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryStock {
    pub name: String,
    pub qty_num: f64,
    pub unit: String,
    /// Zero disables low-stock warnings for this row
    pub low_stock_threshold: f64,
}

impl PantryStock {
    pub fn new(name: &str, qty_num: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            qty_num,
            unit: unit.to_string(),
            low_stock_threshold: 0.0,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }
}

/// One ingredient that pantry stock covered, fully or partly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryDeduction {
    pub ingredient: String,
    pub deducted: f64,
    pub unit: String,
    pub original_qty: f64,
}

/// A pantry row at or below its low-stock threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryWarning {
    pub name: String,
    pub current: f64,
    pub threshold: f64,
    pub unit: String,
    pub message: String,
}

/// Response of a shopping-list build
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub groups: Vec<ShoppingGroup>,
    pub pantry_deductions: Vec<PantryDeduction>,
    pub pantry_warnings: Vec<PantryWarning>,
    pub deductions_applied: bool,
}

impl ShoppingList {
    /// Number of purchase rows across all groups
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    /// Find the group of a store; `""` is the unassigned group
    pub fn group(&self, store_id: &str) -> Option<&ShoppingGroup> {
        self.groups.iter().find(|g| g.store_id == store_id)
    }
}

/// Format a number for display: integers without decimals, otherwise at most
/// two decimals with trailing zeros removed.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Format a quantity and unit ("3 cup", "1.5 g", or just "2" without a unit)
pub fn format_quantity(value: f64, unit: &str) -> String {
    let number = format_number(value);
    if unit.is_empty() {
        number
    } else {
        format!("{number} {unit}")
    }
}
