//! # Aggregation Engine
//!
//! Folds the ingredient lines of every scheduled recipe into one purchase line
//! per canonical ingredient, merging quantities across recipes:
//!
//! - "2 cups olive oil" + "1 cup extra virgin olive oil" = "3 cup"
//! - "1 tbsp butter" + "1 cup butter" = "1.06 cup" (converted into the first unit)
//! - "1 cup garlic" + "1 clove garlic" = "1 cup + 1 clove" (no numeric total)
//!
//! Aggregation performs no I/O and never fails: unreadable or incompatible
//! quantities degrade to text.

use crate::ingredient_model::{format_quantity, AggregatedItem, IngredientLine};
use crate::name_canonicalizer::{canonical_key, legacy_key};
use crate::units::{canonicalize, convert};
use std::collections::HashMap;

/// Aggregated items keyed by canonical key, in group creation order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    items: Vec<AggregatedItem>,
    index: HashMap<String, usize>,
}

impl Aggregation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Item of a canonical key
    pub fn get(&self, canonical_key: &str) -> Option<&AggregatedItem> {
        self.index.get(canonical_key).map(|&i| &self.items[i])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in group creation order
    pub fn items(&self) -> &[AggregatedItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<AggregatedItem> {
        self.items
    }

    /// Fold one line into the aggregation. Lines without any name are skipped.
    pub fn add(&mut self, line: &IngredientLine) {
        let legacy = legacy_key(&line.name, &line.raw_text);
        if legacy.is_empty() {
            return;
        }
        let key = canonical_key(&legacy);

        match self.index.get(&key) {
            Some(&i) => merge_line(&mut self.items[i], line),
            None => {
                self.index.insert(key.clone(), self.items.len());
                self.items.push(AggregatedItem::from_line(&key, &legacy, line));
            }
        }
    }
}

/// Aggregate ingredient lines in input order
pub fn aggregate(lines: &[IngredientLine]) -> Aggregation {
    let mut aggregation = Aggregation::new();
    for line in lines {
        aggregation.add(line);
    }
    aggregation
}

/// Merge a line into an existing item. Category, store and example of the
/// item are left as first seen.
fn merge_line(cur: &mut AggregatedItem, line: &IngredientLine) {
    let cur_unit = canonicalize(&cur.unit);
    let new_unit = canonicalize(&line.unit);

    match (cur.qty_num, line.qty_num) {
        (Some(cur_qty), Some(line_qty)) if !cur_unit.is_empty() && !new_unit.is_empty() => {
            if cur_unit == new_unit {
                set_total(cur, cur_qty + line_qty, &cur_unit);
            } else {
                let converted = convert(line_qty, &new_unit, &cur_unit);
                match converted.qty {
                    Some(qty) if converted.ok => set_total(cur, cur_qty + qty, &cur_unit),
                    _ => give_up_numeric(cur, line),
                }
            }
        }
        // Unitless counts ("2 eggs" + "3 eggs")
        (Some(cur_qty), Some(line_qty)) if cur_unit.is_empty() && new_unit.is_empty() => {
            set_total(cur, cur_qty + line_qty, "");
        }
        // One side has a unit, the other does not
        (Some(_), Some(_)) => give_up_numeric(cur, line),
        (None, Some(line_qty)) if !cur.text_only => {
            if cur.qty_text.is_empty() {
                cur.qty_num = Some(line_qty);
                cur.unit = new_unit.clone();
                cur.qty_text = if line.qty_text.is_empty() {
                    format_quantity(line_qty, &new_unit)
                } else {
                    line.qty_text.clone()
                };
            } else {
                // Earlier textual amounts ride along after the total
                let earlier = std::mem::take(&mut cur.qty_text);
                cur.loose_text.push(earlier);
                set_total(cur, line_qty, &new_unit);
            }
        }
        (Some(cur_qty), None) => {
            if !line.qty_text.is_empty() {
                cur.loose_text.push(line.qty_text.clone());
                set_total(cur, cur_qty, &cur_unit);
            }
        }
        _ => append_text(cur, &line_fragment(line)),
    }

    cur.original_names.push(line.name.clone());
    cur.source_ids.push(line.source_id());
    cur.is_merged = true;
    cur.count += 1;
}

/// Set the numeric total and regenerate the display text
fn set_total(cur: &mut AggregatedItem, total: f64, unit: &str) {
    cur.qty_num = Some(total);
    cur.unit = unit.to_string();
    let mut text = format_quantity(total, unit);
    for fragment in &cur.loose_text {
        text.push_str(" + ");
        text.push_str(fragment);
    }
    cur.qty_text = text;
}

/// Incompatible merge: the item keeps a textual quantity from now on
fn give_up_numeric(cur: &mut AggregatedItem, line: &IngredientLine) {
    if cur.qty_text.is_empty() {
        if let Some(qty) = cur.qty_num {
            cur.qty_text = format_quantity(qty, &cur.unit);
        }
    }
    append_text(cur, &line_fragment(line));
    cur.qty_num = None;
    cur.text_only = true;
}

fn append_text(cur: &mut AggregatedItem, fragment: &str) {
    if fragment.is_empty() {
        return;
    }
    if cur.qty_text.is_empty() {
        cur.qty_text = fragment.to_string();
    } else {
        cur.qty_text = format!("{} + {}", cur.qty_text, fragment);
    }
}

/// Quantity text of a line, formatted from its number when no text was stored
fn line_fragment(line: &IngredientLine) -> String {
    if !line.qty_text.is_empty() {
        return line.qty_text.clone();
    }
    match line.qty_num {
        Some(qty) => format_quantity(qty, &canonicalize(&line.unit)),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingredient_model::SourceId;

    fn line(recipe_id: i64, idx: i64, name: &str, qty: f64, unit: &str) -> IngredientLine {
        IngredientLine::new(recipe_id, idx, name).with_quantity(qty, unit)
    }

    #[test]
    fn test_olive_oil_scenario() {
        let lines = vec![
            line(1, 0, "olive oil", 2.0, "cup"),
            line(2, 0, "extra virgin olive oil", 1.0, "cup"),
        ];

        let aggregation = aggregate(&lines);
        assert_eq!(aggregation.len(), 1);

        let item = aggregation.get("olive oil").unwrap();
        assert_eq!(item.qty_num, Some(3.0));
        assert_eq!(item.unit, "cup");
        assert_eq!(item.qty_text, "3 cup");
        assert!(item.is_merged);
        assert_eq!(item.count, 2);
        assert_eq!(item.source_ids, vec![SourceId::new(1, 0), SourceId::new(2, 0)]);
        assert_eq!(item.original_names, vec!["olive oil", "extra virgin olive oil"]);
        assert_eq!(item.display_title, "olive oil");
    }

    #[test]
    fn test_same_unit_merge_is_order_independent() {
        let a = line(1, 0, "flour", 1.0, "cup");
        let b = line(2, 3, "flour", 1.0, "cups");

        let forward = aggregate(&[a.clone(), b.clone()]);
        let backward = aggregate(&[b, a]);

        let f = forward.get("flour").unwrap();
        let r = backward.get("flour").unwrap();
        assert_eq!(f.qty_num, Some(2.0));
        assert_eq!(r.qty_num, Some(2.0));
        assert_eq!(f.unit, "cup");
        assert_eq!(r.unit, "cup");
        assert_eq!(f.source_ids[0], SourceId::new(1, 0));
        assert_eq!(r.source_ids[0], SourceId::new(2, 3));
    }

    #[test]
    fn test_compatible_units_convert_into_group_unit() {
        let lines = vec![line(1, 0, "butter", 1.0, "cup"), line(2, 0, "butter", 16.0, "tbsp")];

        let item = aggregate(&lines).get("butter").cloned().unwrap();
        assert!((item.qty_num.unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(item.unit, "cup");
        assert_eq!(item.qty_text, "2 cup");
    }

    #[test]
    fn test_incompatible_units_fall_back_to_text() {
        let lines = vec![line(1, 0, "garlic", 1.0, "cup"), line(2, 0, "garlic", 1.0, "clove")];

        let item = aggregate(&lines).get("garlic").cloned().unwrap();
        assert_eq!(item.qty_num, None);
        assert_eq!(item.qty_text, "1 cup + 1 clove");
        assert_eq!(item.count, 2);
    }

    #[test]
    fn test_text_only_is_permanent() {
        let lines = vec![
            line(1, 0, "garlic", 1.0, "cup"),
            line(2, 0, "garlic", 2.0, "clove"),
            line(3, 0, "garlic", 1.0, "cup"),
        ];

        let item = aggregate(&lines).get("garlic").cloned().unwrap();
        assert_eq!(item.qty_num, None);
        assert_eq!(item.qty_text, "1 cup + 2 clove + 1 cup");
    }

    #[test]
    fn test_numeric_line_recovers_unparsed_first_line() {
        let lines = vec![
            IngredientLine::new(1, 0, "sugar").with_qty_text("a handful"),
            line(2, 0, "sugar", 100.0, "g"),
        ];

        let item = aggregate(&lines).get("sugar").cloned().unwrap();
        assert_eq!(item.qty_num, Some(100.0));
        assert_eq!(item.unit, "g");
        assert_eq!(item.qty_text, "100 g + a handful");
    }

    #[test]
    fn test_numeric_line_keeps_earlier_text_through_later_sums() {
        let lines = vec![
            IngredientLine::new(1, 0, "sugar").with_qty_text("a handful"),
            line(2, 0, "sugar", 100.0, "g"),
            line(3, 0, "sugar", 50.0, "g"),
        ];

        let item = aggregate(&lines).get("sugar").cloned().unwrap();
        assert_eq!(item.qty_num, Some(150.0));
        assert_eq!(item.qty_text, "150 g + a handful");
        assert_eq!(item.count, 3);
    }

    #[test]
    fn test_numeric_line_recovers_line_without_amount() {
        let lines = vec![IngredientLine::new(1, 0, "sugar"), line(2, 0, "sugar", 100.0, "g")];

        let item = aggregate(&lines).get("sugar").cloned().unwrap();
        assert_eq!(item.qty_num, Some(100.0));
        assert_eq!(item.qty_text, "100 g");
    }

    #[test]
    fn test_textual_quantities_concatenate() {
        let lines = vec![
            IngredientLine::new(1, 0, "salt").with_qty_text("to taste"),
            IngredientLine::new(2, 0, "salt").with_qty_text("a pinch"),
        ];

        let item = aggregate(&lines).get("salt").cloned().unwrap();
        assert_eq!(item.qty_num, None);
        assert_eq!(item.qty_text, "to taste + a pinch");
    }

    #[test]
    fn test_loose_text_survives_later_sums() {
        let lines = vec![
            line(1, 0, "salt", 1.0, "tsp"),
            IngredientLine::new(2, 0, "salt").with_qty_text("to taste"),
            line(3, 0, "salt", 1.0, "tsp"),
        ];

        let item = aggregate(&lines).get("salt").cloned().unwrap();
        assert_eq!(item.qty_num, Some(2.0));
        assert_eq!(item.qty_text, "2 tsp + to taste");
    }

    #[test]
    fn test_unitless_counts_sum() {
        let lines = vec![line(1, 0, "eggs", 2.0, ""), line(2, 0, "egg", 3.0, "")];

        let item = aggregate(&lines).get("egg").cloned().unwrap();
        assert_eq!(item.qty_num, Some(5.0));
        assert_eq!(item.qty_text, "5");
    }

    #[test]
    fn test_first_seen_category_and_store_win() {
        let lines = vec![
            line(1, 0, "milk", 1.0, "cup").with_category("dairy").with_store("grocer"),
            line(2, 0, "milk", 1.0, "cup").with_category("drinks").with_store("market"),
        ];

        let item = aggregate(&lines).get("milk").cloned().unwrap();
        assert_eq!(item.category, "dairy");
        assert_eq!(item.store_id, "grocer");
    }

    #[test]
    fn test_empty_names_are_skipped() {
        let mut blank = IngredientLine::new(1, 0, "   ");
        blank.raw_text = "  ".to_string();
        let lines = vec![blank, line(1, 1, "rice", 1.0, "cup")];

        let aggregation = aggregate(&lines);
        assert_eq!(aggregation.len(), 1);
        assert!(aggregation.get("rice").is_some());
    }

    #[test]
    fn test_provenance_matches_count() {
        let lines: Vec<IngredientLine> = (0..5).map(|i| line(i, i, "onion", 1.0, "each")).collect();

        let item = aggregate(&lines).get("onion").cloned().unwrap();
        assert_eq!(item.count, 5);
        assert_eq!(item.source_ids.len(), item.count);
        assert_eq!(item.qty_num, Some(5.0));
    }

    #[test]
    fn test_group_creation_order_is_kept() {
        let lines = vec![
            line(1, 0, "rice", 1.0, "cup"),
            line(1, 1, "beans", 1.0, "can"),
            line(2, 0, "rice", 1.0, "cup"),
        ];

        let aggregation = aggregate(&lines);
        let keys: Vec<&str> = aggregation
            .items()
            .iter()
            .map(|i| i.canonical_key.as_str())
            .collect();
        assert_eq!(keys, vec!["rice", "bean"]);
    }
}
