//! # Pantry Deduction
//!
//! Covers aggregated purchase lines from on-hand stock. Works on an in-memory
//! snapshot of the pantry; the caller persists `changed_stock` in the same
//! transaction it read the snapshot in.

use crate::ingredient_model::{
    format_quantity, AggregatedItem, PantryDeduction, PantryStock, PantryWarning,
};
use crate::localization::{t, t_args};
use crate::name_canonicalizer::canonical_key;
use crate::units::{canonicalize, convert};
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// Amounts closer than this are treated as equal
const EPSILON: f64 = 1e-9;

/// Result of running the pantry over a shopping list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeductionOutcome {
    pub items: Vec<AggregatedItem>,
    pub deductions: Vec<PantryDeduction>,
    /// Stock rows whose quantity changed, in pantry order
    pub changed_stock: Vec<PantryStock>,
}

/// Deduct pantry stock from the items that need a measurable amount.
///
/// Items without a numeric quantity, without a unit, or with nothing left to
/// buy pass through unchanged, as do items whose stock unit cannot be
/// converted into the item's unit.
pub fn deduct(items: Vec<AggregatedItem>, stock: &mut [PantryStock]) -> DeductionOutcome {
    let mut index: HashMap<String, usize> = HashMap::new();
    for (position, row) in stock.iter().enumerate() {
        index.entry(canonical_key(&row.name)).or_insert(position);
    }

    let mut changed = BTreeSet::new();
    let mut deductions = Vec::new();
    let mut updated = Vec::with_capacity(items.len());

    for mut item in items {
        let Some(position) = index.get(&item.canonical_key).copied() else {
            updated.push(item);
            continue;
        };
        let required = match item.qty_num {
            Some(qty) if qty > 0.0 && !item.unit.is_empty() => qty,
            _ => {
                updated.push(item);
                continue;
            }
        };

        let row = &mut stock[position];
        let Some(taken) = take_from_stock(row, required, &item.unit) else {
            debug!(
                "Pantry row '{}' ({}) cannot cover '{}' ({})",
                row.name, row.unit, item.display_title, item.unit
            );
            updated.push(item);
            continue;
        };

        changed.insert(position);
        deductions.push(PantryDeduction {
            ingredient: item.display_title.clone(),
            deducted: taken,
            unit: item.unit.clone(),
            original_qty: required,
        });

        if taken + EPSILON >= required {
            item.qty_num = Some(0.0);
            item.qty_text = t("pantry-covered");
            item.from_pantry = true;
        } else {
            let remaining = required - taken;
            item.qty_num = Some(remaining);
            item.qty_text = t_args(
                "pantry-partial",
                &[
                    ("remaining", format_quantity(remaining, &item.unit).as_str()),
                    ("deducted", format_quantity(taken, &item.unit).as_str()),
                ],
            );
            item.partial_pantry = true;
        }
        debug!("Pantry covered {} {} of '{}'", taken, item.unit, item.display_title);
        updated.push(item);
    }

    DeductionOutcome {
        items: updated,
        deductions,
        changed_stock: changed.into_iter().map(|position| stock[position].clone()).collect(),
    }
}

/// Take up to `wanted` (expressed in `unit`) out of a stock row.
///
/// Returns the amount taken in `unit`, or `None` when the row has nothing to
/// give or its unit does not convert. The row keeps its own unit; a row that
/// is used up is set to exactly zero.
pub fn take_from_stock(row: &mut PantryStock, wanted: f64, unit: &str) -> Option<f64> {
    let unit = canonicalize(unit);
    let stock_unit = canonicalize(&row.unit);
    if row.qty_num <= 0.0 || wanted <= 0.0 {
        return None;
    }

    let same_unit = unit == stock_unit;
    let available = if same_unit {
        row.qty_num
    } else {
        convert(row.qty_num, &stock_unit, &unit).qty?
    };
    if available <= 0.0 {
        return None;
    }

    let taken = wanted.min(available);
    if taken + EPSILON >= available {
        row.qty_num = 0.0;
    } else if same_unit {
        row.qty_num = (available - taken).max(0.0);
    } else {
        let left = convert(available - taken, &unit, &stock_unit).qty?;
        row.qty_num = left.max(0.0);
    }
    Some(taken)
}

/// Rows at or below their non-zero low-stock threshold
pub fn low_stock_warnings(stock: &[PantryStock]) -> Vec<PantryWarning> {
    stock
        .iter()
        .filter(|row| row.low_stock_threshold > 0.0 && row.qty_num <= row.low_stock_threshold)
        .map(|row| PantryWarning {
            name: row.name.clone(),
            current: row.qty_num,
            threshold: row.low_stock_threshold,
            unit: row.unit.clone(),
            message: t_args(
                "pantry-low-stock",
                &[
                    ("name", row.name.as_str()),
                    ("current", format_quantity(row.qty_num, &row.unit).as_str()),
                    ("threshold", format_quantity(row.low_stock_threshold, &row.unit).as_str()),
                ],
            ),
        })
        .collect()
}
