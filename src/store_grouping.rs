//! # Store Grouping & Output Builder
//!
//! Splits the final purchase lines by assigned store and assembles the
//! response of a shopping-list build.

use crate::ingredient_model::{
    AggregatedItem, PantryDeduction, PantryWarning, ShoppingGroup, ShoppingItem, ShoppingList,
};
use crate::localization::{t, t_args};
use std::collections::HashMap;

/// Partition items by store id. Groups appear in the order their first item
/// appears; items keep their incoming order. The empty store id is its own
/// group.
pub fn group(items: Vec<AggregatedItem>) -> Vec<ShoppingGroup> {
    let mut groups: Vec<ShoppingGroup> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in items {
        let position = match positions.get(&item.store_id) {
            Some(position) => *position,
            None => {
                groups.push(ShoppingGroup {
                    store_id: item.store_id.clone(),
                    items: Vec::new(),
                });
                positions.insert(item.store_id.clone(), groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[position].items.push(ShoppingItem::from(item));
    }

    groups
}

/// Assemble the response of a build
pub fn build_response(
    items: Vec<AggregatedItem>,
    pantry_deductions: Vec<PantryDeduction>,
    pantry_warnings: Vec<PantryWarning>,
    deductions_applied: bool,
) -> ShoppingList {
    ShoppingList {
        groups: group(items),
        pantry_deductions,
        pantry_warnings,
        deductions_applied,
    }
}

/// Heading shown above a group, e.g. "costco (3 items)" or "Unassigned (1 items)"
pub fn group_heading(group: &ShoppingGroup) -> String {
    let store = if group.is_unassigned() {
        t("group-unassigned")
    } else {
        group.store_id.clone()
    };
    t_args(
        "group-heading",
        &[("store", store.as_str()), ("count", group.items.len().to_string().as_str())],
    )
}
