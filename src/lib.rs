//! # Meal Planner
//!
//! Shopping-list core of a meal planner: collects the ingredient lines of the
//! recipes planned over a date range, merges them per canonical ingredient
//! across units, covers what it can from the pantry and splits the result by
//! store.

pub mod aggregation;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingredient_model;
pub mod ingredient_parser;
pub mod localization;
pub mod measurement_patterns;
pub mod name_canonicalizer;
pub mod pantry;
pub mod shopping_list;
pub mod store_grouping;
pub mod units;
