//! # Error Types Module
//!
//! Errors reported to the caller of a shopping-list operation. Messy recipe
//! data never produces one of these: unreadable quantities and incompatible
//! units degrade inside the aggregation instead.

use crate::localization::{t, t_args};
use chrono::NaiveDate;

/// Errors surfaced by shopping-list operations
#[derive(Debug, Clone, PartialEq)]
pub enum ShoppingListError {
    /// The request did not carry both ends of the date range
    MissingDateRange,
    /// The end of the date range precedes its start
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    /// A correction asked to rename lines to an empty name
    EmptyName,
    /// A correction named no ingredient lines
    NoSourceIds,
    /// A pantry amount that is zero, negative or not a number
    InvalidQuantity(f64),
    /// Configuration could not be read
    Config(String),
    /// The store failed; nothing from the failed operation was kept
    Storage(String),
}

impl std::fmt::Display for ShoppingListError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShoppingListError::MissingDateRange => write!(f, "{}", t("error-missing-range")),
            ShoppingListError::InvalidDateRange { start, end } => write!(
                f,
                "{}",
                t_args(
                    "error-invalid-range",
                    &[("start", start.to_string().as_str()), ("end", end.to_string().as_str())]
                )
            ),
            ShoppingListError::EmptyName => write!(f, "{}", t("error-empty-name")),
            ShoppingListError::NoSourceIds => write!(f, "{}", t("error-no-sources")),
            ShoppingListError::InvalidQuantity(qty) => write!(
                f,
                "{}",
                t_args("error-invalid-quantity", &[("qty", qty.to_string().as_str())])
            ),
            ShoppingListError::Config(msg) => write!(f, "Configuration error: {msg}"),
            ShoppingListError::Storage(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl std::error::Error for ShoppingListError {}

impl From<anyhow::Error> for ShoppingListError {
    fn from(err: anyhow::Error) -> Self {
        ShoppingListError::Storage(format!("{err:#}"))
    }
}

impl From<sqlx::Error> for ShoppingListError {
    fn from(err: sqlx::Error) -> Self {
        ShoppingListError::Storage(err.to_string())
    }
}

/// Result type alias for shopping-list operations
pub type ShoppingListResult<T> = Result<T, ShoppingListError>;
