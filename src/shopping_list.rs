//! # Shopping List Service
//!
//! Builds the shopping list for a planner date range and applies the
//! corrections a user makes from it. Pantry writes happen inside one
//! transaction that holds the database write lock from its first read, so two
//! builds never deduct the same stock, even from separate processes, and a
//! failed build leaves the pantry untouched. An in-process lock keeps builds of
//! one service from queueing on the database.

use crate::aggregation::aggregate;
use crate::db;
use crate::errors::{ShoppingListError, ShoppingListResult};
use crate::ingredient_model::{ShoppingList, SourceId};
use crate::pantry::{deduct, low_stock_warnings};
use crate::store_grouping::build_response;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Parameters of a shopping-list build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListRequest {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Overrides the configured default when set
    pub apply_pantry: Option<bool>,
}

impl ShoppingListRequest {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            apply_pantry: None,
        }
    }

    pub fn with_pantry(mut self, apply: bool) -> Self {
        self.apply_pantry = Some(apply);
        self
    }

    fn date_range(&self) -> ShoppingListResult<(NaiveDate, NaiveDate)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if end < start => {
                Err(ShoppingListError::InvalidDateRange { start, end })
            }
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(ShoppingListError::MissingDateRange),
        }
    }
}

/// Correction command: rename the ingredient of the listed lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelabelRequest {
    pub new_name: String,
    pub source_ids: Vec<SourceId>,
}

/// Correction command: move the listed lines to a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignStoreRequest {
    pub store_id: String,
    #[serde(default)]
    pub category: Option<String>,
    pub source_ids: Vec<SourceId>,
}

pub struct ShoppingListService {
    pool: SqlitePool,
    apply_pantry_by_default: bool,
    deduction_lock: Mutex<()>,
}

impl ShoppingListService {
    pub fn new(pool: SqlitePool, apply_pantry_by_default: bool) -> Self {
        Self {
            pool,
            apply_pantry_by_default,
            deduction_lock: Mutex::new(()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Build the shopping list for the recipes planned in the request's range.
    ///
    /// When pantry deduction applies, the pantry is read, deducted and written
    /// back in one transaction; any failure rolls every pantry write back.
    pub async fn build(&self, request: &ShoppingListRequest) -> ShoppingListResult<ShoppingList> {
        let (start, end) = request.date_range()?;
        let apply_pantry = request.apply_pantry.unwrap_or(self.apply_pantry_by_default);

        let recipe_ids = db::recipe_ids_in_range(&self.pool, start, end).await?;
        let lines = db::fetch_ingredient_lines(&self.pool, &recipe_ids).await?;
        let aggregation = aggregate(&lines);
        debug!(
            lines = lines.len(),
            items = aggregation.len(),
            "Ingredient lines aggregated"
        );
        let items = aggregation.into_items();

        if !apply_pantry {
            let stock = db::load_pantry(&self.pool).await?;
            let list = build_response(items, Vec::new(), low_stock_warnings(&stock), false);
            info!(
                start = %start,
                end = %end,
                items = list.item_count(),
                "Shopping list built without pantry"
            );
            return Ok(list);
        }

        let _guard = self.deduction_lock.lock().await;
        let mut tx = db::begin_write(&self.pool).await?;

        let mut stock = db::load_pantry(&mut *tx).await?;
        let outcome = deduct(items, &mut stock);
        for row in &outcome.changed_stock {
            db::set_pantry_quantity(&mut *tx, &row.name, row.qty_num).await?;
        }
        let warnings = low_stock_warnings(&stock);

        tx.commit().await?;

        if !warnings.is_empty() {
            warn!(count = warnings.len(), "Pantry items running low");
        }
        let list = build_response(outcome.items, outcome.deductions, warnings, true);
        info!(
            start = %start,
            end = %end,
            items = list.item_count(),
            deductions = list.pantry_deductions.len(),
            "Shopping list built"
        );
        Ok(list)
    }

    /// Rename the ingredient of every listed line. Returns the lines changed.
    pub async fn relabel(&self, request: &RelabelRequest) -> ShoppingListResult<u64> {
        let new_name = request.new_name.trim().to_lowercase();
        if new_name.is_empty() {
            return Err(ShoppingListError::EmptyName);
        }
        if request.source_ids.is_empty() {
            return Err(ShoppingListError::NoSourceIds);
        }

        Ok(db::relabel_ingredient_lines(&self.pool, &new_name, &request.source_ids).await?)
    }

    /// Assign a store, and optionally a category, to every listed line
    pub async fn assign_store(&self, request: &AssignStoreRequest) -> ShoppingListResult<u64> {
        if request.source_ids.is_empty() {
            return Err(ShoppingListError::NoSourceIds);
        }
        let category = request.category.as_deref().map(str::trim).filter(|c| !c.is_empty());

        let store_id = request.store_id.trim();
        Ok(db::assign_store(&self.pool, store_id, category, &request.source_ids).await?)
    }

    /// Put an amount back into the pantry
    pub async fn return_to_pantry(
        &self,
        name: &str,
        qty: f64,
        unit: &str,
    ) -> ShoppingListResult<()> {
        if name.trim().is_empty() {
            return Err(ShoppingListError::EmptyName);
        }
        if qty.is_nan() || qty <= 0.0 {
            return Err(ShoppingListError::InvalidQuantity(qty));
        }

        let _guard = self.deduction_lock.lock().await;
        db::return_to_pantry(&self.pool, name, qty, unit).await?;
        Ok(())
    }
}
