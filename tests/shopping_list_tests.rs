//! # Shopping List Integration Tests
//!
//! Builds shopping lists end to end against SQLite: recipes are stored through
//! the parser, planned on dates, aggregated, deducted from the pantry and
//! grouped by store.

use anyhow::Result;
use chrono::NaiveDate;
use mealplanner::db::*;
use mealplanner::errors::ShoppingListError;
use mealplanner::ingredient_model::{PantryStock, SourceId};
use mealplanner::shopping_list::{
    AssignStoreRequest, RelabelRequest, ShoppingListRequest, ShoppingListService,
};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
}

fn week() -> ShoppingListRequest {
    ShoppingListRequest::new(day(1), day(7))
}

async fn setup_test_db() -> Result<SqlitePool> {
    let pool = connect("sqlite::memory:", 1).await?;
    init_database_schema(&pool).await?;
    Ok(pool)
}

/// Store a recipe from free-text lines and plan it on a day
async fn planned_recipe(
    pool: &SqlitePool,
    title: &str,
    date: NaiveDate,
    lines: &[&str],
) -> Result<i64> {
    let recipe_id = add_recipe(pool, title).await?;
    for line in lines {
        add_recipe_ingredient(pool, recipe_id, line, "", "").await?;
    }
    schedule_meal(pool, date, recipe_id).await?;
    Ok(recipe_id)
}

#[tokio::test]
async fn test_olive_oil_merges_across_recipes() -> Result<()> {
    let pool = setup_test_db().await?;
    let salad = planned_recipe(&pool, "Salad", day(2), &["1 cup olive oil"]).await?;
    let pasta = planned_recipe(&pool, "Pasta", day(3), &["2 cups extra-virgin olive oil"]).await?;
    let service = ShoppingListService::new(pool, true);

    let list = service.build(&week()).await?;

    assert_eq!(list.groups.len(), 1);
    let group = list.group("").unwrap();
    assert_eq!(group.items.len(), 1);
    let item = &group.items[0];
    assert_eq!(item.qty_num, Some(3.0));
    assert_eq!(item.unit, "cup");
    assert!(item.is_merged);
    assert_eq!(item.count, 2);
    assert_eq!(item.source_ids, vec![SourceId::new(salad, 0), SourceId::new(pasta, 0)]);
    assert_eq!(item.original_names, vec!["olive oil", "extra-virgin olive oil"]);
    assert_eq!(item.examples, "1 cup olive oil");
    Ok(())
}

#[tokio::test]
async fn test_meals_outside_range_are_ignored() -> Result<()> {
    let pool = setup_test_db().await?;
    planned_recipe(&pool, "Soup", day(2), &["2 carrots"]).await?;
    planned_recipe(&pool, "Stew", day(20), &["3 carrots", "1 lb beef"]).await?;
    let service = ShoppingListService::new(pool, false);

    let list = service.build(&week()).await?;

    assert_eq!(list.item_count(), 1);
    assert_eq!(list.groups[0].items[0].qty_num, Some(2.0));
    Ok(())
}

#[tokio::test]
async fn test_recipe_planned_twice_contributes_once() -> Result<()> {
    let pool = setup_test_db().await?;
    let soup = planned_recipe(&pool, "Soup", day(2), &["2 carrots"]).await?;
    schedule_meal(&pool, day(5), soup).await?;
    let service = ShoppingListService::new(pool, false);

    let list = service.build(&week()).await?;

    let item = &list.groups[0].items[0];
    assert_eq!(item.count, 1);
    assert_eq!(item.qty_num, Some(2.0));
    Ok(())
}

#[tokio::test]
async fn test_incompatible_units_fall_back_to_text() -> Result<()> {
    let pool = setup_test_db().await?;
    planned_recipe(&pool, "Roast", day(1), &["3 cloves garlic, minced"]).await?;
    planned_recipe(&pool, "Dip", day(2), &["1 tbsp garlic"]).await?;
    let service = ShoppingListService::new(pool, false);

    let list = service.build(&week()).await?;

    let item = &list.groups[0].items[0];
    assert_eq!(item.qty_num, None);
    assert_eq!(item.qty_text, "3 cloves + 1 tbsp");
    assert_eq!(item.count, 2);
    Ok(())
}

#[tokio::test]
async fn test_pantry_full_coverage_is_persisted() -> Result<()> {
    let pool = setup_test_db().await?;
    planned_recipe(&pool, "Bread", day(1), &["300 g flour"]).await?;
    upsert_pantry_item(&pool, &PantryStock::new("flour", 500.0, "g")).await?;
    let service = ShoppingListService::new(pool, true);

    let list = service.build(&week()).await?;

    let item = &list.groups[0].items[0];
    assert_eq!(item.qty_num, Some(0.0));
    assert_eq!(item.qty_text, "✓ From Pantry");
    assert!(item.from_pantry);
    assert!(list.deductions_applied);
    assert_eq!(list.pantry_deductions.len(), 1);
    assert_eq!(list.pantry_deductions[0].deducted, 300.0);
    assert_eq!(list.pantry_deductions[0].original_qty, 300.0);

    let stock = load_pantry(service.pool()).await?;
    assert_eq!(stock[0].qty_num, 200.0);
    Ok(())
}

#[tokio::test]
async fn test_pantry_partial_coverage_is_persisted() -> Result<()> {
    let pool = setup_test_db().await?;
    planned_recipe(&pool, "Bread", day(1), &["300 g flour"]).await?;
    upsert_pantry_item(&pool, &PantryStock::new("flour", 100.0, "g").with_threshold(50.0)).await?;
    let service = ShoppingListService::new(pool, true);

    let list = service.build(&week()).await?;

    let item = &list.groups[0].items[0];
    assert_eq!(item.qty_num, Some(200.0));
    assert!(item.partial_pantry);
    assert_eq!(item.qty_text, "200 g (100 g from pantry)");
    assert_eq!(load_pantry(service.pool()).await?[0].qty_num, 0.0);

    // the emptied row is now below its threshold
    assert_eq!(list.pantry_warnings.len(), 1);
    assert_eq!(list.pantry_warnings[0].name, "flour");
    Ok(())
}

#[tokio::test]
async fn test_build_without_pantry_leaves_stock_alone() -> Result<()> {
    let pool = setup_test_db().await?;
    planned_recipe(&pool, "Bread", day(1), &["300 g flour"]).await?;
    upsert_pantry_item(&pool, &PantryStock::new("flour", 500.0, "g")).await?;
    upsert_pantry_item(&pool, &PantryStock::new("yeast", 5.0, "g").with_threshold(10.0)).await?;
    let service = ShoppingListService::new(pool, true);

    let list = service.build(&week().with_pantry(false)).await?;

    assert!(!list.deductions_applied);
    assert!(list.pantry_deductions.is_empty());
    assert_eq!(list.groups[0].items[0].qty_num, Some(300.0));
    assert_eq!(load_pantry(service.pool()).await?[0].qty_num, 500.0);
    // warnings cover the whole pantry, not just listed ingredients
    assert_eq!(list.pantry_warnings.len(), 1);
    assert_eq!(list.pantry_warnings[0].name, "yeast");
    Ok(())
}

#[tokio::test]
async fn test_failed_pantry_write_rolls_back_every_deduction() -> Result<()> {
    let pool = setup_test_db().await?;
    planned_recipe(&pool, "Risotto", day(1), &["100 g flour", "200 g rice"]).await?;
    upsert_pantry_item(&pool, &PantryStock::new("flour", 500.0, "g")).await?;
    upsert_pantry_item(&pool, &PantryStock::new("rice", 500.0, "g")).await?;
    sqlx::query(
        "CREATE TRIGGER refuse_rice BEFORE UPDATE ON pantry_items
         WHEN NEW.name = 'rice'
         BEGIN SELECT RAISE(ABORT, 'pantry write refused'); END",
    )
    .execute(&pool)
    .await?;
    let service = ShoppingListService::new(pool, true);

    let err = service.build(&week()).await.unwrap_err();

    assert!(matches!(err, ShoppingListError::Storage(_)));
    let stock = load_pantry(service.pool()).await?;
    assert_eq!(stock[0].qty_num, 500.0);
    assert_eq!(stock[1].qty_num, 500.0);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_builds_do_not_double_deduct() -> Result<()> {
    let pool = setup_test_db().await?;
    planned_recipe(&pool, "Bread", day(1), &["300 g flour"]).await?;
    upsert_pantry_item(&pool, &PantryStock::new("flour", 500.0, "g")).await?;
    let service = Arc::new(ShoppingListService::new(pool, true));

    let (first, second) = tokio::join!(
        {
            let service = Arc::clone(&service);
            async move { service.build(&week()).await }
        },
        {
            let service = Arc::clone(&service);
            async move { service.build(&week()).await }
        }
    );
    let (first, second) = (first?, second?);

    let deducted: f64 = [&first, &second]
        .iter()
        .flat_map(|list| list.pantry_deductions.iter())
        .map(|d| d.deducted)
        .sum();
    assert_eq!(deducted, 500.0);

    let covered = [&first, &second]
        .iter()
        .filter(|list| list.groups[0].items[0].from_pantry)
        .count();
    assert_eq!(covered, 1);
    assert_eq!(load_pantry(service.pool()).await?[0].qty_num, 0.0);
    Ok(())
}

#[tokio::test]
async fn test_store_groups_and_unassigned() -> Result<()> {
    let pool = setup_test_db().await?;
    let recipe_id = add_recipe(&pool, "Tacos").await?;
    add_recipe_ingredient(&pool, recipe_id, "1 lb ground beef", "meat", "butcher").await?;
    add_recipe_ingredient(&pool, recipe_id, "salt, to taste", "", "").await?;
    add_recipe_ingredient(&pool, recipe_id, "8 tortillas", "bakery", "butcher").await?;
    schedule_meal(&pool, day(4), recipe_id).await?;
    let service = ShoppingListService::new(pool, false);

    let list = service.build(&week()).await?;

    let stores: Vec<&str> = list.groups.iter().map(|g| g.store_id.as_str()).collect();
    assert_eq!(stores, vec!["butcher", ""]);
    let butcher: Vec<&str> = list.groups[0]
        .items
        .iter()
        .map(|i| i.ingredient_norm.as_str())
        .collect();
    assert_eq!(butcher, vec!["ground beef", "tortillas"]);
    let unassigned = list.group("").unwrap();
    assert!(unassigned.is_unassigned());
    assert_eq!(unassigned.items[0].ingredient_norm, "salt");
    assert_eq!(unassigned.items[0].qty_text, "to taste");
    Ok(())
}

#[tokio::test]
async fn test_relabel_regroups_lines() -> Result<()> {
    let pool = setup_test_db().await?;
    let soup = planned_recipe(&pool, "Soup", day(1), &["2 scallions"]).await?;
    let salad = planned_recipe(&pool, "Salad", day(2), &["3 green onions"]).await?;
    let curry = planned_recipe(&pool, "Curry", day(3), &["1 shallot"]).await?;
    let service = ShoppingListService::new(pool, false);

    // aliases already fold scallions into green onion
    assert_eq!(service.build(&week()).await?.item_count(), 2);

    let changed = service
        .relabel(&RelabelRequest {
            new_name: "Green Onion".to_string(),
            source_ids: vec![SourceId::new(curry, 0)],
        })
        .await?;
    assert_eq!(changed, 1);

    let list = service.build(&week()).await?;
    assert_eq!(list.item_count(), 1);
    let item = &list.groups[0].items[0];
    assert_eq!(item.qty_num, Some(6.0));
    assert_eq!(
        item.source_ids,
        vec![SourceId::new(soup, 0), SourceId::new(salad, 0), SourceId::new(curry, 0)]
    );
    assert_eq!(item.examples, "2 scallions");
    Ok(())
}

#[tokio::test]
async fn test_assign_store_moves_every_source_line() -> Result<()> {
    let pool = setup_test_db().await?;
    planned_recipe(&pool, "Salad", day(1), &["1 cup olive oil"]).await?;
    planned_recipe(&pool, "Pasta", day(2), &["2 tbsp olive oil"]).await?;
    let service = ShoppingListService::new(pool, false);

    let before = service.build(&week()).await?;
    let source_ids = before.groups[0].items[0].source_ids.clone();

    let changed = service
        .assign_store(&AssignStoreRequest {
            store_id: "costco".to_string(),
            category: Some("oils".to_string()),
            source_ids,
        })
        .await?;
    assert_eq!(changed, 2);

    let after = service.build(&week()).await?;
    let group = after.group("costco").unwrap();
    assert_eq!(group.items[0].category, "oils");
    assert!(after.group("").is_none());
    Ok(())
}

#[tokio::test]
async fn test_return_to_pantry_then_build() -> Result<()> {
    let pool = setup_test_db().await?;
    planned_recipe(&pool, "Bread", day(1), &["300 g flour"]).await?;
    let service = ShoppingListService::new(pool, true);

    service.return_to_pantry("flour", 1.0, "kg").await?;
    let list = service.build(&week()).await?;

    assert!(list.groups[0].items[0].from_pantry);
    let stock = load_pantry(service.pool()).await?;
    assert_eq!(stock[0].unit, "kg");
    assert!((stock[0].qty_num - 0.7).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_file_backed_database_keeps_pantry() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}", dir.path().join("planner.db").display());

    {
        let pool = connect(&url, 2).await?;
        init_database_schema(&pool).await?;
        planned_recipe(&pool, "Bread", day(1), &["300 g flour"]).await?;
        upsert_pantry_item(&pool, &PantryStock::new("flour", 500.0, "g")).await?;
        ShoppingListService::new(pool.clone(), true).build(&week()).await?;
        pool.close().await;
    }

    let pool = connect(&url, 2).await?;
    init_database_schema(&pool).await?;
    assert_eq!(load_pantry(&pool).await?[0].qty_num, 200.0);
    Ok(())
}

#[tokio::test]
async fn test_builds_from_separate_pools_share_the_pantry() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}", dir.path().join("shared.db").display());
    let first_pool = connect(&url, 2).await?;
    init_database_schema(&first_pool).await?;
    planned_recipe(&first_pool, "Bread", day(1), &["300 g flour"]).await?;
    let second_pool = connect(&url, 2).await?;

    // each service has its own lock, so only the database orders the builds
    let first = ShoppingListService::new(first_pool.clone(), true);
    let second = ShoppingListService::new(second_pool, true);

    for _ in 0..10 {
        upsert_pantry_item(&first_pool, &PantryStock::new("flour", 500.0, "g")).await?;

        let (week_a, week_b) = (week(), week());
        let (a, b) = tokio::join!(first.build(&week_a), second.build(&week_b));
        let (a, b) = (a?, b?);

        let deducted: f64 = a
            .pantry_deductions
            .iter()
            .chain(b.pantry_deductions.iter())
            .map(|d| d.deducted)
            .sum();
        assert_eq!(deducted, 500.0);
        assert_eq!(load_pantry(&first_pool).await?[0].qty_num, 0.0);
    }
    Ok(())
}
