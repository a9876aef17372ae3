use crate::ingredient_model::{IngredientLine, PantryStock, SourceId};
use crate::ingredient_parser::parse;
use crate::name_canonicalizer::canonical_key;
use crate::pantry::take_from_stock;
use crate::units::{canonicalize, convert};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, Row, Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// How long a writer waits for a write lock held by another connection
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// A stored recipe
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
}

/// Open a connection pool, creating the database file when missing.
///
/// In-memory databases are private to one connection, so the pool is capped
/// at a single connection that is never recycled.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database URL: {database_url}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let in_memory = database_url.contains(":memory:");
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to database at {database_url}"))?;
    info!(database_url = %database_url, in_memory, "Connected to database");
    Ok(pool)
}

/// Begin a transaction that takes the database write lock up front.
///
/// Read-then-write sequences on the pantry must not start as readers: another
/// connection, possibly in another process, could write in between and the
/// later lock upgrade would fail. With the lock taken by `BEGIN IMMEDIATE`,
/// a second writer waits up to [`BUSY_TIMEOUT`] instead.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE")
        .await
        .context("Failed to begin write transaction")
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &SqlitePool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipes table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipe_ingredients (
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            idx INTEGER NOT NULL,
            ingredient_raw TEXT NOT NULL,
            ingredient_norm TEXT NOT NULL DEFAULT '',
            qty_num REAL,
            qty_text TEXT NOT NULL DEFAULT '',
            unit TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            store_id TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (recipe_id, idx)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipe_ingredients table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS planned_meals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            planned_date TEXT NOT NULL,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create planned_meals table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_planned_meals_date ON planned_meals(planned_date)")
        .execute(pool)
        .await
        .context("Failed to create planned_meals index")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS pantry_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            qty_num REAL NOT NULL DEFAULT 0,
            unit TEXT NOT NULL DEFAULT '',
            low_stock_threshold REAL NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create pantry_items table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Create a recipe and return its id
pub async fn add_recipe(pool: &SqlitePool, title: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO recipes (title) VALUES (?)")
        .bind(title)
        .execute(pool)
        .await
        .context("Failed to insert recipe")?;

    let id = result.last_insert_rowid();
    info!(recipe_id = id, title = %title, "Recipe created");
    Ok(id)
}

/// Read a recipe by id
pub async fn read_recipe(pool: &SqlitePool, recipe_id: i64) -> Result<Option<Recipe>> {
    let row = sqlx::query("SELECT id, title FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await
        .context("Failed to read recipe")?;

    row.map(|row| -> Result<Recipe> {
        Ok(Recipe {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
        })
    })
    .transpose()
}

/// Parse a free-text ingredient statement and append it to a recipe.
///
/// The raw text is stored as given; name, quantity and unit come from the
/// parser. The line index is one past the recipe's current last line.
pub async fn add_recipe_ingredient(
    pool: &SqlitePool,
    recipe_id: i64,
    raw_text: &str,
    category: &str,
    store_id: &str,
) -> Result<IngredientLine> {
    let Some(parsed) = parse(raw_text) else {
        bail!("Ingredient text is empty");
    };

    let mut tx = begin_write(pool).await?;

    let next_idx: i64 = sqlx::query(
        "SELECT COALESCE(MAX(idx) + 1, 0) AS next_idx FROM recipe_ingredients WHERE recipe_id = ?",
    )
    .bind(recipe_id)
    .fetch_one(&mut *tx)
    .await
    .context("Failed to read next ingredient index")?
    .try_get("next_idx")?;

    let line = IngredientLine {
        recipe_id,
        line_index: next_idx,
        raw_text: raw_text.trim().to_string(),
        name: parsed.grouping_name(),
        qty_num: parsed.qty_num,
        qty_text: parsed.qty_text,
        unit: parsed.unit,
        category: category.trim().to_string(),
        store_id: store_id.trim().to_string(),
    };

    sqlx::query(
        "INSERT INTO recipe_ingredients
            (recipe_id, idx, ingredient_raw, ingredient_norm, qty_num, qty_text, unit,
             category, store_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(line.recipe_id)
    .bind(line.line_index)
    .bind(&line.raw_text)
    .bind(&line.name)
    .bind(line.qty_num)
    .bind(&line.qty_text)
    .bind(&line.unit)
    .bind(&line.category)
    .bind(&line.store_id)
    .execute(&mut *tx)
    .await
    .context("Failed to insert ingredient line")?;

    tx.commit().await.context("Failed to commit ingredient line")?;

    debug!(recipe_id, idx = line.line_index, name = %line.name, "Ingredient line stored");
    Ok(line)
}

/// Put a recipe on the planner for a date
pub async fn schedule_meal(pool: &SqlitePool, date: NaiveDate, recipe_id: i64) -> Result<i64> {
    let result = sqlx::query("INSERT INTO planned_meals (planned_date, recipe_id) VALUES (?, ?)")
        .bind(date)
        .bind(recipe_id)
        .execute(pool)
        .await
        .context("Failed to schedule meal")?;

    info!(recipe_id, date = %date, "Meal scheduled");
    Ok(result.last_insert_rowid())
}

/// Distinct recipe ids planned within `[start, end]`, by first planned date
pub async fn recipe_ids_in_range(
    pool: &SqlitePool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<i64>> {
    let rows = sqlx::query(
        "SELECT recipe_id, MIN(planned_date) AS first_date
         FROM planned_meals
         WHERE planned_date BETWEEN ? AND ?
         GROUP BY recipe_id
         ORDER BY first_date, recipe_id",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .context("Failed to read planned meals")?;

    let ids = rows
        .iter()
        .map(|row| row.try_get::<i64, _>("recipe_id"))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(start = %start, end = %end, recipes = ids.len(), "Planned recipes loaded");
    Ok(ids)
}

/// Ingredient lines of the given recipes, in recipe order then line order
pub async fn fetch_ingredient_lines(
    pool: &SqlitePool,
    recipe_ids: &[i64],
) -> Result<Vec<IngredientLine>> {
    let mut lines = Vec::new();

    for recipe_id in recipe_ids {
        let rows = sqlx::query(
            "SELECT recipe_id, idx, ingredient_raw, ingredient_norm, qty_num, qty_text, unit,
                    category, store_id
             FROM recipe_ingredients
             WHERE recipe_id = ?
             ORDER BY idx",
        )
        .bind(*recipe_id)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to read ingredient lines of recipe {recipe_id}"))?;

        for row in rows {
            lines.push(IngredientLine {
                recipe_id: row.try_get("recipe_id")?,
                line_index: row.try_get("idx")?,
                raw_text: row.try_get("ingredient_raw")?,
                name: row.try_get("ingredient_norm")?,
                qty_num: row.try_get("qty_num")?,
                qty_text: row.try_get("qty_text")?,
                unit: row.try_get("unit")?,
                category: row.try_get("category")?,
                store_id: row.try_get("store_id")?,
            });
        }
    }

    debug!(recipes = recipe_ids.len(), lines = lines.len(), "Ingredient lines fetched");
    Ok(lines)
}

/// Read all pantry rows, oldest first
pub async fn load_pantry<'e, E>(executor: E) -> Result<Vec<PantryStock>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT name, qty_num, unit, low_stock_threshold FROM pantry_items ORDER BY id",
    )
    .fetch_all(executor)
    .await
    .context("Failed to read pantry")?;

    rows.iter()
        .map(|row| -> Result<PantryStock> {
            Ok(PantryStock {
                name: row.try_get("name")?,
                qty_num: row.try_get("qty_num")?,
                unit: row.try_get("unit")?,
                low_stock_threshold: row.try_get("low_stock_threshold")?,
            })
        })
        .collect()
}

/// Overwrite the stored quantity of a pantry row
pub async fn set_pantry_quantity<'e, E>(executor: E, name: &str, qty_num: f64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE pantry_items SET qty_num = ? WHERE name = ?")
        .bind(qty_num)
        .bind(name)
        .execute(executor)
        .await
        .with_context(|| format!("Failed to update pantry row '{name}'"))?;

    if result.rows_affected() == 0 {
        bail!("Pantry row '{name}' does not exist");
    }
    Ok(())
}

/// Create a pantry row or replace its quantity, unit and threshold
pub async fn upsert_pantry_item(pool: &SqlitePool, item: &PantryStock) -> Result<()> {
    sqlx::query(
        "INSERT INTO pantry_items (name, qty_num, unit, low_stock_threshold)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(name) DO UPDATE SET
            qty_num = excluded.qty_num,
            unit = excluded.unit,
            low_stock_threshold = excluded.low_stock_threshold",
    )
    .bind(item.name.trim())
    .bind(item.qty_num)
    .bind(canonicalize(&item.unit))
    .bind(item.low_stock_threshold)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to save pantry row '{}'", item.name))?;

    info!(name = %item.name, qty = item.qty_num, unit = %item.unit, "Pantry row saved");
    Ok(())
}

fn find_stock<'a>(stock: &'a mut [PantryStock], name: &str) -> Option<&'a mut PantryStock> {
    let key = canonical_key(name);
    stock.iter_mut().find(|row| canonical_key(&row.name) == key)
}

/// Take up to `qty` of an ingredient out of the pantry on an open connection.
///
/// Returns the amount taken, in `unit`; zero when nothing matched.
pub async fn decrement_pantry_on(
    conn: &mut SqliteConnection,
    name: &str,
    qty: f64,
    unit: &str,
) -> Result<f64> {
    let mut stock = load_pantry(&mut *conn).await?;
    let Some(row) = find_stock(&mut stock, name) else {
        return Ok(0.0);
    };

    let Some(taken) = take_from_stock(row, qty, unit) else {
        return Ok(0.0);
    };
    set_pantry_quantity(&mut *conn, &row.name, row.qty_num).await?;
    debug!(name = %row.name, taken, unit = %unit, left = row.qty_num, "Pantry decremented");
    Ok(taken)
}

/// Take up to `qty` of an ingredient out of the pantry in its own transaction
pub async fn decrement_pantry(pool: &SqlitePool, name: &str, qty: f64, unit: &str) -> Result<f64> {
    let mut tx = begin_write(pool).await?;
    let taken = decrement_pantry_on(&mut *tx, name, qty, unit).await?;
    tx.commit().await.context("Failed to commit pantry decrement")?;
    Ok(taken)
}

/// Put an amount back into the pantry.
///
/// The amount is converted into the matching row's unit; an ingredient with
/// no row gets a new one.
pub async fn return_to_pantry(pool: &SqlitePool, name: &str, qty: f64, unit: &str) -> Result<()> {
    let mut tx = begin_write(pool).await?;
    let mut stock = load_pantry(&mut *tx).await?;

    match find_stock(&mut stock, name) {
        Some(row) => {
            let row_unit = canonicalize(&row.unit);
            let unit = canonicalize(unit);
            let added = if row_unit == unit {
                qty
            } else {
                match convert(qty, &unit, &row_unit).qty {
                    Some(converted) => converted,
                    None => bail!(
                        "Cannot return {unit} of '{name}' to a pantry row kept in {row_unit}"
                    ),
                }
            };
            set_pantry_quantity(&mut *tx, &row.name, row.qty_num + added).await?;
            info!(name = %row.name, added, unit = %row_unit, "Returned to pantry");
        }
        None => {
            sqlx::query("INSERT INTO pantry_items (name, qty_num, unit) VALUES (?, ?, ?)")
                .bind(name.trim())
                .bind(qty)
                .bind(canonicalize(unit))
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to create pantry row '{name}'"))?;
            info!(name = %name, qty, unit = %unit, "New pantry row from return");
        }
    }

    tx.commit().await.context("Failed to commit pantry return")?;
    Ok(())
}

/// Rename the ingredient of each listed line; the raw text is left untouched.
///
/// All-or-nothing: returns the number of lines changed.
pub async fn relabel_ingredient_lines(
    pool: &SqlitePool,
    new_name: &str,
    source_ids: &[SourceId],
) -> Result<u64> {
    let mut tx = begin_write(pool).await?;
    let mut changed = 0;

    for source in source_ids {
        let result = sqlx::query(
            "UPDATE recipe_ingredients SET ingredient_norm = ? WHERE recipe_id = ? AND idx = ?",
        )
        .bind(new_name)
        .bind(source.recipe_id)
        .bind(source.line_index)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to relabel ingredient line {source}"))?;
        changed += result.rows_affected();
    }

    tx.commit().await.context("Failed to commit relabel")?;
    info!(new_name = %new_name, lines = changed, "Ingredient lines relabeled");
    Ok(changed)
}

/// Set the store, and optionally the category, of each listed line
pub async fn assign_store(
    pool: &SqlitePool,
    store_id: &str,
    category: Option<&str>,
    source_ids: &[SourceId],
) -> Result<u64> {
    let mut tx = begin_write(pool).await?;
    let mut changed = 0;

    for source in source_ids {
        let result = sqlx::query(
            "UPDATE recipe_ingredients
             SET store_id = ?, category = COALESCE(?, category)
             WHERE recipe_id = ? AND idx = ?",
        )
        .bind(store_id)
        .bind(category)
        .bind(source.recipe_id)
        .bind(source.line_index)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to assign store to ingredient line {source}"))?;
        changed += result.rows_affected();
    }

    tx.commit().await.context("Failed to commit store assignment")?;
    info!(store_id = %store_id, lines = changed, "Store assigned");
    Ok(changed)
}
