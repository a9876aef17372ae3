use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use mealplanner::config::{AppConfig, LogFormat};
use mealplanner::db;
use mealplanner::ingredient_model::{PantryStock, ShoppingList, SourceId};
use mealplanner::shopping_list::{
    AssignStoreRequest, RelabelRequest, ShoppingListRequest, ShoppingListService,
};
use mealplanner::store_grouping::group_heading;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mealplanner")]
#[command(about = "Plan meals and build store-grouped shopping lists from your recipes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database tables
    Init,
    /// Store a recipe and its ingredient lines
    AddRecipe {
        /// Recipe title
        title: String,

        /// Ingredient statement, e.g. "1 1/2 cups flour, sifted" (repeatable)
        #[arg(short, long)]
        ingredient: Vec<String>,

        /// Store assigned to every ingredient of the recipe
        #[arg(long, default_value = "")]
        store: String,

        /// Category assigned to every ingredient of the recipe
        #[arg(long, default_value = "")]
        category: String,
    },
    /// Put a recipe on the planner
    Plan {
        /// Date of the meal (YYYY-MM-DD)
        date: NaiveDate,
        recipe_id: i64,
    },
    /// Create or replace a pantry row
    PantrySet {
        name: String,
        qty: f64,
        #[arg(default_value = "")]
        unit: String,

        /// Warn when stock falls to this amount (0 disables)
        #[arg(long, default_value_t = 0.0)]
        threshold: f64,
    },
    /// Build the shopping list for a date range
    List {
        #[arg(short, long)]
        start: Option<NaiveDate>,

        #[arg(short, long)]
        end: Option<NaiveDate>,

        /// Leave the pantry untouched
        #[arg(long)]
        no_pantry: bool,

        /// Print a readable list instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Rename the ingredient of the given lines (RECIPE:INDEX)
    Relabel {
        new_name: String,
        #[arg(required = true, value_parser = parse_source_id)]
        sources: Vec<SourceId>,
    },
    /// Assign a store to the given lines (RECIPE:INDEX)
    AssignStore {
        store_id: String,

        #[arg(long)]
        category: Option<String>,

        #[arg(required = true, value_parser = parse_source_id)]
        sources: Vec<SourceId>,
    },
    /// Put an amount back into the pantry
    ReturnToPantry {
        name: String,
        qty: f64,
        #[arg(default_value = "")]
        unit: String,
    },
}

fn parse_source_id(value: &str) -> Result<SourceId> {
    let (recipe, index) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("expected RECIPE:INDEX, got '{value}'"))?;
    Ok(SourceId::new(recipe.trim().parse()?, index.trim().parse()?))
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_text(list: &ShoppingList) {
    for group in &list.groups {
        println!("{}", group_heading(group));
        for item in &group.items {
            println!("  - {}: {}", item.ingredient_norm, item.qty_text);
        }
        println!();
    }
    for warning in &list.pantry_warnings {
        println!("! {}", warning.message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    info!(database_url = %config.database_url, "Starting meal planner");

    let pool = db::connect(&config.database_url, config.max_connections).await?;
    db::init_database_schema(&pool).await?;
    let service = ShoppingListService::new(pool, config.apply_pantry);

    match cli.command {
        Commands::Init => {
            println!("Database ready at {}", config.database_url);
        }
        Commands::AddRecipe {
            title,
            ingredient,
            store,
            category,
        } => {
            let recipe_id = db::add_recipe(service.pool(), &title).await?;
            let mut lines = Vec::with_capacity(ingredient.len());
            for text in &ingredient {
                let line =
                    db::add_recipe_ingredient(service.pool(), recipe_id, text, &category, &store)
                        .await?;
                lines.push(line);
            }
            print_json(&serde_json::json!({ "recipeId": recipe_id, "lines": lines }))?;
        }
        Commands::Plan { date, recipe_id } => {
            let id = db::schedule_meal(service.pool(), date, recipe_id).await?;
            print_json(&serde_json::json!({ "plannedMealId": id }))?;
        }
        Commands::PantrySet {
            name,
            qty,
            unit,
            threshold,
        } => {
            let item = PantryStock::new(&name, qty, &unit).with_threshold(threshold);
            db::upsert_pantry_item(service.pool(), &item).await?;
            print_json(&db::load_pantry(service.pool()).await?)?;
        }
        Commands::List {
            start,
            end,
            no_pantry,
            text,
        } => {
            let request = ShoppingListRequest {
                start,
                end,
                apply_pantry: if no_pantry { Some(false) } else { None },
            };
            let list = service.build(&request).await?;
            if text {
                print_text(&list);
            } else {
                print_json(&list)?;
            }
        }
        Commands::Relabel { new_name, sources } => {
            let changed = service
                .relabel(&RelabelRequest {
                    new_name,
                    source_ids: sources,
                })
                .await?;
            print_json(&serde_json::json!({ "changed": changed }))?;
        }
        Commands::AssignStore {
            store_id,
            category,
            sources,
        } => {
            let changed = service
                .assign_store(&AssignStoreRequest {
                    store_id,
                    category,
                    source_ids: sources,
                })
                .await?;
            print_json(&serde_json::json!({ "changed": changed }))?;
        }
        Commands::ReturnToPantry { name, qty, unit } => {
            service.return_to_pantry(&name, qty, &unit).await?;
            print_json(&db::load_pantry(service.pool()).await?)?;
        }
    }

    Ok(())
}
