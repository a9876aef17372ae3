//! # Configuration Module
//!
//! Runtime settings for the shopping-list service. Defaults live in constants;
//! `AppConfig::from_env` overlays environment variables (a `.env` file is
//! loaded first when present).

use crate::errors::{ShoppingListError, ShoppingListResult};
use std::env;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://mealplanner.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_APPLY_PANTRY: bool = true;

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const MAX_CONNECTIONS_VAR: &str = "MEALPLANNER_MAX_CONNECTIONS";
pub const APPLY_PANTRY_VAR: &str = "MEALPLANNER_APPLY_PANTRY";
pub const LOG_FORMAT_VAR: &str = "MEALPLANNER_LOG_FORMAT";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> ShoppingListResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "plain" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ShoppingListError::Config(format!(
                "{LOG_FORMAT_VAR} must be 'text' or 'json', got '{other}'"
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string
    pub database_url: String,
    /// Upper bound of the connection pool
    pub max_connections: u32,
    /// Whether a build deducts pantry stock unless the request says otherwise
    pub apply_pantry: bool,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            apply_pantry: DEFAULT_APPLY_PANTRY,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> ShoppingListResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> ShoppingListResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(DATABASE_URL_VAR) {
            if !url.trim().is_empty() {
                config.database_url = url;
            }
        }

        if let Some(value) = lookup(MAX_CONNECTIONS_VAR) {
            config.max_connections = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ShoppingListError::Config(format!(
                        "{MAX_CONNECTIONS_VAR} must be a positive integer, got '{value}'"
                    ))
                })?;
        }

        if let Some(value) = lookup(APPLY_PANTRY_VAR) {
            config.apply_pantry = parse_bool(&value).ok_or_else(|| {
                ShoppingListError::Config(format!(
                    "{APPLY_PANTRY_VAR} must be a boolean, got '{value}'"
                ))
            })?;
        }

        if let Some(value) = lookup(LOG_FORMAT_VAR) {
            config.log_format = LogFormat::parse(&value)?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
