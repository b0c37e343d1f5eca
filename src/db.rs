use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::config::Config;

pub async fn init_db(config: &Config) -> Result<SqlitePool> {
    log::info!("Database URL: {}", config.database_url);

    let max_connections = config.db_pool_size + config.db_max_overflow;
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(max_connections)
        .connect(&config.database_url)
        .await
        .context(format!(
            "failed to connect to database at {}",
            config.database_url
        ))?;

    // Run embedded migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    log::info!("Database initialized successfully");

    Ok(pool)
}
