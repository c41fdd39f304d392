//! Database initialization
//!
//! The inventory lives in a private in-memory SQLite database. Every
//! `sqlite::memory:` connection is its own database, so the pool is pinned to a
//! single connection that is never recycled; dropping the pool drops the table.

use crate::db::models::SEED_ITEMS;
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

/// Read-back query returning rows in primary-key order
pub const SELECT_ALL_ITEMS: &str =
    r#"SELECT "item no" AS id, item_name AS name, quantity FROM Inventory ORDER BY "item no""#;

/// Open a fresh in-memory inventory database with schema and seed rows
pub async fn init_inventory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_inventory_table(&pool).await?;
    seed_inventory(&pool).await?;

    info!("Initialized in-memory inventory with {} seed items", SEED_ITEMS.len());

    Ok(pool)
}

/// Create the Inventory table
///
/// AUTOINCREMENT keeps ids from being reused after a DELETE. The CHECK makes
/// a statement that would store a fractional or text quantity fail instead of
/// leaving a row the read-back cannot decode.
pub async fn create_inventory_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Inventory (
            "item no" INTEGER PRIMARY KEY AUTOINCREMENT,
            item_name TEXT NOT NULL UNIQUE,
            quantity INTEGER NOT NULL DEFAULT 0 CHECK (typeof(quantity) = 'integer')
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert the seed set in order (ids 1..5 on a fresh table)
pub async fn seed_inventory(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;

    for (name, quantity) in SEED_ITEMS {
        sqlx::query("INSERT INTO Inventory (item_name, quantity) VALUES (?, ?)")
            .bind(name)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}
