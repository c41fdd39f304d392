//! Inventory store
//!
//! Owns the in-memory SQLite database. The service state holds one store and
//! hands it to each pipeline run; tests build as many independent stores as
//! they like.

use nlinv_common::db::{init_inventory_database, Item, SELECT_ALL_ITEMS};
use nlinv_common::Result;
use sqlx::SqlitePool;

/// Handle to the inventory table
///
/// Cloning shares the same database.
#[derive(Clone)]
pub struct InventoryStore {
    pool: SqlitePool,
}

impl InventoryStore {
    /// Create a fresh in-memory inventory holding the seed set
    pub async fn open_in_memory() -> Result<Self> {
        let pool = init_inventory_database().await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// All rows ordered by id
    pub async fn list_items(&self) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(SELECT_ALL_ITEMS)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Item names in id order, used as the generator's vocabulary
    pub async fn known_names(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"SELECT item_name FROM Inventory ORDER BY "item no""#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    /// Look up one item by exact name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            r#"SELECT "item no" AS id, item_name AS name, quantity FROM Inventory WHERE item_name = ?"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }
}
