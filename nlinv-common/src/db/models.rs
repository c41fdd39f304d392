//! Database models

use serde::{Deserialize, Serialize};

/// One inventory row
///
/// `id` maps to the `"item no"` column, `name` to `item_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
}

/// Starter rows inserted at process start, in insertion order
pub const SEED_ITEMS: [(&str, i64); 5] = [
    ("Potato", 25),
    ("Tomato", 40),
    ("Onion", 30),
    ("Carrot", 15),
    ("Apple", 20),
];
