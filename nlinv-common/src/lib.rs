//! # nlinv Common Library
//!
//! Shared code for the nlinv inventory manager including:
//! - Inventory database bootstrap (schema and seed set)
//! - The `Item` model
//! - Event types (InventoryEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - SSE helpers

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
