//! Inventory read endpoint

use axum::{extract::State, routing::get, Json, Router};
use nlinv_common::db::Item;
use serde::Serialize;

use crate::{ApiResult, AppState};

/// Current table contents
#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub items: Vec<Item>,
}

/// GET /api/inventory
pub async fn get_inventory(State(state): State<AppState>) -> ApiResult<Json<InventoryResponse>> {
    let items = state.store.list_items().await?;
    Ok(Json(InventoryResponse { items }))
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new().route("/api/inventory", get(get_inventory))
}
