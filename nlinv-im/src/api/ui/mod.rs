//! UI Routes - the single nlinv-im page and its assets
//!
//! Plain HTML/CSS/JS, no frameworks. The page is rendered with the current
//! table already filled in; later updates arrive from the JSON endpoints.

use axum::{routing::get, Router};
use crate::AppState;

mod root;
mod static_assets;

pub use root::render_item_rows;
use root::root_page;
use static_assets::{serve_ui_css, serve_ui_js};

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_page))
        .route("/static/nlinv-ui.css", get(serve_ui_css))
        .route("/static/nlinv-ui.js", get(serve_ui_js))
}
