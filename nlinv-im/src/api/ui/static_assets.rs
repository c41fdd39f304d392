//! Static asset handlers
//!
//! Embeds and serves CSS/JS files at compile time

use axum::{http::StatusCode, response::{IntoResponse, Response}};

const UI_CSS: &str = include_str!("../../../static/nlinv-ui.css");
const UI_JS: &str = include_str!("../../../static/nlinv-ui.js");

/// GET /static/nlinv-ui.css
pub async fn serve_ui_css() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "text/css"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        UI_CSS,
    )
        .into_response()
}

/// GET /static/nlinv-ui.js
pub async fn serve_ui_js() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "application/javascript"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        UI_JS,
    )
        .into_response()
}
