//! Root page handler - inventory table and instruction form

use axum::{extract::State, response::Html};
use nlinv_common::db::Item;

use crate::services::SUPPORTED_AUDIO_EXTENSIONS;
use crate::{ApiResult, AppState};

/// GET /
///
/// Current inventory, audio upload, typed instruction and status area
pub async fn root_page(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let items = state.store.list_items().await?;

    let build_timestamp = env!("BUILD_TIMESTAMP");
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = env!("GIT_HASH");
    let build_profile = env!("BUILD_PROFILE");
    let short_hash = git_hash.get(..8).unwrap_or(git_hash);

    let accept = SUPPORTED_AUDIO_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Inventory Manager - NL to SQL</title>
    <link rel="stylesheet" href="/static/nlinv-ui.css">
</head>
<body>
    <header>
        <div class="header-content">
            <div class="header-left">
                <h1>
                    Inventory Manager - NL &rarr; SQL
                    <span class="connection-status status-connecting" id="connection-status">Connecting...</span>
                </h1>
                <p class="subtitle">Model: {model}</p>
            </div>
            <div class="header-right">
                <div>nlinv-im v{version}</div>
                <div>{short_hash} ({build_profile})</div>
                <div>{build_timestamp}</div>
            </div>
        </div>
    </header>
    <div class="content">
        <h2>Current Inventory</h2>
        <table id="inventory-table">
            <thead><tr><th>Item No</th><th>Item Name</th><th>Quantity</th></tr></thead>
            <tbody>{rows}</tbody>
        </table>

        <form id="instruction-form">
            <h2>Audio Input (Optional)</h2>
            <div class="field">
                <label for="audio-input">Upload an audio instruction ({formats})</label>
                <input type="file" id="audio-input" name="audio" accept="{accept}">
            </div>
            <div class="field">
                <label for="instruction-input">Or type your instruction</label>
                <input type="text" id="instruction-input" name="instruction"
                       placeholder="add 2 Potato, remove 3 Apple, show all items">
            </div>
            <button type="submit" class="button" id="submit-button">Generate SQL &amp; Update</button>
            <button type="button" class="button secondary hidden" id="cancel-button">Cancel</button>
        </form>

        <div id="status-area"></div>

        <div id="sql-section" class="hidden">
            <h2>SQL Query Generated</h2>
            <pre class="sql" id="generated-sql"></pre>
        </div>

        <div id="updated-section" class="hidden">
            <h2>Updated Inventory</h2>
            <table id="updated-table">
                <thead><tr><th>Item No</th><th>Item Name</th><th>Quantity</th></tr></thead>
                <tbody></tbody>
            </table>
        </div>
    </div>
    <script src="/static/nlinv-ui.js"></script>
</body>
</html>
"#,
        model = escape_html(state.pipeline.model_name()),
        version = version,
        short_hash = short_hash,
        build_profile = build_profile,
        build_timestamp = build_timestamp,
        rows = render_item_rows(&items),
        formats = SUPPORTED_AUDIO_EXTENSIONS.join(", "),
        accept = accept,
    );

    Ok(Html(html))
}

/// Table body rows for `items`, in the order given
pub fn render_item_rows(items: &[Item]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td class="quantity">{}</td></tr>"#,
                item.id,
                escape_html(&item.name),
                item.quantity
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Item names come from model output, so they are escaped before rendering
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
