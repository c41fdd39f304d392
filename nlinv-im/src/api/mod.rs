//! HTTP API handlers for nlinv-im
//!
//! HTML page, JSON endpoints and the SSE status stream.

pub mod health;
pub mod instruction;
pub mod inventory;
pub mod sse;
pub mod ui;

pub use health::health_routes;
pub use instruction::instruction_routes;
pub use inventory::inventory_routes;
pub use sse::event_stream;
pub use ui::ui_routes;
