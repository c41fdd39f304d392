//! Database access for nlinv-im

pub mod inventory;

pub use inventory::InventoryStore;
