//! Vault module: encrypted credential storage.
//!
//! This module provides:
//! - `Owner`, `Record` and `RevealedRecord` types (`models`)
//! - The SQLite schema (`schema`)
//! - Identity, password and field rules (`validation`)
//! - High-level `VaultStore` for owners and records (`store`)

pub mod models;
pub mod schema;
pub mod store;
pub mod validation;

// Re-export the most commonly used items.
pub use models::{Owner, Record, RevealedRecord};
pub use store::VaultStore;
