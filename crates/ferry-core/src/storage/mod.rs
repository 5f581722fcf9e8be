//! Target store.
//!
//! Records produced by migrators are persisted in sled. Every write goes
//! through a [`Transaction`], which buffers inserts and their unique-index
//! entries until commit so that a failed unit leaves nothing behind.

mod config;
mod engine;
mod record;
mod scope;
mod transaction;

pub use config::{StorageConfig, DEFAULT_DATA_PATH};
pub use engine::StorageEngine;
pub use record::Record;
pub use scope::TargetScope;
pub use transaction::Transaction;

/// Identifier assigned to a target record when it is inserted.
pub type EntityId = [u8; 16];
