//! Migrator definitions and the per-unit execution contract.
//!
//! A [`MigratorDef`] says where records come from, which target entity they
//! become, and how fields map across. [`run_migration`] executes one
//! definition inside a single transaction against the target store.

mod definition;
mod hooks;
mod runner;

pub use definition::{ComputeFn, MigratorDef};
pub use hooks::{NoHooks, SaveHooks};
pub use runner::{run_migration, MigrationContext, UnitStats};
