//! Ferry Core - dependency-ordered data migrations.
//!
//! A migration run discovers declared migrators, orders the requested subset by
//! their dependencies, and executes each one inside its own transaction against
//! the target store.

pub mod catalog;
pub mod config;
pub mod constraint;
pub mod driver;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod storage;
pub mod unit;
pub mod value;

pub use catalog::{Catalog, ConstraintDef, EntityDef, FieldDef, FieldType, ScalarType, SchemaBundle};
pub use config::{FerryConfig, SourceSpec};
pub use constraint::{ConstraintValidator, FieldErrors, UniqueIndex, UniqueLookup, NON_FIELD_ERRORS};
pub use driver::{format_validation_failure, plan, select, Driver, RunSummary, UnitReport};
pub use error::{Error, ValidationFailure};
pub use registry::{discover, Namespace, Registry, UnitModule};
pub use resolver::{resolve, ScheduledUnit};
pub use source::{
    EntitySource, RecordFilter, RecordSink, RecordSource, SourceConnections, SourceContext,
    SourceRecord, SqlSource, DEFAULT_CONNECTION,
};
pub use storage::{EntityId, Record, StorageConfig, StorageEngine, TargetScope, Transaction};
pub use unit::{
    run_migration, ComputeFn, MigrationContext, MigratorDef, NoHooks, SaveHooks, UnitStats,
};
pub use value::Value;
