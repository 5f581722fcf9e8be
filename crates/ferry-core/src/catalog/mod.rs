//! Target catalog.
//!
//! The catalog describes the entities migrators write into: their fields,
//! field types, and uniqueness constraints. It is the schema side of the
//! target store and is versioned in sled alongside the data.

mod catalog;
mod constraint;
mod entity;
mod field;
mod schema;
mod types;

pub use catalog::Catalog;
pub use constraint::ConstraintDef;
pub use entity::EntityDef;
pub use field::FieldDef;
pub use schema::SchemaBundle;
pub use types::{FieldType, ScalarType};
