//! Constraint enforcement for target records.
//!
//! - Field-level checks (nullability, blanks, types, choices, lengths)
//! - Unique constraints (single and composite), backed by a sled index

mod errors;
mod unique_index;
mod validator;

pub use errors::{FieldErrors, NON_FIELD_ERRORS};
pub use unique_index::{UniqueIndex, UNIQUE_INDEX_TREE};
pub use validator::{ConstraintValidator, UniqueLookup};

pub(crate) use validator::apply_defaults;
