//! Field definitions for entities.

use super::types::{FieldType, ScalarType};
use crate::value::Value;
use rkyv::{Archive, Deserialize, Serialize};

/// A field definition within an entity.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
    /// Value used when a record leaves the field unset.
    pub default: Option<Value>,
    /// Maximum length in characters (strings) or bytes (binary).
    pub max_length: Option<u32>,
    /// Whether the value must be unique across the entity.
    pub unique: bool,
    /// Whether empty strings are accepted.
    pub allow_blank: bool,
}

impl FieldDef {
    /// Create a new required field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: None,
            max_length: None,
            unique: false,
            allow_blank: false,
        }
    }

    /// Create an optional (nullable) scalar field.
    pub fn optional(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            allow_blank: true,
            ..Self::new(name, FieldType::OptionalScalar(scalar))
        }
    }

    /// Create a required string field with a maximum length.
    pub fn string(name: impl Into<String>, max_length: u32) -> Self {
        Self::new(name, FieldType::Scalar(ScalarType::String)).with_max_length(max_length)
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the maximum length.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Mark as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Accept empty strings.
    pub fn allow_blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    /// Check if this field has a default value.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}
