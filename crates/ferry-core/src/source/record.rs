//! Records handed to field mappings and hooks.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::storage::EntityId;
use crate::value::Value;

/// One input record: a read-only mapping from field or column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRecord {
    /// Id of the stored record this was read from, if any.
    pub id: Option<EntityId>,
    /// Values keyed by field or column name.
    pub fields: BTreeMap<String, Value>,
}

impl SourceRecord {
    /// Create a source record from its values.
    pub fn new(fields: BTreeMap<String, Value>) -> Self {
        Self { id: None, fields }
    }

    /// Builder for tests and hand-written sources.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a value that the mapping requires to be present.
    pub fn require(&self, name: &str) -> Result<&Value, Error> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::definition(format!("source record has no field {}", name)))
    }

    /// Get a required string value.
    pub fn require_str(&self, name: &str) -> Result<&str, Error> {
        let value = self.require(name)?;
        value.as_str().ok_or_else(|| {
            Error::definition(format!(
                "source field {} is a {}, not a string",
                name,
                value.type_name()
            ))
        })
    }

    /// Names of all fields.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }
}
