//! Target record representation.

use std::collections::BTreeMap;
use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};

use super::EntityId;
use crate::error::Error;
use crate::value::Value;

static NULL: Value = Value::Null;

/// A record of a target entity.
///
/// Built field by field while a migrator maps one source record, then
/// validated and inserted. The id is assigned on insert.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Record {
    /// Target entity name.
    pub entity: String,
    /// Id, set once the record has been inserted.
    pub id: Option<EntityId>,
    /// Field values keyed by field name.
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record of the given entity.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: None,
            fields: BTreeMap::new(),
        }
    }

    /// Set a field value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Get a field value. Unset fields read as `Null`.
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    /// Whether the field has been set.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Values of the given fields, in order.
    pub fn values_for(&self, fields: &[String]) -> Vec<Value> {
        fields.iter().map(|f| self.get(f).clone()).collect()
    }

    /// Short identity used in reports: `Entity(<hex id>)` or `Entity(unsaved)`.
    pub fn identity(&self) -> String {
        match &self.id {
            Some(id) => format!("{}({})", self.entity, hex::encode(id)),
            None => format!("{}(unsaved)", self.entity),
        }
    }

    /// Serialize the record to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.identity())?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", name, value)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_reads_null() {
        let record = Record::new("NewPoll").with("new_poll_name", "derp");
        assert_eq!(record.get("new_poll_name"), &Value::from("derp"));
        assert!(record.get("other").is_null());
        assert!(!record.contains("other"));
    }

    #[test]
    fn test_values_for_preserves_order() {
        let record = Record::new("Choice").with("poll", "p").with("label", "yes");
        let values = record.values_for(&["label".to_string(), "poll".to_string()]);
        assert_eq!(values, vec![Value::from("yes"), Value::from("p")]);
    }

    #[test]
    fn test_identity_and_display() {
        let mut record = Record::new("NewPoll").with("new_poll_name", "derp");
        assert_eq!(record.identity(), "NewPoll(unsaved)");
        assert_eq!(record.to_string(), "NewPoll(unsaved) { new_poll_name: 'derp' }");

        record.id = Some([0xab; 16]);
        assert_eq!(record.identity(), format!("NewPoll({})", "ab".repeat(16)));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut record = Record::new("NewPoll").with("new_poll_name", "derp").with("votes", 3);
        record.id = Some([7; 16]);

        let bytes = record.to_bytes().unwrap();
        assert_eq!(Record::from_bytes(&bytes).unwrap(), record);
    }
}
