//! Schema bundle - versioned snapshot of the target schema.

use super::{ConstraintDef, EntityDef};
use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::HashMap;

/// A versioned snapshot of the entire target schema.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Schema version (monotonically increasing).
    pub version: u64,
    /// Creation timestamp (microseconds since Unix epoch).
    pub created_at: u64,
    /// Entity definitions keyed by name.
    pub entities: HashMap<String, EntityDef>,
    /// Constraint definitions.
    pub constraints: Vec<ConstraintDef>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            created_at: current_timestamp(),
            entities: HashMap::new(),
            constraints: Vec::new(),
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a constraint to the schema.
    pub fn with_constraint(mut self, constraint: ConstraintDef) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// All unique constraints for an entity.
    ///
    /// Fields declared `unique` come first, as implicit single-field
    /// constraints in field order, followed by explicit constraints.
    pub fn unique_constraints_for(&self, entity: &str) -> Vec<ConstraintDef> {
        let mut constraints: Vec<ConstraintDef> = match self.get_entity(entity) {
            Some(def) => def
                .unique_fields()
                .map(|f| ConstraintDef::implicit_unique(entity, &f.name))
                .collect(),
            None => Vec::new(),
        };
        constraints.extend(
            self.constraints
                .iter()
                .filter(|c| c.entity() == entity)
                .cloned(),
        );
        constraints
    }

    /// List all entity names, sorted.
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Whether two bundles describe the same entities and constraints,
    /// ignoring version and timestamp.
    pub fn same_definitions(&self, other: &SchemaBundle) -> bool {
        self.entities == other.entities && self.constraints == other.constraints
    }

    /// Serialize the schema bundle to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a schema bundle from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl Default for SchemaBundle {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Current timestamp in microseconds since Unix epoch.
fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, FieldType, ScalarType};

    fn sample_schema() -> SchemaBundle {
        let poll = EntityDef::new("NewPoll")
            .with_field(FieldDef::string("new_poll_name", 36).unique());

        let choice = EntityDef::new("Choice")
            .with_field(FieldDef::string("poll", 36))
            .with_field(FieldDef::string("label", 100))
            .with_field(FieldDef::new("votes", FieldType::scalar(ScalarType::Int)).with_default(0));

        SchemaBundle::new(1)
            .with_entity(poll)
            .with_entity(choice)
            .with_constraint(ConstraintDef::unique_composite(
                "choice_poll_label",
                "Choice",
                ["poll", "label"],
            ))
    }

    #[test]
    fn test_schema_bundle_builder() {
        let schema = sample_schema();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.entities.len(), 2);
        assert_eq!(schema.constraints.len(), 1);
        assert_eq!(schema.entity_names(), vec!["Choice", "NewPoll"]);
    }

    #[test]
    fn test_unique_constraints_include_implicit() {
        let schema = sample_schema();

        let poll = schema.unique_constraints_for("NewPoll");
        assert_eq!(poll.len(), 1);
        assert_eq!(poll[0].name(), "NewPoll_new_poll_name_key");

        let choice = schema.unique_constraints_for("Choice");
        assert_eq!(choice.len(), 1);
        assert_eq!(choice[0].fields().len(), 2);

        assert!(schema.unique_constraints_for("Missing").is_empty());
    }

    #[test]
    fn test_same_definitions_ignores_version() {
        let a = sample_schema();
        let mut b = sample_schema();
        b.version = 7;
        assert!(a.same_definitions(&b));

        let c = sample_schema().with_entity(EntityDef::new("Other"));
        assert!(!a.same_definitions(&c));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let schema = sample_schema();
        let bytes = schema.to_bytes().unwrap();
        let decoded = SchemaBundle::from_bytes(&bytes).unwrap();

        assert_eq!(schema, decoded);
    }
}
