//! The per-unit view of the target store.

use std::collections::BTreeSet;

use super::{EntityId, Record, StorageEngine, Transaction};
use crate::catalog::EntityDef;
use crate::constraint::{ConstraintValidator, FieldErrors, UniqueIndex, UniqueLookup};
use crate::error::Error;
use crate::value::Value;

/// Target operations available to a migrator while it runs.
///
/// All calls happen inside one atomic scope: inserts become visible to later
/// calls immediately, and to everyone else only when the scope commits.
pub trait TargetScope {
    /// Names of the fields a record of `entity` may be given.
    fn writable_fields(&self, entity: &str) -> Result<BTreeSet<String>, Error>;

    /// Whether a record of `entity` exists whose values equal `filter`.
    fn exists_matching(&self, entity: &str, filter: &[(String, Value)]) -> Result<bool, Error>;

    /// Validate a record against the target schema.
    fn validate(&self, record: &Record) -> Result<FieldErrors, Error>;

    /// Insert a record, filling defaults and assigning its id.
    fn insert(&mut self, record: &mut Record) -> Result<EntityId, Error>;
}

impl Transaction<'_> {
    fn entity_def(&self, entity: &str) -> Result<&EntityDef, Error> {
        self.schema()
            .get_entity(entity)
            .ok_or_else(|| Error::definition(format!("unknown target entity: {}", entity)))
    }
}

impl TargetScope for Transaction<'_> {
    fn writable_fields(&self, entity: &str) -> Result<BTreeSet<String>, Error> {
        Ok(self.entity_def(entity)?.field_names())
    }

    fn exists_matching(&self, entity: &str, filter: &[(String, Value)]) -> Result<bool, Error> {
        let names: Vec<&str> = filter.iter().map(|(name, _)| name.as_str()).collect();

        let indexed = self
            .schema()
            .unique_constraints_for(entity)
            .into_iter()
            .find(|c| c.covers_exactly(&names));
        if let Some(constraint) = indexed {
            let values: Vec<Value> = constraint
                .fields()
                .iter()
                .map(|field| {
                    filter
                        .iter()
                        .find(|(name, _)| name == field)
                        .map(|(_, value)| value.clone())
                        .unwrap_or(Value::Null)
                })
                .collect();
            if UniqueIndex::build_key(entity, constraint.name(), &values).is_some() {
                return Ok(self.find_unique(&constraint, &values)?.is_some());
            }
        }

        self.any_record(entity, |record| {
            filter
                .iter()
                .all(|(name, value)| record.get(name) == value)
        })
    }

    fn validate(&self, record: &Record) -> Result<FieldErrors, Error> {
        ConstraintValidator::new(self.schema(), self).validate(record)
    }

    fn insert(&mut self, record: &mut Record) -> Result<EntityId, Error> {
        let entity = self.entity_def(&record.entity)?;
        crate::constraint::apply_defaults(entity, record);

        let id = *record.id.get_or_insert_with(StorageEngine::generate_id);
        let mut stored = record.clone();
        stored.id = Some(id);
        self.stage(stored)
    }
}
