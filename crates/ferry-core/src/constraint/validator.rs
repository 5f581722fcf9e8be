//! Constraint validation logic.
//!
//! The ConstraintValidator checks a target record against its entity
//! definition and the entity's unique constraints before it is inserted.

use crate::catalog::{ConstraintDef, EntityDef, FieldDef, SchemaBundle};
use crate::error::Error;
use crate::storage::{EntityId, Record};
use crate::value::Value;

use super::errors::{FieldErrors, NON_FIELD_ERRORS};

/// Lookup of existing owners of unique values.
///
/// Implemented by transactions so that validation sees writes the
/// transaction has not committed yet.
pub trait UniqueLookup {
    /// The id of a record already holding `values` under `constraint`.
    fn find_unique(
        &self,
        constraint: &ConstraintDef,
        values: &[Value],
    ) -> Result<Option<EntityId>, Error>;
}

/// Constraint validator for target records.
pub struct ConstraintValidator<'a> {
    schema: &'a SchemaBundle,
    lookup: &'a dyn UniqueLookup,
}

impl<'a> ConstraintValidator<'a> {
    /// Create a new constraint validator.
    pub fn new(schema: &'a SchemaBundle, lookup: &'a dyn UniqueLookup) -> Self {
        Self { schema, lookup }
    }

    /// Validate a record, returning every problem found.
    ///
    /// An empty result means the record may be inserted. Unset fields with a
    /// declared default are checked as if the default were set.
    pub fn validate(&self, record: &Record) -> Result<FieldErrors, Error> {
        let entity = self.schema.get_entity(&record.entity).ok_or_else(|| {
            Error::definition(format!("unknown target entity: {}", record.entity))
        })?;

        let mut errors = FieldErrors::new();

        for name in record.fields.keys() {
            if entity.get_field(name).is_none() {
                errors.add(NON_FIELD_ERRORS, format!("unknown field: {}", name));
            }
        }

        for field in &entity.fields {
            let value = effective_value(field, record);
            if let Some(message) = check_field(field, value) {
                errors.add(&field.name, message);
            }
        }

        for constraint in self.schema.unique_constraints_for(&record.entity) {
            let fields = constraint.fields();
            // Fields that already failed their own checks are not looked up.
            if fields.iter().any(|f| errors.has(f)) {
                continue;
            }

            let values: Vec<Value> = fields
                .iter()
                .map(|name| match entity.get_field(name) {
                    Some(field) => effective_value(field, record).clone(),
                    None => record.get(name).clone(),
                })
                .collect();

            let owner = self.lookup.find_unique(&constraint, &values)?;
            let conflict = match (owner, record.id) {
                (Some(owner), Some(id)) => owner != id,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if conflict {
                let key = if fields.len() == 1 {
                    fields[0].as_str()
                } else {
                    NON_FIELD_ERRORS
                };
                errors.add(key, unique_message(entity, fields));
            }
        }

        Ok(errors)
    }
}

/// Fill unset fields that declare a default.
pub(crate) fn apply_defaults(entity: &EntityDef, record: &mut Record) {
    for field in &entity.fields {
        if let Some(default) = &field.default {
            if !record.contains(&field.name) {
                record.set(field.name.clone(), default.clone());
            }
        }
    }
}

fn effective_value<'r>(field: &'r FieldDef, record: &'r Record) -> &'r Value {
    match (record.fields.get(&field.name), &field.default) {
        (Some(value), _) => value,
        (None, Some(default)) => default,
        (None, None) => record.get(&field.name),
    }
}

/// First problem with a single field value, if any.
fn check_field(field: &FieldDef, value: &Value) -> Option<String> {
    if value.is_null() {
        if field.field_type.is_nullable() {
            return None;
        }
        return Some("This field cannot be null.".to_string());
    }

    let scalar = field.field_type.scalar_type();
    if !scalar.accepts(value) {
        return Some(format!(
            "Expected a {} value, got {}.",
            scalar,
            value.type_name()
        ));
    }

    if let Value::String(s) = value {
        if s.is_empty() && !field.allow_blank {
            return Some("This field cannot be blank.".to_string());
        }
        if let Some(variants) = field.field_type.variants() {
            if !variants.iter().any(|v| v == s) {
                return Some(format!("Value '{}' is not a valid choice.", s));
            }
        }
    }

    if let Some(max) = field.max_length {
        let len = match value {
            Value::String(s) => s.chars().count(),
            Value::Bytes(b) => b.len(),
            _ => 0,
        };
        if len > max as usize {
            return Some(format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ));
        }
    }

    None
}

fn unique_message(entity: &EntityDef, fields: &[String]) -> String {
    format!(
        "{} with this {} already exists.",
        entity.name,
        fields.join(" and ")
    )
}
