//! Constraint definitions for entities.

use rkyv::{Archive, Deserialize, Serialize};

/// A constraint definition.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum ConstraintDef {
    /// Uniqueness constraint (single or composite).
    Unique {
        /// Constraint name.
        name: String,
        /// Entity this constraint applies to.
        entity: String,
        /// Fields that must be unique together.
        fields: Vec<String>,
    },
}

impl ConstraintDef {
    /// Create a unique constraint on a single field.
    pub fn unique(
        name: impl Into<String>,
        entity: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        ConstraintDef::Unique {
            name: name.into(),
            entity: entity.into(),
            fields: vec![field.into()],
        }
    }

    /// Create a composite unique constraint.
    pub fn unique_composite(
        name: impl Into<String>,
        entity: impl Into<String>,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        ConstraintDef::Unique {
            name: name.into(),
            entity: entity.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Implicit constraint for a field declared `unique`.
    pub(crate) fn implicit_unique(entity: &str, field: &str) -> Self {
        Self::unique(format!("{}_{}_key", entity, field), entity, field)
    }

    /// Get the constraint name.
    pub fn name(&self) -> &str {
        match self {
            ConstraintDef::Unique { name, .. } => name,
        }
    }

    /// Get the entity this constraint applies to.
    pub fn entity(&self) -> &str {
        match self {
            ConstraintDef::Unique { entity, .. } => entity,
        }
    }

    /// Fields covered by the constraint.
    pub fn fields(&self) -> &[String] {
        match self {
            ConstraintDef::Unique { fields, .. } => fields,
        }
    }

    /// Whether this constraint covers exactly the given set of fields, in any order.
    pub fn covers_exactly(&self, fields: &[&str]) -> bool {
        let own = self.fields();
        own.len() == fields.len() && fields.iter().all(|f| own.iter().any(|o| o == f))
    }
}
