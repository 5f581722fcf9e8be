//! Core error types.

use std::fmt;

use thiserror::Error;

use crate::constraint::FieldErrors;
use crate::storage::Record;

/// Errors raised while discovering, scheduling, or running migrators.
#[derive(Debug, Error)]
pub enum Error {
    /// Target storage error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Source database error.
    #[error("source error: {0}")]
    Source(#[from] rusqlite::Error),

    /// Report output could not be written.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A migrator is statically misconfigured.
    #[error("wrong definition: {0}")]
    Definition(String),

    /// The requested migrators depend on each other in a cycle.
    #[error("found a dependency cycle containing {unit}: {}", .path.join(" -> "))]
    DependencyCycle {
        /// Migrator at which the back edge was found.
        unit: String,
        /// Names along the cycle, starting and ending with `unit`.
        path: Vec<String>,
    },

    /// A requested migrator name is not registered.
    #[error("unknown migrator: {0}")]
    UnknownUnit(String),

    /// A declared dependency does not name a registered migrator.
    #[error("{unit} depends on unknown migrator {dependency}")]
    UnresolvedDependency {
        /// Migrator declaring the dependency.
        unit: String,
        /// The unresolvable name.
        dependency: String,
    },

    /// A constructed target record failed validation.
    #[error(transparent)]
    Validation(Box<ValidationFailure>),

    /// A write would break a unique constraint.
    #[error("unique constraint {constraint} violated on {entity}: {value}")]
    Integrity {
        /// Target entity.
        entity: String,
        /// Constraint name.
        constraint: String,
        /// Offending values, comma separated.
        value: String,
    },

    /// Transaction error.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A user hook failed.
    #[error("hook failed: {0}")]
    Hook(String),
}

impl Error {
    /// Shorthand for a definition error.
    pub fn definition(message: impl Into<String>) -> Self {
        Error::Definition(message.into())
    }

    /// Shorthand for a hook error.
    pub fn hook(message: impl Into<String>) -> Self {
        Error::Hook(message.into())
    }

    /// Whether this error points at a misconfigured migrator rather than at data.
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            Error::Definition(_) | Error::UnresolvedDependency { .. }
        )
    }

    /// The validation failure carried by this error, if any.
    pub fn as_validation(&self) -> Option<&ValidationFailure> {
        match self {
            Error::Validation(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<ValidationFailure> for Error {
    fn from(failure: ValidationFailure) -> Self {
        Error::Validation(Box::new(failure))
    }
}

/// A target record together with the field errors it failed validation with.
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    /// The record that failed.
    pub record: Record,
    /// Field name to ordered messages.
    pub errors: FieldErrors,
}

impl ValidationFailure {
    /// Create a validation failure.
    pub fn new(record: Record, errors: FieldErrors) -> Self {
        Self { record, errors }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed for {}: {}", self.record.identity(), self.errors)
    }
}

impl std::error::Error for ValidationFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_names_path() {
        let err = Error::DependencyCycle {
            unit: "deps.Spam".to_string(),
            path: vec![
                "deps.Spam".to_string(),
                "deps.Ham".to_string(),
                "deps.Spam".to_string(),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("deps.Spam"));
        assert!(text.contains("deps.Spam -> deps.Ham -> deps.Spam"));
    }

    #[test]
    fn test_definition_classification() {
        assert!(Error::definition("field not in target entity: x").is_definition());
        assert!(Error::UnresolvedDependency {
            unit: "a.A".to_string(),
            dependency: "b.B".to_string(),
        }
        .is_definition());
        assert!(!Error::UnknownUnit("x".to_string()).is_definition());
    }

    #[test]
    fn test_validation_roundtrip_through_error() {
        let mut errors = FieldErrors::new();
        errors.add("new_poll_name", "This field cannot be blank.");
        let failure = ValidationFailure::new(Record::new("NewPoll"), errors);

        let err: Error = failure.into();
        let failure = err.as_validation().unwrap();
        assert_eq!(failure.record.entity, "NewPoll");
        assert!(err.to_string().contains("NewPoll"));
    }
}
