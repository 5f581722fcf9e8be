//! Extension points around saving a target record.

use crate::error::Error;
use crate::source::SourceRecord;
use crate::storage::{Record, TargetScope};

/// Per-record hooks invoked while a migrator runs.
///
/// Both hooks default to doing nothing. An error from either aborts the
/// unit and rolls back everything it wrote.
pub trait SaveHooks: Send + Sync {
    /// Adjust the target record before the skip check and validation.
    fn pre_save(&self, _source: &SourceRecord, _target: &mut Record) -> Result<(), Error> {
        Ok(())
    }

    /// Called after the target record has been inserted.
    ///
    /// `scope` is the unit's own transaction, so records written here commit
    /// or roll back together with the rest of the unit.
    fn post_save(
        &self,
        _source: &SourceRecord,
        _target: &Record,
        _scope: &mut dyn TargetScope,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl SaveHooks for NoHooks {}
