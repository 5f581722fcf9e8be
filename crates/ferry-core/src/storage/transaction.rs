//! Transactions over the target store.

use std::collections::BTreeMap;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use tracing::debug;

use super::engine::data_key;
use super::{EntityId, Record, StorageEngine};
use crate::catalog::{ConstraintDef, SchemaBundle};
use crate::constraint::{UniqueIndex, UniqueLookup};
use crate::error::Error;
use crate::value::Value;

/// A unique-index entry written on commit.
#[derive(Debug, Clone)]
struct StagedKey {
    id: EntityId,
    entity: String,
    constraint: String,
    value: String,
}

impl StagedKey {
    fn conflict(&self) -> Error {
        Error::Integrity {
            entity: self.entity.clone(),
            constraint: self.constraint.clone(),
            value: self.value.clone(),
        }
    }
}

/// A transaction for atomic multi-record inserts.
///
/// Inserts are buffered and applied in one sled transaction on commit.
/// Reads through the transaction see committed data plus its own pending
/// inserts. The schema is snapshotted when the transaction begins.
pub struct Transaction<'a> {
    engine: &'a StorageEngine,
    schema: SchemaBundle,
    pending: Vec<Record>,
    staged: BTreeMap<Vec<u8>, StagedKey>,
}

impl<'a> Transaction<'a> {
    /// Create a new transaction.
    pub(crate) fn new(engine: &'a StorageEngine) -> Self {
        Self {
            engine,
            schema: engine.catalog().current_schema().unwrap_or_default(),
            pending: Vec::new(),
            staged: BTreeMap::new(),
        }
    }

    /// The engine this transaction writes to.
    pub fn engine(&self) -> &'a StorageEngine {
        self.engine
    }

    /// The schema snapshot this transaction validates against.
    pub fn schema(&self) -> &SchemaBundle {
        &self.schema
    }

    /// Records inserted but not yet committed.
    pub fn pending(&self) -> &[Record] {
        &self.pending
    }

    /// Number of pending inserts.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Get a record by id, looking at pending inserts first.
    pub fn get(&self, entity: &str, id: &EntityId) -> Result<Option<Record>, Error> {
        if let Some(record) = self
            .pending
            .iter()
            .find(|r| r.entity == entity && r.id.as_ref() == Some(id))
        {
            return Ok(Some(record.clone()));
        }
        self.engine.get(entity, id)
    }

    /// Whether any committed or pending record of `entity` satisfies `pred`.
    pub(crate) fn any_record<F>(&self, entity: &str, pred: F) -> Result<bool, Error>
    where
        F: Fn(&Record) -> bool,
    {
        if self.pending.iter().any(|r| r.entity == entity && pred(r)) {
            return Ok(true);
        }
        for result in self.engine.scan_entity(entity) {
            if pred(&result?) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Stage a pending record and its unique-index entries.
    ///
    /// The record must already carry its id and defaults.
    pub(crate) fn stage(&mut self, record: Record) -> Result<EntityId, Error> {
        let id = record
            .id
            .ok_or_else(|| Error::Transaction("record staged without an id".to_string()))?;

        let mut keys = Vec::new();
        for constraint in self.schema.unique_constraints_for(&record.entity) {
            let values = record.values_for(constraint.fields());
            let Some(key) = UniqueIndex::build_key(&record.entity, constraint.name(), &values)
            else {
                continue;
            };

            let staged = StagedKey {
                id,
                entity: record.entity.clone(),
                constraint: constraint.name().to_string(),
                value: join_values(&values),
            };
            match self.owner_of(&key)? {
                Some(owner) if owner != id => return Err(staged.conflict()),
                _ => keys.push((key, staged)),
            }
        }

        self.staged.extend(keys);
        self.pending.push(record);
        Ok(id)
    }

    fn owner_of(&self, key: &[u8]) -> Result<Option<EntityId>, Error> {
        if let Some(staged) = self.staged.get(key) {
            return Ok(Some(staged.id));
        }
        self.engine.unique_index().lookup_key(key)
    }

    /// Commit the transaction atomically.
    ///
    /// Unique keys are checked again against committed data; a conflict
    /// aborts the whole commit with [`Error::Integrity`].
    pub fn commit(self) -> Result<usize, Error> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let mut rows = Vec::with_capacity(self.pending.len());
        for record in &self.pending {
            let Some(id) = record.id else {
                return Err(Error::Transaction(format!(
                    "pending record {} has no id",
                    record.identity()
                )));
            };
            rows.push((data_key(&record.entity, &id), record.to_bytes()?));
        }

        let data_tree = self.engine.data_tree();
        let index_tree = self.engine.unique_index().tree();

        let result: Result<(), TransactionError<Error>> =
            (data_tree, index_tree).transaction(|(data_tx, index_tx)| {
                for (key, bytes) in &rows {
                    data_tx.insert(key.as_slice(), bytes.as_slice())?;
                }
                for (key, staged) in &self.staged {
                    if let Some(existing) = index_tx.get(key.as_slice())? {
                        if existing.as_ref() != staged.id.as_slice() {
                            return Err(ConflictableTransactionError::Abort(staged.conflict()));
                        }
                    }
                    index_tx.insert(key.as_slice(), staged.id.as_slice())?;
                }
                Ok(())
            });

        match result {
            Ok(()) => {
                debug!(records = rows.len(), "committed transaction");
                Ok(rows.len())
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Error::Storage(e)),
        }
    }

    /// Discard all pending inserts.
    pub fn rollback(self) {
        debug!(records = self.pending.len(), "rolled back transaction");
    }
}

impl UniqueLookup for Transaction<'_> {
    fn find_unique(
        &self,
        constraint: &ConstraintDef,
        values: &[Value],
    ) -> Result<Option<EntityId>, Error> {
        match UniqueIndex::build_key(constraint.entity(), constraint.name(), values) {
            Some(key) => self.owner_of(&key),
            None => Ok(None),
        }
    }
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityDef, FieldDef};
    use crate::storage::{StorageConfig, TargetScope};

    fn engine() -> StorageEngine {
        let engine = StorageEngine::open(StorageConfig::temporary()).unwrap();
        engine
            .catalog()
            .apply_schema(SchemaBundle::new(1).with_entity(
                EntityDef::new("NewPoll").with_field(FieldDef::string("new_poll_name", 36).unique()),
            ))
            .unwrap();
        engine
    }

    fn poll(name: &str) -> Record {
        Record::new("NewPoll").with("new_poll_name", name)
    }

    #[test]
    fn test_pending_visible_inside_transaction() {
        let engine = engine();
        let mut txn = engine.begin();
        let id = txn.insert(&mut poll("derp")).unwrap();

        assert!(txn.get("NewPoll", &id).unwrap().is_some());
        assert!(engine.get("NewPoll", &id).unwrap().is_none());

        assert_eq!(txn.commit().unwrap(), 1);
        assert!(engine.get("NewPoll", &id).unwrap().is_some());
    }

    #[test]
    fn test_staged_unique_conflict() {
        let engine = engine();
        let mut txn = engine.begin();
        txn.insert(&mut poll("derp")).unwrap();

        let err = txn.insert(&mut poll("derp")).unwrap_err();
        assert!(matches!(err, Error::Integrity { ref constraint, .. } if constraint == "NewPoll_new_poll_name_key"));
        assert_eq!(txn.pending_count(), 1);
    }

    #[test]
    fn test_committed_unique_conflict() {
        let engine = engine();
        engine.atomic(|txn| txn.insert(&mut poll("derp"))).unwrap();

        let mut txn = engine.begin();
        assert!(matches!(
            txn.insert(&mut poll("derp")),
            Err(Error::Integrity { .. })
        ));
    }

    #[test]
    fn test_commit_rechecks_unique_keys() {
        let engine = engine();
        let mut first = engine.begin();
        let mut second = engine.begin();
        first.insert(&mut poll("derp")).unwrap();
        second.insert(&mut poll("derp")).unwrap();

        first.commit().unwrap();
        assert!(matches!(second.commit(), Err(Error::Integrity { .. })));
        assert_eq!(engine.count("NewPoll").unwrap(), 1);
    }

    #[test]
    fn test_rollback_leaves_nothing() {
        let engine = engine();
        let mut txn = engine.begin();
        txn.insert(&mut poll("a")).unwrap();
        txn.insert(&mut poll("b")).unwrap();
        txn.rollback();

        assert_eq!(engine.count("NewPoll").unwrap(), 0);
        assert_eq!(engine.unique_index().count_for_entity("NewPoll"), 0);
    }
}
