//! Storage engine implementation.

use super::{EntityId, Record, StorageConfig, Transaction};
use crate::catalog::Catalog;
use crate::constraint::UniqueIndex;
use crate::error::Error;
use sled::{Db, Tree};
use tracing::warn;

/// Tree name for entity data.
const DATA_TREE: &str = "data";

/// The target store wrapping sled.
pub struct StorageEngine {
    /// The underlying sled database.
    db: Db,

    /// Tree for entity data (`entity\0id` -> record).
    data_tree: Tree,

    /// Unique constraint index.
    unique_index: UniqueIndex,

    /// Target schema.
    catalog: Catalog,
}

impl StorageEngine {
    /// Open or create a storage engine with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let data_tree = db.open_tree(DATA_TREE)?;
        let unique_index = UniqueIndex::open(&db)?;
        let catalog = Catalog::open(&db)?;

        Ok(Self {
            db,
            data_tree,
            unique_index,
            catalog,
        })
    }

    /// The target catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The unique constraint index.
    pub fn unique_index(&self) -> &UniqueIndex {
        &self.unique_index
    }

    /// Get a committed record by id.
    pub fn get(&self, entity: &str, id: &EntityId) -> Result<Option<Record>, Error> {
        match self.data_tree.get(data_key(entity, id))? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Lazily iterate committed records of an entity.
    pub fn scan_entity(&self, entity: &str) -> impl Iterator<Item = Result<Record, Error>> + '_ {
        self.data_tree
            .scan_prefix(entity_prefix(entity))
            .map(|result| {
                let (_, bytes) = result?;
                Record::from_bytes(&bytes)
            })
    }

    /// Count committed records of an entity.
    pub fn count(&self, entity: &str) -> Result<usize, Error> {
        let mut count = 0;
        for result in self.data_tree.scan_prefix(entity_prefix(entity)) {
            result?;
            count += 1;
        }
        Ok(count)
    }

    /// Begin a new transaction.
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Run `f` inside a transaction.
    ///
    /// The transaction commits if `f` returns `Ok` and is rolled back
    /// otherwise; the error from `f` is returned unchanged.
    pub fn atomic<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, Error>,
    {
        let mut txn = self.begin();
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                warn!(pending = txn.pending_count(), error = %err, "rolling back transaction");
                txn.rollback();
                Err(err)
            }
        }
    }

    /// Like [`StorageEngine::atomic`], but the transaction is always rolled back.
    pub fn atomic_dry_run<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, Error>,
    {
        let mut txn = self.begin();
        let result = f(&mut txn);
        tracing::debug!(pending = txn.pending_count(), "dry run, discarding writes");
        txn.rollback();
        result
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Generate a new entity ID (UUID v4 bytes).
    pub fn generate_id() -> EntityId {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::time::{SystemTime, UNIX_EPOCH};

        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

        let time = now.to_le_bytes();
        let count = counter.to_be_bytes();

        // Bytes 9..16 hold the low 56 counter bits and never carry version or variant bits
        let mut id = [0u8; 16];
        id[..6].copy_from_slice(&time[..6]);
        id[6] = 0x40 | (time[6] & 0x0f);
        id[7] = time[7];
        id[8] = 0x80 | (time[6] >> 4);
        id[9..].copy_from_slice(&count[1..]);

        id
    }

    /// Get access to the underlying data tree (for transactions).
    pub(crate) fn data_tree(&self) -> &Tree {
        &self.data_tree
    }
}

/// Key of a record in the data tree.
pub(crate) fn data_key(entity: &str, id: &EntityId) -> Vec<u8> {
    let mut key = entity_prefix(entity);
    key.extend_from_slice(id);
    key
}

fn entity_prefix(entity: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(entity.len() + 17);
    prefix.extend_from_slice(entity.as_bytes());
    prefix.push(0);
    prefix
}
