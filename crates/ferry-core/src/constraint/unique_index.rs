//! Secondary index for enforcing unique constraints.
//!
//! The UniqueIndex maintains a separate sled tree that maps unique field values
//! to entity IDs, enabling duplicate detection without scanning.

use sled::Tree;

use crate::error::Error;
use crate::storage::EntityId;
use crate::value::Value;

/// Tree name for unique constraint index.
pub const UNIQUE_INDEX_TREE: &str = "index:unique";

/// Secondary index for enforcing unique constraints.
///
/// Key format: `entity\0constraint\0value1\0value2...` -> `entity_id`
pub struct UniqueIndex {
    tree: Tree,
}

impl UniqueIndex {
    /// Open or create the unique index from a sled database.
    pub fn open(db: &sled::Db) -> Result<Self, Error> {
        let tree = db.open_tree(UNIQUE_INDEX_TREE)?;
        Ok(Self { tree })
    }

    /// Build the index key for a set of constrained values.
    ///
    /// Returns `None` when any value is null: nulls never conflict.
    pub fn build_key(entity: &str, constraint: &str, values: &[Value]) -> Option<Vec<u8>> {
        if values.iter().any(Value::is_null) {
            return None;
        }

        let mut key = Vec::new();
        key.extend_from_slice(entity.as_bytes());
        key.push(0);
        key.extend_from_slice(constraint.as_bytes());
        for value in values {
            key.push(0);
            key.extend_from_slice(value.index_fragment().as_bytes());
        }
        Some(key)
    }

    /// Look up the entity ID owning a unique value.
    pub fn lookup(
        &self,
        entity: &str,
        constraint: &str,
        values: &[Value],
    ) -> Result<Option<EntityId>, Error> {
        match Self::build_key(entity, constraint, values) {
            Some(key) => self.lookup_key(&key),
            None => Ok(None),
        }
    }

    /// Look up the entity ID stored under an already built key.
    pub fn lookup_key(&self, key: &[u8]) -> Result<Option<EntityId>, Error> {
        Ok(self.tree.get(key)?.and_then(|bytes| decode_id(&bytes)))
    }

    /// Count entries for an entity.
    pub fn count_for_entity(&self, entity: &str) -> usize {
        let mut prefix = entity.as_bytes().to_vec();
        prefix.push(0);
        self.tree.scan_prefix(prefix).count()
    }

    /// The backing tree, for multi-tree transactions.
    pub(crate) fn tree(&self) -> &Tree {
        &self.tree
    }
}

/// Decode a stored entity id.
pub(crate) fn decode_id(bytes: &[u8]) -> Option<EntityId> {
    bytes.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> UniqueIndex {
        let db = sled::Config::new().temporary(true).open().unwrap();
        UniqueIndex::open(&db).unwrap()
    }

    #[test]
    fn test_key_format() {
        let key = UniqueIndex::build_key(
            "Choice",
            "choice_unique",
            &[Value::from("p1"), Value::from(2)],
        )
        .unwrap();
        assert_eq!(key, b"Choice\0choice_unique\0s:p1\0i:2".to_vec());
    }

    #[test]
    fn test_nul_in_value_keeps_keys_distinct() {
        let first = UniqueIndex::build_key(
            "Choice",
            "c",
            &[Value::from("x\0s:y"), Value::from("z")],
        );
        let second = UniqueIndex::build_key(
            "Choice",
            "c",
            &[Value::from("x"), Value::from("y\0s:z")],
        );
        assert_ne!(first, second);
    }

    #[test]
    fn test_null_values_are_not_indexed() {
        assert!(UniqueIndex::build_key("NewPoll", "k", &[Value::Null]).is_none());
        assert!(index().lookup("NewPoll", "k", &[Value::Null]).unwrap().is_none());
    }

    #[test]
    fn test_lookup() {
        let index = index();
        let values = [Value::from("derp")];
        let key = UniqueIndex::build_key("NewPoll", "NewPoll_new_poll_name_key", &values).unwrap();
        index.tree().insert(key, &[9u8; 16]).unwrap();

        assert_eq!(
            index
                .lookup("NewPoll", "NewPoll_new_poll_name_key", &values)
                .unwrap(),
            Some([9u8; 16])
        );
        assert!(index
            .lookup("NewPoll", "NewPoll_new_poll_name_key", &[Value::from("other")])
            .unwrap()
            .is_none());
        assert_eq!(index.count_for_entity("NewPoll"), 1);
        assert_eq!(index.count_for_entity("Choice"), 0);
    }
}
