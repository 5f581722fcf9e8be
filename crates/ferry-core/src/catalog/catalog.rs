//! Catalog manager for storing and retrieving the target schema.

use super::{EntityDef, SchemaBundle};
use crate::error::Error;
use parking_lot::RwLock;
use sled::{Db, Tree};
use std::sync::atomic::{AtomicU64, Ordering};

/// Tree name for schema bundles.
const SCHEMA_TREE: &str = "catalog:schemas";

/// Tree name for catalog metadata.
const META_TREE: &str = "catalog:meta";

/// Key for current schema version in meta tree.
const CURRENT_VERSION_KEY: &[u8] = b"current_version";

/// The catalog manager for schema metadata.
pub struct Catalog {
    schema_tree: Tree,
    meta_tree: Tree,
    current_version: AtomicU64,
    current_schema: RwLock<Option<SchemaBundle>>,
}

impl Catalog {
    /// Open or create a catalog using the given sled database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        let schema_tree = db.open_tree(SCHEMA_TREE)?;
        let meta_tree = db.open_tree(META_TREE)?;

        let current_version = match meta_tree.get(CURRENT_VERSION_KEY)? {
            Some(bytes) => decode_version(&bytes)?,
            None => 0,
        };

        let catalog = Self {
            schema_tree,
            meta_tree,
            current_version: AtomicU64::new(current_version),
            current_schema: RwLock::new(None),
        };

        if current_version > 0 {
            if let Some(schema) = catalog.schema_at_version(current_version)? {
                *catalog.current_schema.write() = Some(schema);
            }
        }

        Ok(catalog)
    }

    /// Get the current schema version (0 when no schema was applied).
    pub fn current_version(&self) -> u64 {
        self.current_version.load(Ordering::SeqCst)
    }

    /// Get the current schema bundle.
    pub fn current_schema(&self) -> Option<SchemaBundle> {
        self.current_schema.read().clone()
    }

    /// Get a schema bundle at a specific version.
    pub fn schema_at_version(&self, version: u64) -> Result<Option<SchemaBundle>, Error> {
        match self.schema_tree.get(version.to_be_bytes())? {
            Some(bytes) => Ok(Some(SchemaBundle::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Apply a new schema bundle and return its version.
    ///
    /// The stored version is always one past the current one, whatever the
    /// bundle says.
    pub fn apply_schema(&self, mut bundle: SchemaBundle) -> Result<u64, Error> {
        let new_version = self.current_version() + 1;
        bundle.version = new_version;

        self.schema_tree
            .insert(new_version.to_be_bytes(), bundle.to_bytes()?)?;
        self.meta_tree
            .insert(CURRENT_VERSION_KEY, &new_version.to_be_bytes())?;

        self.current_version.store(new_version, Ordering::SeqCst);
        *self.current_schema.write() = Some(bundle);

        tracing::debug!(version = new_version, "applied target schema");
        Ok(new_version)
    }

    /// Apply `bundle` unless the current schema already has the same definitions.
    ///
    /// Returns the version in effect afterwards.
    pub fn ensure_schema(&self, bundle: SchemaBundle) -> Result<u64, Error> {
        let unchanged = self
            .current_schema
            .read()
            .as_ref()
            .is_some_and(|current| current.same_definitions(&bundle));
        if unchanged {
            return Ok(self.current_version());
        }
        self.apply_schema(bundle)
    }

    /// Get an entity definition by name from the current schema.
    pub fn get_entity(&self, name: &str) -> Option<EntityDef> {
        self.current_schema
            .read()
            .as_ref()
            .and_then(|s| s.get_entity(name).cloned())
    }

    /// List all entity names in the current schema.
    pub fn list_entities(&self) -> Vec<String> {
        self.current_schema
            .read()
            .as_ref()
            .map(|s| s.entity_names().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    /// List all schema versions.
    pub fn list_versions(&self) -> Result<Vec<u64>, Error> {
        let mut versions = Vec::new();
        for result in self.schema_tree.iter() {
            let (key, _) = result?;
            versions.push(decode_version(&key)?);
        }
        versions.sort_unstable();
        Ok(versions)
    }
}

fn decode_version(bytes: &[u8]) -> Result<u64, Error> {
    let buf: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::Deserialization("invalid schema version key".to_string()))?;
    Ok(u64::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldDef;

    fn sample_schema() -> SchemaBundle {
        SchemaBundle::new(1)
            .with_entity(EntityDef::new("NewPoll").with_field(FieldDef::string("new_poll_name", 36)))
    }

    fn temp_db() -> Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    #[test]
    fn test_apply_and_read_schema() {
        let db = temp_db();
        let catalog = Catalog::open(&db).unwrap();
        assert_eq!(catalog.current_version(), 0);
        assert!(catalog.current_schema().is_none());

        let version = catalog.apply_schema(sample_schema()).unwrap();
        assert_eq!(version, 1);
        assert!(catalog.get_entity("NewPoll").is_some());
        assert_eq!(catalog.list_entities(), vec!["NewPoll".to_string()]);
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let db = temp_db();
        let catalog = Catalog::open(&db).unwrap();

        assert_eq!(catalog.ensure_schema(sample_schema()).unwrap(), 1);
        assert_eq!(catalog.ensure_schema(sample_schema()).unwrap(), 1);

        let changed = sample_schema().with_entity(EntityDef::new("Choice"));
        assert_eq!(catalog.ensure_schema(changed).unwrap(), 2);
        assert_eq!(catalog.list_versions().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_reopen_loads_current_schema() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = sled::open(dir.path()).unwrap();
            let catalog = Catalog::open(&db).unwrap();
            catalog.apply_schema(sample_schema()).unwrap();
            db.flush().unwrap();
        }

        let db = sled::open(dir.path()).unwrap();
        let catalog = Catalog::open(&db).unwrap();
        assert_eq!(catalog.current_version(), 1);
        assert!(catalog.get_entity("NewPoll").is_some());
    }
}
