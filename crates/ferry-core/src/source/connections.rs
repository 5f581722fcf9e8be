//! Named SQLite connections for tabular sources.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;

use crate::error::Error;

/// Connection name used when a source does not name one.
pub const DEFAULT_CONNECTION: &str = "default";

/// Source database connections keyed by name.
#[derive(Default)]
pub struct SourceConnections {
    connections: HashMap<String, Connection>,
}

impl SourceConnections {
    /// Create an empty set of connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a SQLite database file under `name`.
    pub fn open(&mut self, name: impl Into<String>, path: impl AsRef<Path>) -> Result<(), Error> {
        let name = name.into();
        let conn = Connection::open(path.as_ref())?;
        tracing::debug!(connection = %name, path = %path.as_ref().display(), "opened source database");
        self.connections.insert(name, conn);
        Ok(())
    }

    /// Register an already open connection.
    pub fn insert(&mut self, name: impl Into<String>, conn: Connection) {
        self.connections.insert(name.into(), conn);
    }

    /// Open an in-memory database under `name` and return it.
    pub fn in_memory(&mut self, name: impl Into<String>) -> Result<&Connection, Error> {
        let name = name.into();
        self.connections
            .insert(name.clone(), Connection::open_in_memory()?);
        self.get(&name)
    }

    /// Get a connection by name.
    pub fn get(&self, name: &str) -> Result<&Connection, Error> {
        self.connections
            .get(name)
            .ok_or_else(|| Error::definition(format!("no source connection named {}", name)))
    }

    /// Names of all registered connections, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.connections.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
