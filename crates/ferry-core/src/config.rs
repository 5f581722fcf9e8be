//! Run configuration.

use std::path::PathBuf;

use crate::error::Error;
use crate::source::{SourceConnections, DEFAULT_CONNECTION};
use crate::storage::StorageConfig;

/// A named source database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Connection name migrators refer to.
    pub name: String,
    /// Path of the SQLite database file.
    pub path: PathBuf,
}

impl SourceSpec {
    /// Create a source spec.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Parse `NAME=PATH`, or a bare `PATH` bound to the default connection.
    pub fn parse(spec: &str) -> Result<Self, Error> {
        match spec.split_once('=') {
            Some((name, path)) if !name.is_empty() && !path.is_empty() => {
                Ok(Self::new(name, path))
            }
            Some(_) => Err(Error::definition(format!(
                "invalid source {:?}, expected NAME=PATH",
                spec
            ))),
            None if !spec.is_empty() => Ok(Self::new(DEFAULT_CONNECTION, spec)),
            None => Err(Error::definition("empty source path")),
        }
    }
}

/// Configuration for a migration run.
#[derive(Debug, Clone, Default)]
pub struct FerryConfig {
    /// Target store configuration.
    pub storage: StorageConfig,
    /// Source databases to open.
    pub sources: Vec<SourceSpec>,
    /// Roll back every unit instead of committing.
    pub dry_run: bool,
}

impl FerryConfig {
    /// Create a configuration with the target store at `data_path`.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig::new(data_path),
            ..Default::default()
        }
    }

    /// Replace the storage configuration.
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Add a source database.
    pub fn with_source(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.sources.push(SourceSpec::new(name, path));
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Open every configured source database.
    pub fn open_sources(&self) -> Result<SourceConnections, Error> {
        let mut connections = SourceConnections::new();
        for source in &self.sources {
            connections.open(source.name.clone(), &source.path)?;
        }
        Ok(connections)
    }
}
