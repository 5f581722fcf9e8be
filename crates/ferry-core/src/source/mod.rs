//! Record sources.
//!
//! A migrator reads its input from a [`RecordSource`]: either committed
//! records of another entity in the target store ([`EntitySource`]) or the
//! rows of a query against a SQLite connection ([`SqlSource`]). Both push
//! one [`SourceRecord`] at a time into a sink, so nothing requires the whole
//! input to fit in memory.

mod connections;
mod entity;
mod filter;
mod record;
mod sql;

use std::collections::BTreeSet;

pub use connections::{SourceConnections, DEFAULT_CONNECTION};
pub use entity::EntitySource;
pub use filter::RecordFilter;
pub use record::SourceRecord;
pub use sql::SqlSource;

use crate::error::Error;
use crate::storage::StorageEngine;

/// What a source may read from while it is scanned.
#[derive(Clone, Copy)]
pub struct SourceContext<'a> {
    /// Committed target data.
    pub store: &'a StorageEngine,
    /// Named source database connections.
    pub connections: &'a SourceConnections,
}

impl<'a> SourceContext<'a> {
    /// Create a source context.
    pub fn new(store: &'a StorageEngine, connections: &'a SourceConnections) -> Self {
        Self { store, connections }
    }
}

/// Callback receiving source records one at a time.
pub type RecordSink<'s> = dyn FnMut(SourceRecord) -> Result<(), Error> + 's;

/// A producer of named-field records.
pub trait RecordSource: Send + Sync {
    /// Field names every record will carry, when known before scanning.
    fn fields(&self, ctx: &SourceContext<'_>) -> Result<Option<BTreeSet<String>>, Error>;

    /// Push every record into `sink`, stopping at the first error.
    fn scan(&self, ctx: &SourceContext<'_>, sink: &mut RecordSink<'_>) -> Result<(), Error>;

    /// Short description for logs.
    fn describe(&self) -> String;
}
