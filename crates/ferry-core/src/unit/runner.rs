//! Executes one migrator against the target store.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use super::MigratorDef;
use crate::error::{Error, ValidationFailure};
use crate::source::{RecordSource, SourceConnections, SourceContext, SourceRecord};
use crate::storage::{Record, StorageEngine, TargetScope, Transaction};

/// Everything a migrator run needs from the outside.
#[derive(Clone, Copy)]
pub struct MigrationContext<'a> {
    /// Target store.
    pub store: &'a StorageEngine,
    /// Source database connections.
    pub connections: &'a SourceConnections,
    /// Roll back every unit instead of committing.
    pub dry_run: bool,
}

impl<'a> MigrationContext<'a> {
    /// Create a context that commits.
    pub fn new(store: &'a StorageEngine, connections: &'a SourceConnections) -> Self {
        Self {
            store,
            connections,
            dry_run: false,
        }
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The view handed to record sources.
    pub fn source_context(&self) -> SourceContext<'a> {
        SourceContext::new(self.store, self.connections)
    }
}

/// Counters for one unit run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnitStats {
    /// Source records read.
    pub read: u64,
    /// Source records skipped because a matching target existed.
    pub skipped: u64,
    /// Target records inserted.
    pub saved: u64,
}

/// Run one migrator inside a single transaction.
///
/// Every target record is built, optionally skipped, validated, and inserted
/// in source order. Any error, including a validation failure, rolls back
/// every insert made by this run. In dry-run mode the transaction is rolled
/// back even on success.
pub fn run_migration(def: &MigratorDef, ctx: &MigrationContext<'_>) -> Result<UnitStats, Error> {
    let source = def
        .record_source()
        .ok_or_else(|| Error::definition(format!("{} has no record source", def.ident())))?;
    let source_ctx = ctx.source_context();

    let stats = if ctx.dry_run {
        ctx.store
            .atomic_dry_run(|txn| run_in_scope(def, source, &source_ctx, txn))?
    } else {
        ctx.store
            .atomic(|txn| run_in_scope(def, source, &source_ctx, txn))?
    };

    info!(
        target_entity = def.target(),
        read = stats.read,
        saved = stats.saved,
        skipped = stats.skipped,
        dry_run = ctx.dry_run,
        "migrated {}",
        def.ident()
    );
    Ok(stats)
}

fn run_in_scope(
    def: &MigratorDef,
    source: &dyn RecordSource,
    source_ctx: &SourceContext<'_>,
    txn: &mut Transaction<'_>,
) -> Result<UnitStats, Error> {
    let writable = txn.writable_fields(def.target())?;
    check_definition(def, source, source_ctx, &writable)?;

    let mut stats = UnitStats::default();
    source.scan(source_ctx, &mut |record| {
        stats.read += 1;
        if migrate_record(def, &record, txn)? {
            stats.saved += 1;
        } else {
            stats.skipped += 1;
        }
        Ok(())
    })?;
    Ok(stats)
}

/// Reject definitions that would write fields the target does not have.
fn check_definition(
    def: &MigratorDef,
    source: &dyn RecordSource,
    source_ctx: &SourceContext<'_>,
    writable: &BTreeSet<String>,
) -> Result<(), Error> {
    for field in def.written_fields().chain(def.skip_fields().iter().map(String::as_str)) {
        if !writable.contains(field) {
            return Err(Error::definition(format!(
                "field not in target entity {}: {}",
                def.target(),
                field
            )));
        }
    }

    if let Some(available) = source.fields(source_ctx)? {
        for (from, _) in def.mappings() {
            if !available.contains(from) {
                return Err(Error::definition(format!(
                    "column {} not in {}",
                    from,
                    source.describe()
                )));
            }
        }
    }

    Ok(())
}

/// Build, check, and insert the target record for one source record.
///
/// Returns `false` when the record was skipped.
fn migrate_record(
    def: &MigratorDef,
    source: &SourceRecord,
    scope: &mut dyn TargetScope,
) -> Result<bool, Error> {
    let mut target = Record::new(def.target());

    for (from, to) in def.mappings() {
        target.set(to.clone(), source.require(from)?.clone());
    }
    for (field, compute) in def.computed() {
        target.set(field, compute(source)?);
    }

    let hooks = def.save_hooks();
    hooks.pre_save(source, &mut target)?;

    if !def.skip_fields().is_empty() {
        let filter: Vec<_> = def
            .skip_fields()
            .iter()
            .map(|f| (f.clone(), target.get(f).clone()))
            .collect();
        if scope.exists_matching(def.target(), &filter)? {
            debug!(record = %target, "matching record exists, skipping");
            return Ok(false);
        }
    }

    if !def.skips_validation() {
        let errors = scope.validate(&target)?;
        if !errors.is_empty() {
            return Err(ValidationFailure::new(target, errors).into());
        }
    }

    scope.insert(&mut target)?;
    hooks.post_save(source, &target, scope)?;
    Ok(true)
}
