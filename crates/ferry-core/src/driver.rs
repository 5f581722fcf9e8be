//! Runs a selection of migrators in dependency order.

use std::fmt::Write as _;
use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::{Error, ValidationFailure};
use crate::registry::Registry;
use crate::resolver::{resolve, ScheduledUnit};
use crate::unit::{run_migration, MigrationContext, MigratorDef, UnitStats};

/// Outcome of one migrator within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    /// Qualified name.
    pub name: String,
    /// Record counters.
    pub stats: UnitStats,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Units in the order they ran.
    pub units: Vec<UnitReport>,
    /// Whether every unit was rolled back.
    pub dry_run: bool,
}

impl RunSummary {
    /// Total records inserted across units.
    pub fn saved(&self) -> u64 {
        self.units.iter().map(|u| u.stats.saved).sum()
    }
}

/// Look up the migrators to run. No names selects every migrator.
///
/// Fails with [`Error::UnknownUnit`] on the first name that is not
/// registered.
pub fn select(registry: &Registry, names: &[String]) -> Result<Vec<(String, Arc<MigratorDef>)>, Error> {
    if names.is_empty() {
        return Ok(registry
            .iter()
            .map(|(name, def)| (name.to_string(), Arc::clone(def)))
            .collect());
    }

    names
        .iter()
        .map(|name| {
            registry
                .get(name)
                .map(|def| (name.clone(), Arc::clone(def)))
                .ok_or_else(|| Error::UnknownUnit(name.clone()))
        })
        .collect()
}

/// Select and order migrators without touching any store.
pub fn plan(registry: &Registry, names: &[String]) -> Result<Vec<ScheduledUnit>, Error> {
    let requested = select(registry, names)?;
    resolve(&requested, registry)
}

/// Drives migrator runs against one target store.
pub struct Driver<'a> {
    registry: &'a Registry,
    ctx: MigrationContext<'a>,
}

impl<'a> Driver<'a> {
    /// Create a driver.
    pub fn new(registry: &'a Registry, ctx: MigrationContext<'a>) -> Self {
        Self { registry, ctx }
    }

    /// Look up the migrators to run. See [`select`].
    pub fn select(&self, names: &[String]) -> Result<Vec<(String, Arc<MigratorDef>)>, Error> {
        select(self.registry, names)
    }

    /// Select, order, and run migrators, writing progress to `out`.
    ///
    /// Nothing runs if selection or ordering fails. The run stops at the
    /// first unit that fails; units that already finished stay committed.
    pub fn run(&self, names: &[String], out: &mut dyn Write) -> Result<RunSummary, Error> {
        let order = plan(self.registry, names)?;

        let mut summary = RunSummary {
            units: Vec::with_capacity(order.len()),
            dry_run: self.ctx.dry_run,
        };
        for unit in order {
            writeln!(out, "running migrator {}", unit.name)?;
            info!(unit = %unit.name, "running migrator");

            let stats = run_migration(&unit.def, &self.ctx)?;
            summary.units.push(UnitReport {
                name: unit.name,
                stats,
            });
        }

        info!(units = summary.units.len(), saved = summary.saved(), "run finished");
        Ok(summary)
    }
}

/// Render a validation failure for humans, one line per message.
pub fn format_validation_failure(failure: &ValidationFailure) -> String {
    let mut text = String::from("ValidationError\n");
    let _ = writeln!(text, "Object: {}", failure.record);
    text.push_str("Errors:\n");
    for (field, messages) in failure.errors.iter() {
        for message in messages {
            let _ = writeln!(text, "{:>20}: {}", field, message);
        }
    }
    text
}
