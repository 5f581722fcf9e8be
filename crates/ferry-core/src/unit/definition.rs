//! Migrator definitions.

use std::fmt;
use std::sync::Arc;

use super::hooks::{NoHooks, SaveHooks};
use crate::error::Error;
use crate::source::{RecordSource, SourceRecord};
use crate::value::Value;

/// Computes one target field from a source record.
pub type ComputeFn = dyn Fn(&SourceRecord) -> Result<Value, Error> + Send + Sync;

/// A statically declared migration unit.
///
/// Definitions are immutable once built and are shared through `Arc` by the
/// registry; nothing about a particular run is stored on them.
pub struct MigratorDef {
    ident: String,
    target: String,
    source: Option<Arc<dyn RecordSource>>,
    mappings: Vec<(String, String)>,
    computed: Vec<(String, Box<ComputeFn>)>,
    depends_on: Vec<String>,
    skip_on_match: Vec<String>,
    skip_validation: bool,
    hooks: Box<dyn SaveHooks>,
}

impl MigratorDef {
    /// Start a definition writing into `target`.
    pub fn new(ident: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            target: target.into(),
            source: None,
            mappings: Vec::new(),
            computed: Vec::new(),
            depends_on: Vec::new(),
            skip_on_match: Vec::new(),
            skip_validation: false,
            hooks: Box::new(NoHooks),
        }
    }

    /// Set the record source.
    pub fn source(mut self, source: impl RecordSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Copy source field `from` into target field `to`.
    pub fn map(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.mappings.push((from.into(), to.into()));
        self
    }

    /// Compute target field `field` from the whole source record.
    pub fn compute<F>(mut self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&SourceRecord) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.computed.push((field.into(), Box::new(f)));
        self
    }

    /// Declare a dependency on another migrator by its registry name.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Skip source records whose target values for these fields already exist.
    pub fn skip_on_match<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_on_match.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Persist target records without validating them first.
    pub fn skip_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    /// Install save hooks.
    pub fn hooks(mut self, hooks: impl SaveHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Identifier within the defining module.
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Target entity name.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The record source, if one was set.
    pub fn record_source(&self) -> Option<&dyn RecordSource> {
        self.source.as_deref()
    }

    /// Static field mappings, source to target.
    pub fn mappings(&self) -> &[(String, String)] {
        &self.mappings
    }

    /// Computed field mappings.
    pub fn computed(&self) -> impl Iterator<Item = (&str, &ComputeFn)> {
        self.computed.iter().map(|(name, f)| (name.as_str(), f.as_ref()))
    }

    /// Registry names this migrator must run after.
    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    /// Fields compared by the skip-on-match check.
    pub fn skip_fields(&self) -> &[String] {
        &self.skip_on_match
    }

    /// Whether validation is skipped.
    pub fn skips_validation(&self) -> bool {
        self.skip_validation
    }

    /// The save hooks.
    pub fn save_hooks(&self) -> &dyn SaveHooks {
        self.hooks.as_ref()
    }

    /// Target fields this definition writes, in application order.
    pub fn written_fields(&self) -> impl Iterator<Item = &str> {
        self.mappings
            .iter()
            .map(|(_, to)| to.as_str())
            .chain(self.computed.iter().map(|(name, _)| name.as_str()))
    }
}

impl fmt::Debug for MigratorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigratorDef")
            .field("ident", &self.ident)
            .field("target", &self.target)
            .field("source", &self.source.as_ref().map(|s| s.describe()))
            .field("mappings", &self.mappings)
            .field(
                "computed",
                &self.computed.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field("depends_on", &self.depends_on)
            .field("skip_on_match", &self.skip_on_match)
            .field("skip_validation", &self.skip_validation)
            .finish()
    }
}
