//! Migrator discovery.
//!
//! Migrators are declared in modules grouped under a namespace. Each module
//! exports an explicit list of the migrators it wants to be runnable;
//! discovery turns the namespace into a [`Registry`] keyed by
//! `"<module>.<Ident>"`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::unit::MigratorDef;

/// A module of migrator definitions with an export allow-list.
pub struct UnitModule {
    name: String,
    exports: Vec<String>,
    definitions: HashMap<String, Arc<MigratorDef>>,
}

impl UnitModule {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: Vec::new(),
            definitions: HashMap::new(),
        }
    }

    /// Define a migrator in this module. It is not runnable until exported.
    pub fn define(mut self, def: MigratorDef) -> Self {
        self.definitions
            .insert(def.ident().to_string(), Arc::new(def));
        self
    }

    /// Add an identifier to the export list.
    pub fn export(mut self, ident: impl Into<String>) -> Self {
        self.exports.push(ident.into());
        self
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared exports, in order.
    pub fn exports(&self) -> &[String] {
        &self.exports
    }

    /// Look up a definition by identifier, exported or not.
    pub fn definition(&self, ident: &str) -> Option<&Arc<MigratorDef>> {
        self.definitions.get(ident)
    }
}

/// A named collection of migrator modules.
pub struct Namespace {
    name: String,
    modules: Vec<UnitModule>,
}

impl Namespace {
    /// Create an empty namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: Vec::new(),
        }
    }

    /// Add a module.
    pub fn with_module(mut self, module: UnitModule) -> Self {
        self.modules.push(module);
        self
    }

    /// Namespace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Modules in declaration order.
    pub fn modules(&self) -> &[UnitModule] {
        &self.modules
    }
}

/// Build a registry from every export of every module in `namespace`.
///
/// Modules are visited in name order and exports in declared order. An
/// export naming something its module does not define fails the whole pass.
pub fn discover(namespace: &Namespace) -> Result<Registry, Error> {
    let mut modules: Vec<&UnitModule> = namespace.modules.iter().collect();
    modules.sort_by(|a, b| a.name.cmp(&b.name));

    let mut registry = Registry::new();
    for module in modules {
        for ident in &module.exports {
            let def = module.definition(ident).ok_or_else(|| {
                Error::definition(format!(
                    "module {} exports {} but does not define it",
                    module.name, ident
                ))
            })?;
            registry.register(format!("{}.{}", module.name, ident), Arc::clone(def))?;
        }
    }

    debug!(namespace = %namespace.name, units = registry.len(), "discovered migrators");
    Ok(registry)
}

/// Migrators by qualified name, in registration order.
#[derive(Default)]
pub struct Registry {
    units: Vec<(String, Arc<MigratorDef>)>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migrator under `name`. Names must be unique.
    pub fn register(&mut self, name: impl Into<String>, def: Arc<MigratorDef>) -> Result<(), Error> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(Error::definition(format!(
                "migrator {} registered twice",
                name
            )));
        }
        self.index.insert(name.clone(), self.units.len());
        self.units.push((name, def));
        Ok(())
    }

    /// Get a migrator by qualified name.
    pub fn get(&self, name: &str) -> Option<&Arc<MigratorDef>> {
        self.index.get(name).map(|&i| &self.units[i].1)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Iterate names and definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<MigratorDef>)> {
        self.units.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Number of registered migrators.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, idents: &[&str]) -> UnitModule {
        let mut module = UnitModule::new(name);
        for ident in idents {
            module = module
                .define(MigratorDef::new(*ident, "NewPoll"))
                .export(*ident);
        }
        module
    }

    #[test]
    fn test_discover_qualified_names() {
        let namespace = Namespace::new("migrators")
            .with_module(module("polls", &["PollsMigrator", "AppendingPollsMigrator"]))
            .with_module(module("choices", &["ChoicesMigrator"]));

        let registry = discover(&namespace).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "choices.ChoicesMigrator",
                "polls.PollsMigrator",
                "polls.AppendingPollsMigrator",
            ]
        );
        assert_eq!(
            registry.get("polls.PollsMigrator").map(|d| d.ident()),
            Some("PollsMigrator")
        );
    }

    #[test]
    fn test_unexported_definitions_are_not_registered() {
        let polls = UnitModule::new("polls")
            .define(MigratorDef::new("PollsMigrator", "NewPoll"))
            .define(MigratorDef::new("SkippingPollsMigrator", "NewPoll"))
            .export("PollsMigrator");

        let registry = discover(&Namespace::new("migrators").with_module(polls)).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("polls.SkippingPollsMigrator"));
    }

    #[test]
    fn test_unresolved_export_fails() {
        let polls = module("polls", &["PollsMigrator"]).export("Missing");
        let err = discover(&Namespace::new("migrators").with_module(polls))
            .err()
            .unwrap();
        assert!(err.is_definition());
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn test_duplicate_key_fails() {
        let polls = module("polls", &["PollsMigrator"]).export("PollsMigrator");
        assert!(discover(&Namespace::new("migrators").with_module(polls)).is_err());
    }

    #[test]
    fn test_register_and_iter() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        registry
            .register("a.A", Arc::new(MigratorDef::new("A", "T")))
            .unwrap();
        registry
            .register("b.B", Arc::new(MigratorDef::new("B", "T")))
            .unwrap();

        let names: Vec<&str> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a.A", "b.B"]);
    }
}
