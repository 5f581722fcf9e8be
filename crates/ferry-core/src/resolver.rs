//! Dependency ordering of requested migrators.
//!
//! Only the requested migrators are sorted. A dependency on a migrator that
//! was not requested is ignored: it neither runs nor constrains the order,
//! and it cannot be part of a reported cycle. It must still be registered.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::registry::Registry;
use crate::unit::MigratorDef;

/// A migrator placed in the execution order under the name it was requested by.
#[derive(Debug, Clone)]
pub struct ScheduledUnit {
    /// Qualified name.
    pub name: String,
    /// The definition.
    pub def: Arc<MigratorDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Traversal state for one `resolve` call, keyed by definition identity.
struct Traversal<'a> {
    available: &'a Registry,
    requested: HashMap<*const MigratorDef, &'a str>,
    marks: HashMap<*const MigratorDef, Mark>,
    path: Vec<&'a str>,
    order: Vec<ScheduledUnit>,
}

impl<'a> Traversal<'a> {
    fn visit(&mut self, name: &'a str, def: &'a Arc<MigratorDef>) -> Result<(), Error> {
        let key = Arc::as_ptr(def);
        match self.marks.get(&key) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = self.path.iter().position(|n| *n == name).unwrap_or(0);
                let mut path: Vec<String> = self.path[start..].iter().map(|n| n.to_string()).collect();
                path.push(name.to_string());
                return Err(Error::DependencyCycle {
                    unit: name.to_string(),
                    path,
                });
            }
            None => {}
        }

        self.marks.insert(key, Mark::InProgress);
        self.path.push(name);

        let available = self.available;
        for dependency in def.dependencies() {
            let dep = available
                .get(dependency)
                .ok_or_else(|| Error::UnresolvedDependency {
                    unit: name.to_string(),
                    dependency: dependency.clone(),
                })?;
            let Some(dep_name) = self.requested.get(&Arc::as_ptr(dep)).copied() else {
                continue;
            };
            self.visit(dep_name, dep)?;
        }

        self.path.pop();
        self.marks.insert(key, Mark::Done);
        self.order.push(ScheduledUnit {
            name: name.to_string(),
            def: Arc::clone(def),
        });
        Ok(())
    }
}

/// Order `requested` so that every migrator runs after the requested
/// migrators it depends on.
///
/// Fails with [`Error::DependencyCycle`] when requested migrators depend on
/// each other in a cycle and with [`Error::UnresolvedDependency`] when a
/// dependency is not registered. All traversal state is local to the call.
pub fn resolve(
    requested: &[(String, Arc<MigratorDef>)],
    available: &Registry,
) -> Result<Vec<ScheduledUnit>, Error> {
    let mut traversal = Traversal {
        available,
        requested: HashMap::with_capacity(requested.len()),
        marks: HashMap::with_capacity(requested.len()),
        path: Vec::new(),
        order: Vec::with_capacity(requested.len()),
    };

    for (name, def) in requested {
        traversal
            .requested
            .entry(Arc::as_ptr(def))
            .or_insert(name.as_str());
    }

    for (name, def) in requested {
        let name = traversal
            .requested
            .get(&Arc::as_ptr(def))
            .copied()
            .unwrap_or(name.as_str());
        traversal.visit(name, def)?;
    }

    Ok(traversal.order)
}
