//! Record-to-record source over a target store entity.

use std::collections::BTreeSet;

use super::{RecordFilter, RecordSink, RecordSource, SourceContext, SourceRecord};
use crate::catalog::EntityDef;
use crate::error::Error;
use crate::value::Value;

/// Reads committed records of one entity, optionally filtered.
#[derive(Debug, Clone)]
pub struct EntitySource {
    entity: String,
    filter: Option<RecordFilter>,
}

impl EntitySource {
    /// Every record of the entity.
    pub fn all(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            filter: None,
        }
    }

    /// Records of the entity matching `filter`.
    pub fn filtered(entity: impl Into<String>, filter: RecordFilter) -> Self {
        Self {
            entity: entity.into(),
            filter: Some(filter),
        }
    }

    /// The source entity name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    fn entity_def(&self, ctx: &SourceContext<'_>) -> Result<EntityDef, Error> {
        ctx.store
            .catalog()
            .get_entity(&self.entity)
            .ok_or_else(|| Error::definition(format!("unknown source entity: {}", self.entity)))
    }
}

impl RecordSource for EntitySource {
    fn fields(&self, ctx: &SourceContext<'_>) -> Result<Option<BTreeSet<String>>, Error> {
        Ok(Some(self.entity_def(ctx)?.field_names()))
    }

    fn scan(&self, ctx: &SourceContext<'_>, sink: &mut RecordSink<'_>) -> Result<(), Error> {
        let def = self.entity_def(ctx)?;

        for result in ctx.store.scan_entity(&self.entity) {
            let stored = result?;
            let mut record = SourceRecord {
                id: stored.id,
                fields: stored.fields,
            };
            for field in &def.fields {
                record
                    .fields
                    .entry(field.name.clone())
                    .or_insert(Value::Null);
            }

            if self.filter.as_ref().map_or(true, |f| f.matches(&record)) {
                sink(record)?;
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match self.filter {
            Some(_) => format!("entity {} (filtered)", self.entity),
            None => format!("entity {}", self.entity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, ScalarType, SchemaBundle};
    use crate::source::SourceConnections;
    use crate::storage::{Record, StorageConfig, StorageEngine, TargetScope};

    fn engine() -> StorageEngine {
        let engine = StorageEngine::open(StorageConfig::temporary()).unwrap();
        engine
            .catalog()
            .apply_schema(
                SchemaBundle::new(1).with_entity(
                    EntityDef::new("OldPoll")
                        .with_field(FieldDef::string("old_poll_name", 36))
                        .with_field(FieldDef::optional("note", ScalarType::String)),
                ),
            )
            .unwrap();
        engine
            .atomic(|txn| {
                for name in ["derp", "spam", "ham"] {
                    txn.insert(&mut Record::new("OldPoll").with("old_poll_name", name))?;
                }
                Ok(())
            })
            .unwrap();
        engine
    }

    fn collect(source: &EntitySource, ctx: &SourceContext<'_>) -> Vec<SourceRecord> {
        let mut records = Vec::new();
        source
            .scan(ctx, &mut |record| {
                records.push(record);
                Ok(())
            })
            .unwrap();
        records
    }

    #[test]
    fn test_scan_all_fills_declared_fields() {
        let engine = engine();
        let connections = SourceConnections::new();
        let ctx = SourceContext::new(&engine, &connections);

        let records = collect(&EntitySource::all("OldPoll"), &ctx);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.get("note") == Some(&Value::Null)));
        assert!(records.iter().all(|r| r.id.is_some()));
    }

    #[test]
    fn test_filtered() {
        let engine = engine();
        let connections = SourceConnections::new();
        let ctx = SourceContext::new(&engine, &connections);

        let source = EntitySource::filtered("OldPoll", RecordFilter::ne("old_poll_name", "ham"));
        assert_eq!(collect(&source, &ctx).len(), 2);
        assert_eq!(source.describe(), "entity OldPoll (filtered)");
    }

    #[test]
    fn test_unknown_entity() {
        let engine = engine();
        let connections = SourceConnections::new();
        let ctx = SourceContext::new(&engine, &connections);

        let source = EntitySource::all("Nope");
        assert!(source.fields(&ctx).unwrap_err().is_definition());
        assert!(source.scan(&ctx, &mut |_| Ok(())).unwrap_err().is_definition());
    }

    #[test]
    fn test_sink_error_stops_scan() {
        let engine = engine();
        let connections = SourceConnections::new();
        let ctx = SourceContext::new(&engine, &connections);

        let mut seen = 0;
        let result = EntitySource::all("OldPoll").scan(&ctx, &mut |_| {
            seen += 1;
            Err(Error::hook("stop"))
        });
        assert!(result.is_err());
        assert_eq!(seen, 1);
    }
}
