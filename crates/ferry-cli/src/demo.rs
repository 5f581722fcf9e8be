//! The bundled polls migrators.
//!
//! Both migrators read the `polls_oldpoll` table of the default source
//! connection into the `NewPoll` entity.

use ferry_core::{
    EntityDef, Error, FieldDef, MigratorDef, Namespace, SchemaBundle, SourceRecord, SqlSource,
    UnitModule, Value,
};

/// Table the polls migrators read from.
pub const OLD_POLL_TABLE: &str = "polls_oldpoll";

/// Target schema for the polls migrators.
pub fn polls_schema() -> SchemaBundle {
    SchemaBundle::new(1).with_entity(
        EntityDef::new("NewPoll").with_field(FieldDef::string("new_poll_name", 36).unique()),
    )
}

fn append_old(source: &SourceRecord) -> Result<Value, Error> {
    Ok(format!("{} (old)", source.require_str("old_poll_name")?).into())
}

/// The `polls` module: a straight copy and a copy with a suffix.
pub fn polls_module() -> UnitModule {
    UnitModule::new("polls")
        .define(
            MigratorDef::new("PollsMigrator", "NewPoll")
                .source(SqlSource::table(OLD_POLL_TABLE))
                .map("old_poll_name", "new_poll_name"),
        )
        .define(
            MigratorDef::new("AppendingPollsMigrator", "NewPoll")
                .source(SqlSource::table(OLD_POLL_TABLE))
                .compute("new_poll_name", append_old),
        )
        .export("PollsMigrator")
        .export("AppendingPollsMigrator")
}

/// Namespace holding every bundled module.
pub fn namespace() -> Namespace {
    Namespace::new("migrators").with_module(polls_module())
}
