//! End-to-end migrator runs against a temporary target store.

use ferry_core::{
    discover, run_migration, EntityDef, EntitySource, Error, FieldDef, MigrationContext,
    MigratorDef, Namespace, Record, RecordFilter, SchemaBundle, SourceConnections, SqlSource,
    StorageConfig, StorageEngine, TargetScope, UnitModule, Value, DEFAULT_CONNECTION,
};
use pretty_assertions::assert_eq;

fn polls_schema() -> SchemaBundle {
    SchemaBundle::new(1)
        .with_entity(EntityDef::new("OldPoll").with_field(FieldDef::string("old_poll_name", 30)))
        .with_entity(
            EntityDef::new("NewPoll").with_field(FieldDef::string("new_poll_name", 36).unique()),
        )
}

struct Fixture {
    engine: StorageEngine,
    connections: SourceConnections,
}

impl Fixture {
    fn new() -> Self {
        let engine = StorageEngine::open(StorageConfig::temporary()).unwrap();
        engine.catalog().ensure_schema(polls_schema()).unwrap();

        let mut connections = SourceConnections::new();
        connections
            .in_memory(DEFAULT_CONNECTION)
            .unwrap()
            .execute_batch(
                "CREATE TABLE polls_oldpoll (id INTEGER PRIMARY KEY, old_poll_name VARCHAR(30) NOT NULL)",
            )
            .unwrap();

        Self {
            engine,
            connections,
        }
    }

    fn ctx(&self) -> MigrationContext<'_> {
        MigrationContext::new(&self.engine, &self.connections)
    }

    /// Insert old polls into both the entity store and the SQLite table.
    fn make_old_polls(&self, names: &[String]) {
        self.engine
            .atomic(|txn| {
                for name in names {
                    txn.insert(&mut Record::new("OldPoll").with("old_poll_name", name.as_str()))?;
                }
                Ok(())
            })
            .unwrap();

        let conn = self.connections.get(DEFAULT_CONNECTION).unwrap();
        for name in names {
            conn.execute(
                "INSERT INTO polls_oldpoll (old_poll_name) VALUES (?1)",
                [name.as_str()],
            )
            .unwrap();
        }
    }

    fn new_poll_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .engine
            .scan_entity("NewPoll")
            .map(|r| {
                r.unwrap()
                    .get("new_poll_name")
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        names.sort();
        names
    }
}

fn numbered(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{}{}", prefix, i)).collect()
}

fn polls_migrator() -> MigratorDef {
    MigratorDef::new("PollsMigrator", "NewPoll")
        .source(EntitySource::all("OldPoll"))
        .map("old_poll_name", "new_poll_name")
}

fn append_old(source: &ferry_core::SourceRecord) -> Result<Value, Error> {
    Ok(format!("{} (old)", source.require_str("old_poll_name")?).into())
}

#[test]
fn test_polls_migrator_copies_every_record() {
    let fx = Fixture::new();
    let old = numbered("poll ", 3);
    fx.make_old_polls(&old);

    let stats = run_migration(&polls_migrator(), &fx.ctx()).unwrap();

    assert_eq!(stats.saved, 3);
    assert_eq!(fx.new_poll_names(), old);
}

#[test]
fn test_appending_polls_migrator() {
    let fx = Fixture::new();
    fx.make_old_polls(&numbered("poll ", 3));

    let def = MigratorDef::new("AppendingPollsMigrator", "NewPoll")
        .source(EntitySource::all("OldPoll"))
        .compute("new_poll_name", append_old);
    run_migration(&def, &fx.ctx()).unwrap();

    assert_eq!(
        fx.new_poll_names(),
        vec!["poll 1 (old)", "poll 2 (old)", "poll 3 (old)"]
    );
}

#[test]
fn test_query_set_migrator() {
    let fx = Fixture::new();
    fx.make_old_polls(&numbered("ignored ", 3));
    let collected = numbered("herpderp", 3);
    fx.make_old_polls(&collected);

    let def = MigratorDef::new("QuerysetToModelMigrator", "NewPoll")
        .source(EntitySource::filtered(
            "OldPoll",
            RecordFilter::starts_with("old_poll_name", "herpderp"),
        ))
        .map("old_poll_name", "new_poll_name");
    run_migration(&def, &fx.ctx()).unwrap();

    assert_eq!(fx.new_poll_names(), collected);
}

#[test]
fn test_skipping_migrator() {
    let fx = Fixture::new();
    fx.make_old_polls(&vec!["derp".to_string(); 3]);

    let def = polls_migrator().skip_on_match(["new_poll_name"]);
    let stats = run_migration(&def, &fx.ctx()).unwrap();

    assert_eq!(stats.read, 3);
    assert_eq!(stats.skipped, 2);
    assert_eq!(fx.engine.count("NewPoll").unwrap(), 1);
}

#[test]
fn test_nonunique_target_field_rolls_back() {
    let fx = Fixture::new();
    fx.make_old_polls(&vec!["derp".to_string(); 3]);

    let err = run_migration(&polls_migrator(), &fx.ctx()).unwrap_err();

    let failure = err.as_validation().expect("validation failure");
    assert_eq!(failure.record.entity, "NewPoll");
    assert_eq!(failure.record.get("new_poll_name"), &Value::from("derp"));
    assert_eq!(
        failure.errors.get("new_poll_name"),
        Some(&["NewPoll with this new_poll_name already exists.".to_string()][..])
    );
    assert_eq!(fx.engine.count("NewPoll").unwrap(), 0);
}

#[test]
fn test_simple_sql_migrator() {
    let fx = Fixture::new();
    let old = numbered("poll ", 3);
    fx.make_old_polls(&old);

    let def = MigratorDef::new("PollsBySQLMigrator", "NewPoll")
        .source(SqlSource::table("polls_oldpoll"))
        .map("old_poll_name", "new_poll_name");
    run_migration(&def, &fx.ctx()).unwrap();

    assert_eq!(fx.new_poll_names(), old);
}

#[test]
fn test_sql_query_migrator() {
    let fx = Fixture::new();
    fx.make_old_polls(&numbered("ignored ", 3));
    fx.make_old_polls(&numbered("herpderp", 3));

    let def = MigratorDef::new("ComplexPollsBySQLMigrator", "NewPoll")
        .source(SqlSource::query(
            "SELECT * FROM polls_oldpoll WHERE old_poll_name LIKE 'herpderp%'",
        ))
        .compute("new_poll_name", append_old);
    run_migration(&def, &fx.ctx()).unwrap();

    assert_eq!(
        fx.new_poll_names(),
        vec!["herpderp1 (old)", "herpderp2 (old)", "herpderp3 (old)"]
    );
}

#[test]
fn test_custom_and_synthesized_queries_agree() {
    let by_table = Fixture::new();
    let by_query = Fixture::new();
    for fx in [&by_table, &by_query] {
        fx.make_old_polls(&numbered("poll ", 4));
    }

    let table = MigratorDef::new("ByTable", "NewPoll")
        .source(SqlSource::table("polls_oldpoll"))
        .map("old_poll_name", "new_poll_name");
    let query = MigratorDef::new("ByQuery", "NewPoll")
        .source(SqlSource::query("SELECT * FROM polls_oldpoll"))
        .map("old_poll_name", "new_poll_name");

    run_migration(&table, &by_table.ctx()).unwrap();
    run_migration(&query, &by_query.ctx()).unwrap();

    assert_eq!(by_table.new_poll_names(), by_query.new_poll_names());
    assert_eq!(by_table.new_poll_names().len(), 4);
}

#[test]
fn test_missing_sql_column_is_definition_error() {
    let fx = Fixture::new();
    fx.make_old_polls(&numbered("poll ", 1));

    let def = MigratorDef::new("Bad", "NewPoll")
        .source(SqlSource::table("polls_oldpoll"))
        .map("title", "new_poll_name");
    let err = run_migration(&def, &fx.ctx()).unwrap_err();

    assert!(err.is_definition());
    assert_eq!(fx.engine.count("NewPoll").unwrap(), 0);
}

#[test]
fn test_post_save_writes_share_the_transaction() {
    struct AlsoArchive;

    impl ferry_core::SaveHooks for AlsoArchive {
        fn post_save(
            &self,
            _source: &ferry_core::SourceRecord,
            target: &Record,
            scope: &mut dyn TargetScope,
        ) -> Result<(), Error> {
            let name = target.get("new_poll_name").clone();
            scope.insert(&mut Record::new("OldPoll").with("old_poll_name", name))?;
            Ok(())
        }
    }

    let fx = Fixture::new();
    fx.make_old_polls(&["derp".to_string(), "derp".to_string()]);

    let err = run_migration(&polls_migrator().hooks(AlsoArchive), &fx.ctx()).unwrap_err();

    assert!(err.as_validation().is_some());
    assert_eq!(fx.engine.count("NewPoll").unwrap(), 0);
    assert_eq!(fx.engine.count("OldPoll").unwrap(), 2);
}

#[test]
fn test_discovery_over_two_modules() {
    let polls = UnitModule::new("polls")
        .define(polls_migrator())
        .define(
            MigratorDef::new("AppendingPollsMigrator", "NewPoll")
                .source(EntitySource::all("OldPoll"))
                .compute("new_poll_name", append_old),
        )
        .define(polls_migrator().skip_validation())
        .export("PollsMigrator")
        .export("AppendingPollsMigrator");
    let legacy = UnitModule::new("legacy")
        .define(
            MigratorDef::new("PollsBySQLMigrator", "NewPoll")
                .source(SqlSource::table("polls_oldpoll"))
                .map("old_poll_name", "new_poll_name"),
        )
        .export("PollsBySQLMigrator");

    let registry = discover(
        &Namespace::new("migrators")
            .with_module(polls)
            .with_module(legacy),
    )
    .unwrap();

    let mut names = registry.names();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "legacy.PollsBySQLMigrator",
            "polls.AppendingPollsMigrator",
            "polls.PollsMigrator",
        ]
    );
}
