#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use maniac::db::{self, SqliteConnection};
    use maniac::query::QueryBuilder;
    use maniac::schema::{
        Migration, MigrationRecord, Migrator, Schema, SchemaError, SchemaResult, MIGRATIONS_TABLE,
    };

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Creates a table with an id and a name, logging up/down calls.
    struct CreateTable {
        name: &'static str,
        table: &'static str,
        journal: Journal,
    }

    impl CreateTable {
        fn new(name: &'static str, table: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                table,
                journal: Arc::clone(journal),
            }
        }
    }

    impl Migration for CreateTable {
        fn name(&self) -> &str {
            self.name
        }

        fn up(&self, schema: &Schema) -> SchemaResult<()> {
            self.journal.lock().unwrap().push(format!("up {}", self.table));
            schema.create(self.table, |table| {
                table.id();
                table.string("name");
            })
        }

        fn down(&self, schema: &Schema) -> SchemaResult<()> {
            self.journal.lock().unwrap().push(format!("down {}", self.table));
            schema.drop_if_exists(self.table)
        }
    }

    /// Fails halfway: creates its table, then runs invalid SQL.
    struct Broken;

    impl Migration for Broken {
        fn name(&self) -> &str {
            "2025_03_01_000000_broken"
        }

        fn up(&self, schema: &Schema) -> SchemaResult<()> {
            schema.create("half_done", |table| {
                table.id();
            })?;
            schema.statement("ALTER TABLE nowhere ADD COLUMN x INTEGER")
        }

        fn down(&self, schema: &Schema) -> SchemaResult<()> {
            schema.drop_if_exists("half_done")
        }
    }

    fn migrator() -> Migrator {
        let db = db::handle(SqliteConnection::open_in_memory().unwrap());
        Migrator::new(Schema::new(db)).unwrap()
    }

    fn batches(records: &[MigrationRecord]) -> Vec<(String, i64)> {
        records
            .iter()
            .map(|r| (r.migration.clone(), r.batch))
            .collect()
    }

    #[test]
    fn test_new_creates_bookkeeping_table() {
        let migrator = migrator();
        assert!(migrator.schema().has_table(MIGRATIONS_TABLE).unwrap());
        assert!(migrator.status().unwrap().is_empty());
    }

    #[test]
    fn test_each_run_is_a_new_batch() {
        let journal = Journal::default();
        let users = CreateTable::new("2025_01_01_000000_create_users_table", "users", &journal);
        let posts = CreateTable::new("2025_01_02_000000_create_posts_table", "posts", &journal);
        let tags = CreateTable::new("2025_02_01_000000_create_tags_table", "tags", &journal);
        let migrator = migrator();

        let ran = migrator.run(&[&users, &posts]).unwrap();
        assert_eq!(
            ran,
            ["2025_01_01_000000_create_users_table", "2025_01_02_000000_create_posts_table"]
        );

        let ran = migrator.run(&[&users, &posts, &tags]).unwrap();
        assert_eq!(ran, ["2025_02_01_000000_create_tags_table"]);

        assert_eq!(
            batches(&migrator.status().unwrap()),
            vec![
                ("2025_01_01_000000_create_users_table".to_string(), 1),
                ("2025_01_02_000000_create_posts_table".to_string(), 1),
                ("2025_02_01_000000_create_tags_table".to_string(), 2),
            ]
        );
        assert_eq!(*journal.lock().unwrap(), ["up users", "up posts", "up tags"]);
    }

    #[test]
    fn test_nothing_to_migrate_touches_nothing() {
        let journal = Journal::default();
        let users = CreateTable::new("2025_01_01_000000_create_users_table", "users", &journal);
        let migrator = migrator();

        migrator.run(&[&users]).unwrap();
        assert!(migrator.run(&[&users]).unwrap().is_empty());
        assert_eq!(journal.lock().unwrap().len(), 1);
        assert_eq!(migrator.status().unwrap().len(), 1);
    }

    #[test]
    fn test_rollback_reverts_last_batch_newest_first() {
        let journal = Journal::default();
        let users = CreateTable::new("2025_01_01_000000_create_users_table", "users", &journal);
        let posts = CreateTable::new("2025_01_02_000000_create_posts_table", "posts", &journal);
        let tags = CreateTable::new("2025_01_03_000000_create_tags_table", "tags", &journal);
        let all: [&dyn Migration; 3] = [&users, &posts, &tags];
        let migrator = migrator();

        migrator.run(&all[..1]).unwrap();
        migrator.run(&all).unwrap();
        journal.lock().unwrap().clear();

        let reverted = migrator.rollback(&all).unwrap();
        assert_eq!(
            reverted,
            ["2025_01_03_000000_create_tags_table", "2025_01_02_000000_create_posts_table"]
        );
        assert_eq!(*journal.lock().unwrap(), ["down tags", "down posts"]);

        let schema = migrator.schema();
        assert!(schema.has_table("users").unwrap());
        assert!(!schema.has_table("posts").unwrap());
        assert!(!schema.has_table("tags").unwrap());
        assert_eq!(migrator.status().unwrap().len(), 1);

        assert_eq!(
            migrator.rollback(&all).unwrap(),
            ["2025_01_01_000000_create_users_table"]
        );
        assert!(migrator.rollback(&all).unwrap().is_empty());
        assert!(migrator.status().unwrap().is_empty());
    }

    #[test]
    fn test_failed_batch_is_undone() {
        let journal = Journal::default();
        let users = CreateTable::new("2025_01_01_000000_create_users_table", "users", &journal);
        let migrator = migrator();

        let err = migrator.run(&[&users, &Broken]).unwrap_err();
        match err {
            SchemaError::MigrationFailed { name, .. } => assert_eq!(name, "2025_03_01_000000_broken"),
            other => panic!("unexpected error: {other}"),
        }

        let schema = migrator.schema();
        assert!(!schema.has_table("users").unwrap());
        assert!(!schema.has_table("half_done").unwrap());
        assert!(migrator.status().unwrap().is_empty());
        assert_eq!(
            QueryBuilder::table(schema.db().clone(), MIGRATIONS_TABLE)
                .count()
                .unwrap(),
            0
        );
    }
}
