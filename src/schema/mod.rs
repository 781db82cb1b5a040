//! Schema definition, migrations and seeding.
//!
//! [`Schema`] is the entry point: it owns a database handle and runs
//! [`Blueprint`] definitions against it. [`Migrator`] records applied
//! [`Migration`]s in a `migrations` table and rolls them back by batch.

mod blueprint;
mod migrator;
mod seeder;

pub use blueprint::{Blueprint, ColumnBuilder, ForeignKeyBuilder, DEFAULT_ENGINE};
pub use migrator::{Migration, MigrationRecord, Migrator, MIGRATIONS_TABLE};
pub use seeder::Seeder;

use crate::db::{DbError, DbHandle, Value};
use crate::query::QueryError;
use crate::sql::ddl::DropTable;
use crate::sql::SqlDialect;

/// Errors raised while changing or seeding the schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to create table '{table}': {source}")]
    CreateFailed { table: String, source: DbError },

    #[error("Failed to alter table '{table}': {source}")]
    AlterFailed { table: String, source: DbError },

    #[error("Foreign key on '{table}.{column}' has no referenced table")]
    IncompleteForeignKey { table: String, column: String },

    #[error("Migration {name} failed: {source}")]
    MigrationFailed {
        name: String,
        source: Box<SchemaError>,
    },

    #[error("Rollback {name} failed: {source}")]
    RollbackFailed {
        name: String,
        source: Box<SchemaError>,
    },

    #[error("Migration {0} is recorded but was not provided")]
    UnknownMigration(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Db(#[from] DbError),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema operations bound to one connection.
#[derive(Clone)]
pub struct Schema {
    db: DbHandle,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("dialect", &self.db.dialect())
            .finish()
    }
}

impl Schema {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DbHandle {
        &self.db
    }

    /// Define and create a new table.
    pub fn create(&self, table: &str, define: impl FnOnce(&mut Blueprint)) -> SchemaResult<()> {
        let mut blueprint = Blueprint::new(table);
        define(&mut blueprint);
        blueprint.create(&self.db)
    }

    /// Add columns, indexes or foreign keys to an existing table.
    pub fn table(&self, table: &str, define: impl FnOnce(&mut Blueprint)) -> SchemaResult<()> {
        let mut blueprint = Blueprint::new(table);
        define(&mut blueprint);
        blueprint.build(&self.db)
    }

    pub fn drop_if_exists(&self, table: &str) -> SchemaResult<()> {
        let dialect = self.db.dialect();
        let sql = DropTable::new(table).if_exists().to_sql(dialect);
        tracing::debug!(sql = %sql, "dropping table");
        self.db.exec_batch(&sql)?;
        Ok(())
    }

    pub fn has_table(&self, table: &str) -> SchemaResult<bool> {
        let sql = self.db.dialect().has_table_sql();
        let bindings = vec![("table".to_string(), Value::from(table))];
        let rows = self.db.fetch_all(sql, &bindings)?;
        Ok(!rows.is_empty())
    }

    /// Run raw SQL.
    pub fn statement(&self, sql: &str) -> SchemaResult<()> {
        tracing::debug!(sql = %sql, "schema statement");
        self.db.exec_batch(sql)?;
        Ok(())
    }
}
