//! Migration bookkeeping.
//!
//! Applied migrations are recorded by name in the `migrations` table along
//! with the batch they ran in. `run` applies everything not yet recorded as
//! one new batch; `rollback` reverts the most recent batch, newest first.
//! Both run inside a single transaction.

use serde::Serialize;

use crate::db::{self, Value};
use crate::query::QueryBuilder;
use crate::sql::ddl::{ColumnDef, CreateTable, TableConstraint};
use crate::sql::ColumnType;

use super::{Schema, SchemaError, SchemaResult};

/// Name of the bookkeeping table.
pub const MIGRATIONS_TABLE: &str = "migrations";

/// A reversible schema change.
///
/// ```ignore
/// struct CreateUsersTable;
///
/// impl Migration for CreateUsersTable {
///     fn name(&self) -> &str {
///         "2025_05_02_151835_create_users_table"
///     }
///
///     fn up(&self, schema: &Schema) -> SchemaResult<()> {
///         schema.create("users", |table| {
///             table.id();
///             table.string("email").unique();
///             table.timestamps();
///         })
///     }
///
///     fn down(&self, schema: &Schema) -> SchemaResult<()> {
///         schema.drop_if_exists("users")
///     }
/// }
/// ```
pub trait Migration {
    /// Unique name recorded in the bookkeeping table.
    fn name(&self) -> &str;

    fn up(&self, schema: &Schema) -> SchemaResult<()>;

    fn down(&self, schema: &Schema) -> SchemaResult<()>;
}

/// One row of the bookkeeping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    pub id: i64,
    pub migration: String,
    pub batch: i64,
}

/// Applies and reverts [`Migration`]s.
#[derive(Debug, Clone)]
pub struct Migrator {
    schema: Schema,
}

impl Migrator {
    /// Create the bookkeeping table if needed.
    pub fn new(schema: Schema) -> SchemaResult<Self> {
        let dialect = schema.db().dialect();
        let sql = CreateTable::new(MIGRATIONS_TABLE)
            .if_not_exists()
            .column(ColumnDef::new("id", ColumnType::Integer).auto_increment())
            .column(ColumnDef::new("migration", ColumnType::Varchar(255)))
            .column(ColumnDef::new("batch", ColumnType::Integer))
            .constraint(TableConstraint::primary_key(["id"]))
            .engine(super::DEFAULT_ENGINE)
            .to_sql(dialect);

        if let Err(e) = schema.db().exec_batch(&sql) {
            tracing::error!(error = %e, "failed to create migrations table");
            return Err(SchemaError::CreateFailed {
                table: MIGRATIONS_TABLE.to_string(),
                source: e,
            });
        }
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn records(&self) -> QueryBuilder {
        QueryBuilder::table(self.schema.db().clone(), MIGRATIONS_TABLE)
    }

    /// Every applied migration in the order it ran.
    pub fn status(&self) -> SchemaResult<Vec<MigrationRecord>> {
        let rows = self.records().order_by("id", "asc").get()?;
        Ok(rows
            .into_iter()
            .map(|row| MigrationRecord {
                id: row.get("id").and_then(Value::as_i64).unwrap_or_default(),
                migration: row.get("migration").map(Value::to_string).unwrap_or_default(),
                batch: row.get("batch").and_then(Value::as_i64).unwrap_or_default(),
            })
            .collect())
    }

    fn last_batch(&self) -> SchemaResult<i64> {
        let max = self
            .records()
            .select(["MAX(batch) as batch"])
            .get_column()?;
        Ok(max.first().and_then(Value::as_i64).unwrap_or(0))
    }

    /// Apply every migration not yet recorded, in slice order, as one batch.
    ///
    /// Returns the names applied; an empty list means nothing to migrate.
    pub fn run(&self, migrations: &[&dyn Migration]) -> SchemaResult<Vec<String>> {
        let applied: Vec<String> = self
            .records()
            .select(["migration"])
            .get_column()?
            .iter()
            .map(Value::to_string)
            .collect();

        let pending: Vec<&dyn Migration> = migrations
            .iter()
            .copied()
            .filter(|m| !applied.iter().any(|name| name == m.name()))
            .collect();
        if pending.is_empty() {
            tracing::debug!("nothing to migrate");
            return Ok(Vec::new());
        }

        let batch = self.last_batch()? + 1;
        db::transaction(self.schema.db(), |_| {
            let mut ran = Vec::with_capacity(pending.len());
            for migration in &pending {
                let name = migration.name().to_string();
                self.apply(*migration, batch)
                    .map_err(|source| {
                        tracing::error!(migration = %name, error = %source, "migration failed");
                        SchemaError::MigrationFailed {
                            name: name.clone(),
                            source: Box::new(source),
                        }
                    })?;
                tracing::debug!(migration = %name, batch, "migrated");
                ran.push(name);
            }
            Ok(ran)
        })
    }

    fn apply(&self, migration: &dyn Migration, batch: i64) -> SchemaResult<()> {
        migration.up(&self.schema)?;
        self.records().insert([
            ("migration", Value::from(migration.name())),
            ("batch", Value::Int(batch)),
        ])?;
        Ok(())
    }

    /// Revert the most recent batch, newest migration first.
    ///
    /// Returns the names reverted; an empty list means nothing to roll back.
    pub fn rollback(&self, migrations: &[&dyn Migration]) -> SchemaResult<Vec<String>> {
        let batch = self.last_batch()?;
        let names: Vec<String> = self
            .records()
            .select(["migration"])
            .where_eq("batch", batch)
            .order_by("id", "desc")
            .get_column()?
            .iter()
            .map(Value::to_string)
            .collect();
        if names.is_empty() {
            tracing::debug!("nothing to rollback");
            return Ok(Vec::new());
        }

        let to_revert = names
            .iter()
            .map(|name| {
                migrations
                    .iter()
                    .copied()
                    .find(|m| m.name() == name)
                    .ok_or_else(|| SchemaError::UnknownMigration(name.clone()))
            })
            .collect::<SchemaResult<Vec<_>>>()?;

        db::transaction(self.schema.db(), |_| {
            let mut reverted = Vec::with_capacity(to_revert.len());
            for migration in &to_revert {
                let name = migration.name().to_string();
                self.revert(*migration).map_err(|source| {
                    tracing::error!(migration = %name, error = %source, "rollback failed");
                    SchemaError::RollbackFailed {
                        name: name.clone(),
                        source: Box::new(source),
                    }
                })?;
                reverted.push(name);
            }
            Ok(reverted)
        })
    }

    fn revert(&self, migration: &dyn Migration) -> SchemaResult<()> {
        migration.down(&self.schema)?;
        self.records()
            .where_eq("migration", migration.name())
            .delete()?;
        Ok(())
    }
}
