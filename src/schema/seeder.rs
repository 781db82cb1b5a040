//! Database seeders.

use crate::db::Row;
use crate::query::QueryBuilder;

use super::{Schema, SchemaResult};

/// Fills tables with initial or fixture data.
///
/// ```ignore
/// struct DatabaseSeeder;
///
/// impl Seeder for DatabaseSeeder {
///     fn run(&self, schema: &Schema) -> SchemaResult<()> {
///         self.insert(schema, "users", [("name", "Admin"), ("email", "admin@example.com")])?;
///         self.call(schema, &PostSeeder)
///     }
/// }
/// ```
pub trait Seeder {
    fn run(&self, schema: &Schema) -> SchemaResult<()>;

    /// Run another seeder.
    fn call(&self, schema: &Schema, seeder: &dyn Seeder) -> SchemaResult<()> {
        seeder.run(schema)
    }

    /// Insert one row and return its id.
    fn insert<K, V>(
        &self,
        schema: &Schema,
        table: &str,
        row: impl IntoIterator<Item = (K, V)>,
    ) -> SchemaResult<i64>
    where
        Self: Sized,
        K: Into<String>,
        V: Into<crate::db::Value>,
    {
        let id = QueryBuilder::table(schema.db().clone(), table).insert_get_id(row)?;
        Ok(id.unwrap_or_default())
    }

    /// Insert several rows and return how many were written.
    fn insert_many(&self, schema: &Schema, table: &str, rows: &[Row]) -> SchemaResult<u64>
    where
        Self: Sized,
    {
        if rows.is_empty() {
            return Ok(0);
        }
        Ok(QueryBuilder::table(schema.db().clone(), table).insert_many(rows)?)
    }
}
