//! Database connection layer.
//!
//! Everything above this module talks to a database through the
//! [`Connection`] trait, handed around as a [`DbHandle`]. There is no global
//! connection; whoever builds the application opens one and passes it down.
//!
//! # Example
//!
//! ```ignore
//! use maniac::db::{self, SqliteConnection};
//!
//! let db = db::handle(SqliteConnection::open_in_memory()?);
//! db::transaction(&db, |db| {
//!     db.exec_batch("CREATE TABLE users (id INTEGER PRIMARY KEY)")?;
//!     Ok::<_, db::DbError>(())
//! })?;
//! ```

mod sqlite;
mod value;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use sqlite::SqliteConnection;
pub use value::{Bindings, Row, Value};

use crate::config::DatabaseSettings;
use crate::sql::Dialect;

/// Errors raised by a connection.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported driver: {0}. Supported: sqlite")]
    UnsupportedDriver(String),

    #[error("Connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Rows returned by a query, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Rows as column-name maps.
    pub fn into_maps(self) -> Vec<Row> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|values| columns.iter().cloned().zip(values).collect::<BTreeMap<_, _>>())
            .collect()
    }

    /// Values of the first column.
    pub fn into_first_column(self) -> Vec<Value> {
        self.rows
            .into_iter()
            .filter_map(|values| values.into_iter().next())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A database connection.
///
/// Implementations execute SQL with named `:placeholder` parameters. A
/// binding whose name does not appear in the statement is ignored.
pub trait Connection: Send + Sync {
    /// SQL dialect the connection speaks.
    fn dialect(&self) -> Dialect;

    /// Server version string, used for capability checks.
    fn server_version(&self) -> String;

    /// Execute a statement, returning the number of affected rows.
    fn execute(&self, sql: &str, bindings: &Bindings) -> DbResult<u64>;

    /// Run a query and collect every row.
    fn fetch_all(&self, sql: &str, bindings: &Bindings) -> DbResult<ResultSet>;

    /// Execute one or more statements without parameters.
    fn exec_batch(&self, sql: &str) -> DbResult<()>;

    /// Id generated by the most recent insert.
    fn last_insert_id(&self) -> DbResult<i64>;

    fn begin(&self) -> DbResult<()>;
    fn commit(&self) -> DbResult<()>;
    fn rollback(&self) -> DbResult<()>;
}

/// Shared connection handle.
pub type DbHandle = Arc<dyn Connection>;

/// Wrap a connection in a shared handle.
pub fn handle(conn: impl Connection + 'static) -> DbHandle {
    Arc::new(conn)
}

/// Open the connection described by the `[database]` settings.
pub fn connect(settings: &DatabaseSettings) -> DbResult<DbHandle> {
    match settings.driver.to_lowercase().as_str() {
        "sqlite" | "sqlite3" => {
            let conn = if settings.path == ":memory:" {
                SqliteConnection::open_in_memory()?
            } else {
                SqliteConnection::open(&settings.path)?
            };
            Ok(handle(conn))
        }
        other => Err(DbError::UnsupportedDriver(other.to_string())),
    }
}

/// Run `f` inside a transaction.
///
/// Commits when `f` succeeds. On error the transaction is rolled back and the
/// error is returned unchanged.
pub fn transaction<T, E>(db: &DbHandle, f: impl FnOnce(&DbHandle) -> Result<T, E>) -> Result<T, E>
where
    E: From<DbError> + std::fmt::Display,
{
    db.begin()?;
    match f(db) {
        Ok(value) => {
            db.commit()?;
            Ok(value)
        }
        Err(e) => {
            tracing::error!(error = %e, "transaction failed, rolling back");
            if let Err(rollback_err) = db.rollback() {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}
