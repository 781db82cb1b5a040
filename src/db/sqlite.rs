//! rusqlite-backed connection.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::ToSql;

use super::{Bindings, Connection, DbError, DbResult, ResultSet, Value};
use crate::sql::Dialect;

/// A SQLite database behind a mutex so the handle can be shared.
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Open or create a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = rusqlite::Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: rusqlite::Connection) -> DbResult<Self> {
        // Foreign keys are off by default in SQLite
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, rusqlite::Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }
}

/// Bind every named value the statement actually references.
fn bind(stmt: &mut rusqlite::Statement<'_>, bindings: &Bindings) -> DbResult<()> {
    for (name, value) in bindings {
        let placeholder = format!(":{}", name);
        if let Some(index) = stmt.parameter_index(&placeholder)? {
            stmt.raw_bind_parameter(index, value as &dyn ToSql)?;
        }
    }
    Ok(())
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn server_version(&self) -> String {
        rusqlite::version().to_string()
    }

    fn execute(&self, sql: &str, bindings: &Bindings) -> DbResult<u64> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        bind(&mut stmt, bindings)?;
        let affected = stmt.raw_execute()?;
        Ok(affected as u64)
    }

    fn fetch_all(&self, sql: &str, bindings: &Bindings) -> DbResult<ResultSet> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        bind(&mut stmt, bindings)?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.raw_query();
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(row.get::<_, Value>(i)?);
            }
            rows.push(values);
        }

        Ok(ResultSet { columns, rows })
    }

    fn exec_batch(&self, sql: &str) -> DbResult<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    fn last_insert_id(&self) -> DbResult<i64> {
        Ok(self.lock()?.last_insert_rowid())
    }

    fn begin(&self) -> DbResult<()> {
        self.exec_batch("BEGIN")
    }

    fn commit(&self) -> DbResult<()> {
        self.exec_batch("COMMIT")
    }

    fn rollback(&self) -> DbResult<()> {
        self.exec_batch("ROLLBACK")
    }
}
