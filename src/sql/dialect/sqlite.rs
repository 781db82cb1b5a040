//! SQLite SQL dialect.
//!
//! SQLite differences from MySQL:
//! - Double-quote identifier quoting
//! - No `UNSIGNED`, no `AUTO_INCREMENT` (an `INTEGER PRIMARY KEY` is the rowid)
//! - Secondary indexes are separate `CREATE INDEX` statements
//! - No FULLTEXT or SPATIAL indexes
//! - One action per ALTER TABLE, and no foreign keys added by ALTER
//! - `RANDOM()` instead of `RAND()`

use super::helpers;
use super::SqlDialect;
use crate::sql::ddl::IndexKind;
use crate::sql::types::ColumnType;

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        match name.to_uppercase().as_str() {
            "RAND" => Some("RANDOM"),
            _ => None,
        }
    }

    fn emit_column_type(&self, ty: &ColumnType) -> String {
        helpers::emit_column_type_sqlite(ty)
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        None
    }

    fn supports_unsigned(&self) -> bool {
        false
    }

    fn supports_inline_indexes(&self) -> bool {
        false
    }

    fn supports_index_kind(&self, kind: IndexKind) -> bool {
        matches!(kind, IndexKind::Unique | IndexKind::Index)
    }

    fn supports_multi_alter(&self) -> bool {
        false
    }

    fn supports_alter_foreign_keys(&self) -> bool {
        false
    }

    fn has_table_sql(&self) -> &'static str {
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = :table"
    }
}
