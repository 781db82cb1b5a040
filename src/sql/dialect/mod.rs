//! SQL Dialect definitions and formatting rules.
//!
//! The schema and query builders emit dialect-agnostic tokens; a
//! `SqlDialect` decides how those tokens look on the wire:
//!
//! - Identifier quoting: `` ` `` (MySQL), `"` (SQLite)
//! - Boolean literals: 1/0
//! - Column types, `UNSIGNED`, `AUTO_INCREMENT`
//! - Table options (`ENGINE=InnoDB DEFAULT CHARSET=utf8mb4`)
//! - Whether secondary indexes live inside `CREATE TABLE` or in their own
//!   `CREATE INDEX` statements
//!
//! MySQL is the reference dialect; the persisted schema is MySQL-flavored.
//! SQLite exists so the same builders run against an embedded database.
//!
//! # Usage
//!
//! ```ignore
//! use maniac::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::MySql;
//! let quoted = dialect.quote_identifier("user");  // `user`
//! ```

pub mod helpers;
mod mysql;
mod sqlite;

pub use mysql::MySql;
pub use sqlite::Sqlite;

use super::ddl::IndexKind;
use super::token::{Token, TokenStream};
use super::types::ColumnType;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow MySQL where the two dialects agree.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// Both dialects use single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit the LIMIT/OFFSET clause.
    ///
    /// OFFSET is only meaningful together with LIMIT; an offset without a
    /// limit is dropped.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        let mut ts = TokenStream::new();

        if let Some(lim) = limit {
            ts.push(Token::Limit)
                .space()
                .push(Token::LitInt(lim as i64));

            if let Some(off) = offset {
                ts.space()
                    .push(Token::Offset)
                    .space()
                    .push(Token::LitInt(off as i64));
            }
        }

        ts
    }

    // =========================================================================
    // Function Remapping
    // =========================================================================

    /// Remap a function name for this dialect.
    ///
    /// Returns `Some(new_name)` if the function should be remapped, `None` to
    /// keep the original. The input is matched case-insensitively.
    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }

    // =========================================================================
    // DDL Support
    // =========================================================================

    /// Emit a column type for this dialect.
    fn emit_column_type(&self, ty: &ColumnType) -> String {
        ty.to_string()
    }

    /// Keyword that makes an integer column auto-increment, if the dialect
    /// spells it on the column.
    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }

    /// Whether numeric columns accept `UNSIGNED`.
    fn supports_unsigned(&self) -> bool {
        true
    }

    /// Trailing table options for CREATE TABLE.
    fn table_options(&self, engine: &str) -> Option<String> {
        let _ = engine;
        None
    }

    /// Whether `UNIQUE`/`INDEX`/`FULLTEXT`/`SPATIAL` definitions may appear
    /// inside CREATE TABLE and ALTER TABLE ... ADD.
    ///
    /// When false, secondary indexes are emitted as separate
    /// `CREATE [UNIQUE] INDEX` statements.
    fn supports_inline_indexes(&self) -> bool {
        true
    }

    /// Whether the dialect can build an index of the given kind at all.
    fn supports_index_kind(&self, kind: IndexKind) -> bool {
        let _ = kind;
        true
    }

    /// Whether ALTER TABLE accepts several comma-separated actions.
    fn supports_multi_alter(&self) -> bool {
        true
    }

    /// Whether ALTER TABLE can add a FOREIGN KEY constraint to an existing table.
    fn supports_alter_foreign_keys(&self) -> bool {
        true
    }

    /// Query that returns a row when the table named by `:table` exists.
    fn has_table_sql(&self) -> &'static str;
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    MySql,
    Sqlite,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::MySql => &MySql,
            Dialect::Sqlite => &Sqlite,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }

    fn emit_column_type(&self, ty: &ColumnType) -> String {
        self.dialect().emit_column_type(ty)
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        self.dialect().auto_increment_keyword()
    }

    fn supports_unsigned(&self) -> bool {
        self.dialect().supports_unsigned()
    }

    fn table_options(&self, engine: &str) -> Option<String> {
        self.dialect().table_options(engine)
    }

    fn supports_inline_indexes(&self) -> bool {
        self.dialect().supports_inline_indexes()
    }

    fn supports_index_kind(&self, kind: IndexKind) -> bool {
        self.dialect().supports_index_kind(kind)
    }

    fn supports_multi_alter(&self) -> bool {
        self.dialect().supports_multi_alter()
    }

    fn supports_alter_foreign_keys(&self) -> bool {
        self.dialect().supports_alter_foreign_keys()
    }

    fn has_table_sql(&self) -> &'static str {
        self.dialect().has_table_sql()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(format!("unsupported dialect: {}", other)),
        }
    }
}
