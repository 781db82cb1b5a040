//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use crate::sql::types::ColumnType;

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: SQLite
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as numeric 1/0.
/// Used by: MySQL, SQLite
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Column Types
// =============================================================================

/// Emit a column type for SQLite.
///
/// SQLite only cares about type affinity, but it rejects `ENUM(...)` and
/// needs exactly `INTEGER` for a rowid-aliased primary key, so those are
/// rewritten; everything else keeps the MySQL spelling.
pub fn emit_column_type_sqlite(ty: &ColumnType) -> String {
    match ty {
        ColumnType::BigInteger | ColumnType::Integer => "INTEGER".into(),
        ColumnType::Float | ColumnType::Double => "REAL".into(),
        ColumnType::MediumText
        | ColumnType::LongText
        | ColumnType::Json
        | ColumnType::Jsonb
        | ColumnType::Enum(_) => "TEXT".into(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        assert_eq!(quote_backtick("users"), "`users`");
        assert_eq!(quote_double("users"), "\"users\"");
        assert_eq!(quote_string_single("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_sqlite_types() {
        assert_eq!(emit_column_type_sqlite(&ColumnType::BigInteger), "INTEGER");
        assert_eq!(
            emit_column_type_sqlite(&ColumnType::Enum(vec!["a".into()])),
            "TEXT"
        );
        assert_eq!(emit_column_type_sqlite(&ColumnType::Varchar(40)), "VARCHAR(40)");
    }
}
