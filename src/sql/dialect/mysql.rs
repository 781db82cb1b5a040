//! MySQL SQL dialect.
//!
//! MySQL differences from ANSI:
//! - Backtick identifier quoting (`` `name` ``)
//! - Boolean is TINYINT(1), returns 1/0
//! - `AUTO_INCREMENT` on the column, `UNSIGNED` integers
//! - Secondary indexes declared inline in CREATE TABLE
//! - `ENGINE=... DEFAULT CHARSET=utf8mb4` table options
//! - `RAND()` instead of `RANDOM()`

use super::helpers;
use super::SqlDialect;

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    // Uses default emit_limit_offset (LIMIT ... OFFSET ...)

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        match name.to_uppercase().as_str() {
            "RANDOM" => Some("RAND"),
            _ => None,
        }
    }

    fn table_options(&self, engine: &str) -> Option<String> {
        Some(format!("ENGINE={} DEFAULT CHARSET=utf8mb4", engine))
    }

    fn has_table_sql(&self) -> &'static str {
        "SHOW TABLES LIKE :table"
    }
}
