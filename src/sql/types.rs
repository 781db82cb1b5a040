//! SQL-level column types for DDL generation.
//!
//! `ColumnType` mirrors the column kinds a `Blueprint` can declare. Each
//! dialect renders the type through `SqlDialect::emit_column_type`; MySQL
//! gets the exact names (`VARCHAR(255)`, `TINYINT(1)`, `ENUM('a','b')`),
//! SQLite gets the affinity-compatible spelling.

use std::fmt;

/// SQL-level column type.
///
/// # Examples
///
/// ```ignore
/// use maniac::sql::types::ColumnType;
///
/// let name = ColumnType::Varchar(255);
/// let price = ColumnType::Decimal(8, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// `TINYINT(1)`, the MySQL boolean.
    Boolean,

    /// `INT`.
    Integer,

    /// `BIGINT`.
    BigInteger,

    /// `FLOAT`.
    Float,

    /// `DOUBLE`.
    Double,

    /// Fixed-precision decimal: total digits, digits after the point.
    Decimal(u8, u8),

    /// `VARCHAR(n)`.
    Varchar(u16),

    /// `TEXT`.
    Text,

    /// `MEDIUMTEXT`.
    MediumText,

    /// `LONGTEXT`.
    LongText,

    /// `JSON`.
    Json,

    /// `JSONB`. MySQL has no binary JSON type; the name is passed through
    /// as declared.
    Jsonb,

    /// `ENUM('a','b',...)`.
    Enum(Vec<String>),

    /// `DATE`.
    Date,

    /// `DATETIME`.
    DateTime,

    /// `TIMESTAMP`.
    Timestamp,
}

impl ColumnType {
    /// Whether a boolean default should be written as `1`/`0`.
    pub fn is_tiny_boolean(&self) -> bool {
        matches!(self, ColumnType::Boolean)
    }

    /// Whether the type accepts the `UNSIGNED` modifier.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Boolean
                | ColumnType::Integer
                | ColumnType::BigInteger
                | ColumnType::Float
                | ColumnType::Double
                | ColumnType::Decimal(_, _)
        )
    }
}

impl fmt::Display for ColumnType {
    /// MySQL spelling, used for logging and as the default rendering.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Boolean => write!(f, "TINYINT(1)"),
            ColumnType::Integer => write!(f, "INT"),
            ColumnType::BigInteger => write!(f, "BIGINT"),
            ColumnType::Float => write!(f, "FLOAT"),
            ColumnType::Double => write!(f, "DOUBLE"),
            ColumnType::Decimal(total, places) => write!(f, "DECIMAL({},{})", total, places),
            ColumnType::Varchar(len) => write!(f, "VARCHAR({})", len),
            ColumnType::Text => write!(f, "TEXT"),
            ColumnType::MediumText => write!(f, "MEDIUMTEXT"),
            ColumnType::LongText => write!(f, "LONGTEXT"),
            ColumnType::Json => write!(f, "JSON"),
            ColumnType::Jsonb => write!(f, "JSONB"),
            ColumnType::Enum(values) => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| format!("'{}'", v.replace('\'', "''")))
                    .collect();
                write!(f, "ENUM({})", quoted.join(","))
            }
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::DateTime => write!(f, "DATETIME"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}
