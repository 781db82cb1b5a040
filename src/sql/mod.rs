//! SQL generation module.
//!
//! Every statement the framework sends to a database is assembled here
//! from tokens:
//!
//! - [`query`] - SELECT statements, predicates, joins, column references
//! - [`dml`] - INSERT, UPDATE, DELETE
//! - [`ddl`] - CREATE TABLE, ALTER TABLE, DROP TABLE, CREATE INDEX
//! - [`types`] - column types for DDL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - MySQL and SQLite dialects

pub mod ddl;
pub mod dialect;
pub mod dml;
pub mod query;
pub mod token;
pub mod types;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use query::{
    column_ref, Condition, Connector, Join, JoinType, Operator, OrderByExpr, Predicate, Select,
    SortDir,
};
pub use token::{Token, TokenStream};
pub use types::ColumnType;

// Re-export DDL types
pub use ddl::{
    AlterAction, AlterTable, ColumnDef, CreateIndex, CreateTable, DefaultValue,
    DropTable, IndexKind, ReferentialAction, TableConstraint,
};

// Re-export DML types
pub use dml::{Assignment, Delete, Insert, Update};
