//! DML (Data Manipulation Language) support.
//!
//! INSERT, UPDATE and DELETE statements with named placeholders. Values are
//! bound separately by the caller; these types only describe shape.
//!
//! # Examples
//!
//! ```ignore
//! use maniac::sql::dml::{Insert, Update, Delete};
//!
//! let insert = Insert::into("users")
//!     .columns(["name", "email"])
//!     .row(["insert_name", "insert_email"]);
//!
//! let update = Update::table("users").set("status", "update_status");
//! ```

use super::dialect::Dialect;
use super::query::{column_ref, emit_predicates, Predicate};
use super::token::{Token, TokenStream};

// ============================================================================
// INSERT
// ============================================================================

/// INSERT statement.
#[derive(Debug, Clone)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    /// One placeholder name per column, per row.
    pub rows: Vec<Vec<String>>,
}

impl Insert {
    /// Create a new INSERT statement.
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Set the column list.
    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = cols.into_iter().map(|c| c.into()).collect();
        self
    }

    /// Add a row of placeholder names.
    pub fn row(mut self, placeholders: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.rows
            .push(placeholders.into_iter().map(|p| p.into()).collect());
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens().serialize(dialect)
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Insert)
            .space()
            .push(Token::Into)
            .space()
            .append(&column_ref(&self.table))
            .space()
            .lparen();
        ts.comma_separated(&self.columns, |ts, c| {
            ts.push(Token::Ident(c.clone()));
        });
        ts.rparen().space().push(Token::Values).space();

        ts.comma_separated(&self.rows, |ts, row| {
            ts.lparen();
            ts.comma_separated(row, |ts, p| {
                ts.push(Token::Placeholder(p.clone()));
            });
            ts.rparen();
        });

        ts
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// Right-hand side of a SET assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// `col = :placeholder`
    Value(String),
    /// `col = col + :placeholder` / `col = col - :placeholder`
    Adjust { placeholder: String, negative: bool },
}

/// UPDATE statement.
#[derive(Debug, Clone)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Update {
    pub table: String,
    pub sets: Vec<(String, Assignment)>,
    pub wheres: Vec<Predicate>,
}

impl Update {
    /// Create a new UPDATE statement.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            sets: Vec::new(),
            wheres: Vec::new(),
        }
    }

    /// `column = :placeholder`
    pub fn set(mut self, column: impl Into<String>, placeholder: impl Into<String>) -> Self {
        self.sets
            .push((column.into(), Assignment::Value(placeholder.into())));
        self
    }

    /// `column = column +/- :placeholder`
    pub fn adjust(
        mut self,
        column: impl Into<String>,
        placeholder: impl Into<String>,
        negative: bool,
    ) -> Self {
        self.sets.push((
            column.into(),
            Assignment::Adjust {
                placeholder: placeholder.into(),
                negative,
            },
        ));
        self
    }

    /// Set the WHERE predicates.
    pub fn filter(mut self, wheres: Vec<Predicate>) -> Self {
        self.wheres = wheres;
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens().serialize(dialect)
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Update)
            .space()
            .append(&column_ref(&self.table))
            .space()
            .push(Token::Set)
            .space();

        ts.comma_separated(&self.sets, |ts, (column, assignment)| {
            ts.append(&column_ref(column)).space().push(Token::Eq).space();
            match assignment {
                Assignment::Value(p) => {
                    ts.push(Token::Placeholder(p.clone()));
                }
                Assignment::Adjust {
                    placeholder,
                    negative,
                } => {
                    ts.append(&column_ref(column))
                        .space()
                        .push(if *negative { Token::Minus } else { Token::Plus })
                        .space()
                        .push(Token::Placeholder(placeholder.clone()));
                }
            }
        });

        emit_predicates(&mut ts, Token::Where, &self.wheres);

        ts
    }
}

// ============================================================================
// DELETE
// ============================================================================

/// DELETE statement.
#[derive(Debug, Clone)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Delete {
    pub table: String,
    pub wheres: Vec<Predicate>,
}

impl Delete {
    /// Create a new DELETE statement.
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            wheres: Vec::new(),
        }
    }

    /// Set the WHERE predicates.
    pub fn filter(mut self, wheres: Vec<Predicate>) -> Self {
        self.wheres = wheres;
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens().serialize(dialect)
    }

    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Delete)
            .space()
            .push(Token::From)
            .space()
            .append(&column_ref(&self.table));

        emit_predicates(&mut ts, Token::Where, &self.wheres);

        ts
    }
}
