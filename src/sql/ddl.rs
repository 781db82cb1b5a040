//! DDL (Data Definition Language) support.
//!
//! This module provides the statement types a `Blueprint` lowers to
//! (CREATE TABLE, ALTER TABLE, DROP TABLE, CREATE INDEX) and renders them
//! for a dialect.
//!
//! # Examples
//!
//! ```ignore
//! use maniac::sql::ddl::{CreateTable, ColumnDef, TableConstraint};
//! use maniac::sql::{ColumnType, Dialect};
//!
//! let table = CreateTable::new("users")
//!     .column(ColumnDef::new("id", ColumnType::BigInteger).unsigned().auto_increment())
//!     .column(ColumnDef::new("name", ColumnType::Varchar(255)))
//!     .constraint(TableConstraint::primary_key(["id"]));
//!
//! println!("{}", table.to_sql(Dialect::MySql));
//! ```

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};

pub use super::types::ColumnType;

// ============================================================================
// CREATE TABLE
// ============================================================================

/// CREATE TABLE statement.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct CreateTable {
    pub if_not_exists: bool,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    /// Storage engine, rendered through `SqlDialect::table_options`.
    pub engine: Option<String>,
}

impl CreateTable {
    /// Create a new CREATE TABLE statement.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            if_not_exists: false,
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
            engine: None,
        }
    }

    /// Add IF NOT EXISTS clause.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Add a column definition.
    pub fn column(mut self, col: ColumnDef) -> Self {
        self.columns.push(col);
        self
    }

    /// Add multiple column definitions.
    pub fn columns(mut self, cols: impl IntoIterator<Item = ColumnDef>) -> Self {
        self.columns.extend(cols);
        self
    }

    /// Add a table constraint.
    pub fn constraint(mut self, constraint: TableConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Set the storage engine.
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Convert to SQL for the given dialect.
    ///
    /// Only the CREATE TABLE statement itself; see [`CreateTable::to_statements`]
    /// for dialects that need secondary indexes created separately.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Every statement needed to create the table with its indexes.
    pub fn to_statements(&self, dialect: Dialect) -> Vec<String> {
        let mut statements = vec![self.to_sql(dialect)];
        if !dialect.supports_inline_indexes() {
            for constraint in &self.constraints {
                if let TableConstraint::Index { kind, name, columns } = constraint {
                    let index = CreateIndex::new(name.clone(), self.name.clone(), columns.clone())
                        .kind(*kind);
                    statements.push(index.to_sql(dialect));
                }
            }
        }
        statements
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Create).space().push(Token::Table);
        if self.if_not_exists {
            ts.space().push(Token::IfNotExists);
        }
        ts.space().push(Token::Ident(self.name.clone()));

        ts.space().lparen();

        let mut first = true;
        for col in &self.columns {
            if !first {
                ts.comma().space();
            }
            first = false;
            ts.append(&col.to_tokens(dialect));
        }

        for constraint in &self.constraints {
            if constraint.is_index() && !dialect.supports_inline_indexes() {
                continue;
            }
            if !first {
                ts.comma().space();
            }
            first = false;
            ts.append(&constraint.to_tokens(dialect));
        }

        ts.rparen();

        if let Some(options) = self
            .engine
            .as_deref()
            .and_then(|engine| dialect.table_options(engine))
        {
            ts.space().push(Token::Raw(options));
        }

        ts
    }
}

// ============================================================================
// Column Definition
// ============================================================================

/// Literal column default.
///
/// Defaults are schema text, not data: they are embedded in the DDL
/// rather than bound as parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// SQL expression such as `CURRENT_TIMESTAMP`, emitted verbatim.
    Expression(String),
}

impl DefaultValue {
    fn to_token(&self, column_type: &ColumnType) -> Token {
        match self {
            DefaultValue::Null => Token::Null,
            // TINYINT(1) columns take 1/0, never TRUE/FALSE
            DefaultValue::Bool(b) if column_type.is_tiny_boolean() => {
                Token::LitInt(i64::from(*b))
            }
            DefaultValue::Bool(b) => Token::LitBool(*b),
            DefaultValue::Int(n) => Token::LitInt(*n),
            DefaultValue::Float(f) => Token::LitFloat(*f),
            DefaultValue::Text(s) => Token::LitString(s.clone()),
            DefaultValue::Expression(e) => Token::Raw(e.clone()),
        }
    }
}

impl From<bool> for DefaultValue {
    fn from(b: bool) -> Self {
        DefaultValue::Bool(b)
    }
}

impl From<i64> for DefaultValue {
    fn from(n: i64) -> Self {
        DefaultValue::Int(n)
    }
}

impl From<i32> for DefaultValue {
    fn from(n: i32) -> Self {
        DefaultValue::Int(n.into())
    }
}

impl From<f64> for DefaultValue {
    fn from(f: f64) -> Self {
        DefaultValue::Float(f)
    }
}

impl From<&str> for DefaultValue {
    fn from(s: &str) -> Self {
        DefaultValue::Text(s.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(s: String) -> Self {
        DefaultValue::Text(s)
    }
}

/// Column definition for CREATE TABLE and ALTER TABLE ... ADD COLUMN.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unsigned: bool,
    pub auto_increment: bool,
    pub default: Option<DefaultValue>,
}

impl ColumnDef {
    /// Create a new NOT NULL column definition.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            unsigned: false,
            auto_increment: false,
            default: None,
        }
    }

    /// Mark column as NULL.
    pub fn null(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark column as UNSIGNED.
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Mark column as AUTO_INCREMENT.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Set default value.
    pub fn default(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Convert to token stream.
    ///
    /// `` `name` TYPE [UNSIGNED] NULL|NOT NULL [DEFAULT v] [AUTO_INCREMENT] ``
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Ident(self.name.clone()));
        ts.space()
            .push(Token::Raw(dialect.emit_column_type(&self.column_type)));

        if self.unsigned && dialect.supports_unsigned() && self.column_type.is_numeric() {
            ts.space().push(Token::Raw("UNSIGNED".into()));
        }

        ts.space().push(if self.nullable {
            Token::Null
        } else {
            Token::NotNull
        });

        if let Some(ref value) = self.default {
            ts.space()
                .push(Token::Default)
                .space()
                .push(value.to_token(&self.column_type));
        }

        if self.auto_increment {
            if let Some(keyword) = dialect.auto_increment_keyword() {
                ts.space().push(Token::Raw(keyword.into()));
            }
        }

        ts
    }
}

// ============================================================================
// Table Constraints
// ============================================================================

/// Secondary index kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Unique,
    Index,
    FullText,
    Spatial,
}

impl IndexKind {
    /// Suffix used in generated index names (`users_email_unique`).
    pub fn suffix(&self) -> &'static str {
        match self {
            IndexKind::Unique => "unique",
            IndexKind::Index => "index",
            IndexKind::FullText => "fulltext",
            IndexKind::Spatial => "spatial",
        }
    }

    fn keyword(&self) -> Option<&'static str> {
        match self {
            IndexKind::Unique => Some("UNIQUE"),
            IndexKind::Index => None,
            IndexKind::FullText => Some("FULLTEXT"),
            IndexKind::Spatial => Some("SPATIAL"),
        }
    }
}

/// Table-level constraints and inline index definitions.
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    PrimaryKey {
        columns: Vec<String>,
    },
    Index {
        kind: IndexKind,
        name: String,
        columns: Vec<String>,
    },
    ForeignKey {
        name: String,
        columns: Vec<String>,
        references_table: String,
        references_columns: Vec<String>,
        on_delete: Option<ReferentialAction>,
        on_update: Option<ReferentialAction>,
    },
}

impl TableConstraint {
    /// Create a PRIMARY KEY constraint.
    pub fn primary_key(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        TableConstraint::PrimaryKey {
            columns: columns.into_iter().map(|c| c.into()).collect(),
        }
    }

    /// Create a named index of the given kind.
    pub fn index(
        kind: IndexKind,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        TableConstraint::Index {
            kind,
            name: name.into(),
            columns: columns.into_iter().map(|c| c.into()).collect(),
        }
    }

    /// Create a named FOREIGN KEY constraint.
    pub fn foreign_key(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
        references_table: impl Into<String>,
        references_columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        TableConstraint::ForeignKey {
            name: name.into(),
            columns: columns.into_iter().map(|c| c.into()).collect(),
            references_table: references_table.into(),
            references_columns: references_columns.into_iter().map(|c| c.into()).collect(),
            on_delete: None,
            on_update: None,
        }
    }

    /// Whether this is a secondary index rather than a key constraint.
    pub fn is_index(&self) -> bool {
        matches!(self, TableConstraint::Index { .. })
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            TableConstraint::PrimaryKey { columns } => {
                ts.push(Token::Primary).space().push(Token::Key).space();
                emit_column_list(&mut ts, columns);
            }
            TableConstraint::Index {
                kind,
                name,
                columns,
            } => {
                if let Some(keyword) = kind.keyword() {
                    ts.push(Token::Raw(keyword.into())).space();
                }
                ts.push(Token::Index)
                    .space()
                    .push(Token::Ident(name.clone()))
                    .space();
                emit_column_list(&mut ts, columns);
            }
            TableConstraint::ForeignKey {
                name,
                columns,
                references_table,
                references_columns,
                on_delete,
                on_update,
            } => {
                ts.push(Token::Constraint)
                    .space()
                    .push(Token::Ident(name.clone()))
                    .space();
                ts.push(Token::Foreign).space().push(Token::Key).space();
                emit_column_list(&mut ts, columns);
                ts.space()
                    .push(Token::References)
                    .space()
                    .push(Token::Ident(references_table.clone()))
                    .space();
                emit_column_list(&mut ts, references_columns);

                if let Some(action) = on_delete {
                    ts.space()
                        .push(Token::On)
                        .space()
                        .push(Token::Delete)
                        .space()
                        .append(&action.to_tokens(dialect));
                }
                if let Some(action) = on_update {
                    ts.space()
                        .push(Token::On)
                        .space()
                        .push(Token::Update)
                        .space()
                        .append(&action.to_tokens(dialect));
                }
            }
        }

        ts
    }
}

/// Referential action for foreign key constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
}

impl ReferentialAction {
    /// Convert to token stream.
    pub fn to_tokens(&self, _dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        match self {
            ReferentialAction::NoAction => ts.push(Token::NoAction),
            ReferentialAction::Restrict => ts.push(Token::Restrict),
            ReferentialAction::Cascade => ts.push(Token::Cascade),
            ReferentialAction::SetNull => ts.push(Token::SetNull),
        };
        ts
    }
}

impl std::str::FromStr for ReferentialAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('_', " ");
        match normalized.as_str() {
            "CASCADE" => Ok(ReferentialAction::Cascade),
            "RESTRICT" => Ok(ReferentialAction::Restrict),
            "SET NULL" => Ok(ReferentialAction::SetNull),
            "NO ACTION" => Ok(ReferentialAction::NoAction),
            _ => Err(format!("unknown referential action: {}", s)),
        }
    }
}

// ============================================================================
// ALTER TABLE
// ============================================================================

/// ALTER TABLE statement.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct AlterTable {
    pub name: String,
    pub actions: Vec<AlterAction>,
}

impl AlterTable {
    /// Create a new ALTER TABLE statement.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Add a column.
    pub fn add_column(mut self, column: ColumnDef) -> Self {
        self.actions.push(AlterAction::AddColumn(column));
        self
    }

    /// Add a constraint or index.
    pub fn add_constraint(mut self, constraint: TableConstraint) -> Self {
        self.actions.push(AlterAction::AddConstraint(constraint));
        self
    }

    /// Whether there is anything to alter.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Every statement needed to apply the alteration.
    ///
    /// Dialects without multi-action ALTER get one statement per column, and
    /// indexes become CREATE INDEX statements when they cannot be added inline.
    pub fn to_statements(&self, dialect: Dialect) -> Vec<String> {
        if dialect.supports_multi_alter() && dialect.supports_inline_indexes() {
            return if self.is_empty() {
                Vec::new()
            } else {
                vec![self.to_sql(dialect)]
            };
        }

        self.actions
            .iter()
            .map(|action| match action {
                AlterAction::AddConstraint(TableConstraint::Index {
                    kind,
                    name,
                    columns,
                }) if !dialect.supports_inline_indexes() => {
                    CreateIndex::new(name.clone(), self.name.clone(), columns.clone())
                        .kind(*kind)
                        .to_sql(dialect)
                }
                other => AlterTable {
                    name: self.name.clone(),
                    actions: vec![other.clone()],
                }
                .to_sql(dialect),
            })
            .collect()
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Alter)
            .space()
            .push(Token::Table)
            .space()
            .push(Token::Ident(self.name.clone()));

        let mut first = true;
        for action in &self.actions {
            if !first {
                ts.comma();
            }
            first = false;
            ts.space().append(&action.to_tokens(dialect));
        }

        ts
    }
}

/// ALTER TABLE actions.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    AddConstraint(TableConstraint),
}

impl AlterAction {
    /// Convert to token stream.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            AlterAction::AddColumn(col) => {
                ts.push(Token::Add)
                    .space()
                    .push(Token::Column)
                    .space()
                    .append(&col.to_tokens(dialect));
            }
            AlterAction::AddConstraint(constraint) => {
                ts.push(Token::Add)
                    .space()
                    .append(&constraint.to_tokens(dialect));
            }
        }

        ts
    }
}

// ============================================================================
// DROP TABLE
// ============================================================================

/// DROP TABLE statement.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct DropTable {
    pub if_exists: bool,
    pub name: String,
}

impl DropTable {
    /// Create a new DROP TABLE statement.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            if_exists: false,
            name: name.into(),
        }
    }

    /// Add IF EXISTS clause.
    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, _dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Drop).space().push(Token::Table);
        if self.if_exists {
            ts.space().push(Token::IfExists);
        }
        ts.space().push(Token::Ident(self.name.clone()));

        ts
    }
}

// ============================================================================
// CREATE INDEX
// ============================================================================

/// CREATE INDEX statement, used where indexes cannot be declared inline.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct CreateIndex {
    pub kind: IndexKind,
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
}

impl CreateIndex {
    /// Create a plain (non-unique) index.
    pub fn new(name: impl Into<String>, table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            kind: IndexKind::Index,
            name: name.into(),
            table: table.into(),
            columns,
        }
    }

    /// Set the index kind.
    pub fn kind(mut self, kind: IndexKind) -> Self {
        self.kind = kind;
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Convert to token stream.
    pub fn to_tokens(&self, _dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Create).space();
        if let Some(keyword) = self.kind.keyword() {
            ts.push(Token::Raw(keyword.into())).space();
        }
        ts.push(Token::Index)
            .space()
            .push(Token::Ident(self.name.clone()))
            .space()
            .push(Token::On)
            .space()
            .push(Token::Ident(self.table.clone()))
            .space();
        emit_column_list(&mut ts, &self.columns);

        ts
    }
}

/// Emit `(col1, col2, ...)`.
fn emit_column_list(ts: &mut TokenStream, columns: &[String]) {
    ts.lparen();
    ts.comma_separated(columns, |ts, col| {
        ts.push(Token::Ident(col.clone()));
    });
    ts.rparen();
}
