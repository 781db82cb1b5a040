//! SQL Tokens - the atomic units of SQL output.
//!
//! Tokens are dialect-agnostic representations that serialize
//! to dialect-specific strings. Both the query builder and the
//! schema builder emit token streams; nothing in the crate
//! concatenates SQL text by hand.

use super::dialect::{Dialect, SqlDialect};

/// SQL Token - every element the query and schema builders emit.
///
/// Adding a new variant here will cause compile errors everywhere
/// it needs to be handled (exhaustive matching).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Query Keywords ===
    Select,
    Distinct,
    From,
    Where,
    And,
    Or,
    As,
    On,
    Join,
    Inner,
    Left,
    Right,
    Full,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    Limit,
    Offset,
    In,
    NotIn,
    Like,
    NotLike,
    Null,
    NotNull,

    // === DDL Keywords ===
    Create,
    Alter,
    Drop,
    Table,
    Column,
    Index,
    Constraint,
    Primary,
    Key,
    Foreign,
    References,
    Unique,
    Default,
    Cascade,
    Restrict,
    NoAction,
    SetNull,
    Add,
    IfExists,
    IfNotExists,

    // === DML Keywords ===
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,

    // === Punctuation ===
    Comma,
    Dot,
    Star,
    LParen,
    RParen,

    // === Operators ===
    Eq,
    /// `<>`
    Ne,
    /// `!=`, kept distinct from `<>` so the caller's spelling survives.
    BangEq,
    Lt,
    Gt,
    Lte,
    Gte,
    Plus,
    Minus,

    // === Whitespace ===
    Space,

    // === Dynamic Content ===
    /// Simple identifier (table, column, alias)
    Ident(String),
    /// Qualified identifier: `table.column` or just `column`
    QualifiedIdent {
        qualifier: Option<String>,
        name: String,
    },
    /// Named bind parameter, serialized as `:name`
    Placeholder(String),
    /// Integer literal
    LitInt(i64),
    /// Float literal
    LitFloat(f64),
    /// String literal
    LitString(String),
    /// Boolean literal
    LitBool(bool),

    /// Function name, remapped per dialect (`RAND` on MySQL, `RANDOM` on SQLite)
    FunctionName(String),

    // === Escape Hatch ===
    /// Raw SQL passed directly to output without escaping.
    ///
    /// # Security Warning
    ///
    /// **Never pass user input to this variant.** Raw SQL is not sanitized.
    /// The builders only use it for expressions the caller wrote as SQL
    /// (`COUNT(*)`, column expressions) and for dialect keywords.
    Raw(String),
}

impl Token {
    /// Serialize this token to a string for the given dialect.
    pub fn serialize(&self, dialect: Dialect) -> String {
        match self {
            // Query keywords
            Token::Select => "SELECT".into(),
            Token::Distinct => "DISTINCT".into(),
            Token::From => "FROM".into(),
            Token::Where => "WHERE".into(),
            Token::And => "AND".into(),
            Token::Or => "OR".into(),
            Token::As => "AS".into(),
            Token::On => "ON".into(),
            Token::Join => "JOIN".into(),
            Token::Inner => "INNER".into(),
            Token::Left => "LEFT".into(),
            Token::Right => "RIGHT".into(),
            Token::Full => "FULL".into(),
            Token::GroupBy => "GROUP BY".into(),
            Token::Having => "HAVING".into(),
            Token::OrderBy => "ORDER BY".into(),
            Token::Asc => "ASC".into(),
            Token::Desc => "DESC".into(),
            Token::Limit => "LIMIT".into(),
            Token::Offset => "OFFSET".into(),
            Token::In => "IN".into(),
            Token::NotIn => "NOT IN".into(),
            Token::Like => "LIKE".into(),
            Token::NotLike => "NOT LIKE".into(),
            Token::Null => "NULL".into(),
            Token::NotNull => "NOT NULL".into(),

            // DDL keywords
            Token::Create => "CREATE".into(),
            Token::Alter => "ALTER".into(),
            Token::Drop => "DROP".into(),
            Token::Table => "TABLE".into(),
            Token::Column => "COLUMN".into(),
            Token::Index => "INDEX".into(),
            Token::Constraint => "CONSTRAINT".into(),
            Token::Primary => "PRIMARY".into(),
            Token::Key => "KEY".into(),
            Token::Foreign => "FOREIGN".into(),
            Token::References => "REFERENCES".into(),
            Token::Unique => "UNIQUE".into(),
            Token::Default => "DEFAULT".into(),
            Token::Cascade => "CASCADE".into(),
            Token::Restrict => "RESTRICT".into(),
            Token::NoAction => "NO ACTION".into(),
            Token::SetNull => "SET NULL".into(),
            Token::Add => "ADD".into(),
            Token::IfExists => "IF EXISTS".into(),
            Token::IfNotExists => "IF NOT EXISTS".into(),

            // DML keywords
            Token::Insert => "INSERT".into(),
            Token::Into => "INTO".into(),
            Token::Values => "VALUES".into(),
            Token::Update => "UPDATE".into(),
            Token::Set => "SET".into(),
            Token::Delete => "DELETE".into(),

            // Punctuation
            Token::Comma => ",".into(),
            Token::Dot => ".".into(),
            Token::Star => "*".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),

            // Operators
            Token::Eq => "=".into(),
            Token::Ne => "<>".into(),
            Token::BangEq => "!=".into(),
            Token::Lt => "<".into(),
            Token::Gt => ">".into(),
            Token::Lte => "<=".into(),
            Token::Gte => ">=".into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),

            Token::Space => " ".into(),

            // Dynamic - dialect-specific formatting
            Token::Ident(name) => dialect.quote_identifier(name),
            Token::QualifiedIdent { qualifier, name } => match qualifier {
                Some(q) => format!(
                    "{}.{}",
                    dialect.quote_identifier(q),
                    dialect.quote_identifier(name)
                ),
                None => dialect.quote_identifier(name),
            },
            Token::Placeholder(name) => format!(":{}", name),
            Token::LitInt(n) => n.to_string(),
            Token::LitFloat(f) => {
                if !f.is_finite() {
                    return "NULL".into();
                }
                // Use ryu for fast, accurate float formatting
                let mut buffer = ryu::Buffer::new();
                buffer.format(*f).to_string()
            }
            Token::LitString(s) => dialect.quote_string(s),
            Token::LitBool(b) => dialect.format_bool(*b).into(),

            Token::FunctionName(name) => match dialect.remap_function(name) {
                Some(remapped) => remapped.to_uppercase(),
                None => name.to_uppercase(),
            },

            Token::Raw(s) => s.clone(),
        }
    }
}

/// A stream of tokens that can be serialized to SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    /// Create an empty token stream.
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    /// Push a single token.
    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    /// Extend with multiple tokens.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) -> &mut Self {
        self.tokens.extend(tokens);
        self
    }

    /// Append another token stream.
    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    /// Whether nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Serialize all tokens to a SQL string.
    pub fn serialize(&self, dialect: Dialect) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }

    // Convenience methods for common tokens
    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }
    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }
    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }
    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }

    /// Push `items` separated by `", "`.
    pub fn comma_separated<T>(
        &mut self,
        items: impl IntoIterator<Item = T>,
        mut each: impl FnMut(&mut Self, T),
    ) -> &mut Self {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.comma().space();
            }
            each(self, item);
        }
        self
    }
}
