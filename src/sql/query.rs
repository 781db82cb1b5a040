//! SELECT statements and the predicate pieces shared with DML.
//!
//! These are plain descriptions of a statement; the stateful, executing
//! builder lives in [`crate::query`]. Values never appear here, only the
//! placeholder names they are bound under.

use once_cell::sync::Lazy;
use regex::Regex;

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};

// =============================================================================
// Column References
// =============================================================================

static COLUMN_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([A-Za-z_][A-Za-z0-9_]*)\.)?([A-Za-z_][A-Za-z0-9_]*|\*)$")
        .expect("valid column regex")
});

static NULLARY_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\(\)$").expect("valid call regex"));

static ALIASED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s+as\s+([A-Za-z_][A-Za-z0-9_]*)$").expect("valid alias regex"));

/// Tokens for a column reference written by the caller.
///
/// `name`, `table.name`, `table.*` and `*` are quoted per dialect;
/// `expr as alias` quotes both halves where possible. Zero-argument calls
/// such as `RAND()` are renamed per dialect. Anything else (`COUNT(*)`) is
/// taken as an SQL expression and passed through.
pub fn column_ref(column: &str) -> TokenStream {
    let column = column.trim();
    let mut ts = TokenStream::new();

    if let Some(caps) = ALIASED.captures(column) {
        ts.append(&column_ref(&caps[1]))
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(caps[2].to_string()));
        return ts;
    }

    if let Some(caps) = NULLARY_CALL.captures(column) {
        ts.push(Token::FunctionName(caps[1].to_string()))
            .lparen()
            .rparen();
        return ts;
    }

    match COLUMN_REF.captures(column) {
        Some(caps) => {
            let qualifier = caps.get(1).map(|m| m.as_str().to_string());
            let name = &caps[2];
            if name == "*" {
                if let Some(q) = qualifier {
                    ts.push(Token::Ident(q)).push(Token::Dot);
                }
                ts.push(Token::Star);
            } else {
                ts.push(Token::QualifiedIdent {
                    qualifier,
                    name: name.to_string(),
                });
            }
        }
        None => {
            ts.push(Token::Raw(column.to_string()));
        }
    }

    ts
}

// =============================================================================
// Operators
// =============================================================================

/// Comparison operators accepted by `where`/`having`/`join`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Lt,
    Gt,
    Lte,
    Gte,
    /// `<>`
    Ne,
    /// `!=`
    BangEq,
    Like,
    NotLike,
    In,
    NotIn,
}

impl Operator {
    /// Whether the operator takes a list of values.
    pub fn is_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    fn token(&self) -> Token {
        match self {
            Operator::Eq => Token::Eq,
            Operator::Lt => Token::Lt,
            Operator::Gt => Token::Gt,
            Operator::Lte => Token::Lte,
            Operator::Gte => Token::Gte,
            Operator::Ne => Token::Ne,
            Operator::BangEq => Token::BangEq,
            Operator::Like => Token::Like,
            Operator::NotLike => Token::NotLike,
            Operator::In => Token::In,
            Operator::NotIn => Token::NotIn,
        }
    }
}

impl std::str::FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        match normalized.as_str() {
            "=" => Ok(Operator::Eq),
            "<" => Ok(Operator::Lt),
            ">" => Ok(Operator::Gt),
            "<=" => Ok(Operator::Lte),
            ">=" => Ok(Operator::Gte),
            "<>" => Ok(Operator::Ne),
            "!=" => Ok(Operator::BangEq),
            "LIKE" => Ok(Operator::Like),
            "NOT LIKE" => Ok(Operator::NotLike),
            "IN" => Ok(Operator::In),
            "NOT IN" => Ok(Operator::NotIn),
            _ => Err(s.to_string()),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token().serialize(Dialect::default()))
    }
}

// =============================================================================
// Predicates
// =============================================================================

/// How a predicate joins the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

/// A single WHERE/HAVING condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column op :placeholder`
    Compare {
        column: String,
        operator: Operator,
        placeholder: String,
    },
    /// `column [NOT] IN (:p_0, :p_1, ...)`
    List {
        column: String,
        negated: bool,
        placeholders: Vec<String>,
    },
    /// Constant truth value standing in for an empty IN list:
    /// `0=1` (never) or `1=1` (always).
    Constant(bool),
}

impl Condition {
    fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        match self {
            Condition::Compare {
                column,
                operator,
                placeholder,
            } => {
                ts.append(&column_ref(column))
                    .space()
                    .push(operator.token())
                    .space()
                    .push(Token::Placeholder(placeholder.clone()));
            }
            Condition::List {
                column,
                negated,
                placeholders,
            } => {
                ts.append(&column_ref(column))
                    .space()
                    .push(if *negated { Token::NotIn } else { Token::In })
                    .space()
                    .lparen();
                ts.comma_separated(placeholders, |ts, p| {
                    ts.push(Token::Placeholder(p.clone()));
                });
                ts.rparen();
            }
            Condition::Constant(true) => {
                ts.push(Token::Raw("1=1".into()));
            }
            Condition::Constant(false) => {
                ts.push(Token::Raw("0=1".into()));
            }
        }
        ts
    }
}

/// A condition plus the connector that attaches it to the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub connector: Connector,
    pub condition: Condition,
}

/// Emit `KEYWORD cond [AND|OR cond]...`, or nothing for an empty list.
pub(crate) fn emit_predicates(ts: &mut TokenStream, keyword: Token, predicates: &[Predicate]) {
    if predicates.is_empty() {
        return;
    }
    ts.space().push(keyword);
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            ts.space().push(match predicate.connector {
                Connector::And => Token::And,
                Connector::Or => Token::Or,
            });
        }
        ts.space().append(&predicate.condition.to_tokens());
    }
}

// =============================================================================
// Joins
// =============================================================================

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl std::str::FromStr for JoinType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INNER" => Ok(JoinType::Inner),
            "LEFT" => Ok(JoinType::Left),
            "RIGHT" => Ok(JoinType::Right),
            "FULL" => Ok(JoinType::Full),
            _ => Err(s.to_string()),
        }
    }
}

/// A JOIN clause: `TYPE JOIN table ON first op second`.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: String,
    pub first: String,
    pub operator: Operator,
    pub second: String,
}

impl Join {
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(match self.join_type {
            JoinType::Inner => Token::Inner,
            JoinType::Left => Token::Left,
            JoinType::Right => Token::Right,
            JoinType::Full => Token::Full,
        });

        ts.space()
            .push(Token::Join)
            .space()
            .append(&column_ref(&self.table))
            .space()
            .push(Token::On)
            .space()
            .append(&column_ref(&self.first))
            .space()
            .push(self.operator.token())
            .space()
            .append(&column_ref(&self.second));

        ts
    }
}

// =============================================================================
// ORDER BY
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    /// Parse a direction, falling back to ascending for anything unrecognised.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortDir::Desc
        } else {
            SortDir::Asc
        }
    }
}

/// An ORDER BY expression.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub column: String,
    pub dir: SortDir,
}

impl OrderByExpr {
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = column_ref(&self.column);
        ts.space().push(match self.dir {
            SortDir::Asc => Token::Asc,
            SortDir::Desc => Token::Desc,
        });
        ts
    }
}

// =============================================================================
// SELECT
// =============================================================================

/// A complete SELECT statement.
#[derive(Debug, Clone, PartialEq, Default)]
#[must_use = "builders have no effect until used"]
pub struct Select {
    pub distinct: bool,
    pub columns: Vec<String>,
    pub from: String,
    pub joins: Vec<Join>,
    pub wheres: Vec<Predicate>,
    pub group_by: Vec<String>,
    pub having: Vec<Predicate>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    /// Clause order: SELECT, FROM, JOIN, WHERE, GROUP BY, HAVING, ORDER BY,
    /// LIMIT, OFFSET.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Select).space();
        if self.distinct {
            ts.push(Token::Distinct).space();
        }
        if self.columns.is_empty() {
            ts.push(Token::Star);
        } else {
            ts.comma_separated(&self.columns, |ts, c| {
                ts.append(&column_ref(c));
            });
        }

        ts.space()
            .push(Token::From)
            .space()
            .append(&column_ref(&self.from));

        for join in &self.joins {
            ts.space().append(&join.to_tokens());
        }

        emit_predicates(&mut ts, Token::Where, &self.wheres);

        if !self.group_by.is_empty() {
            ts.space().push(Token::GroupBy).space();
            ts.comma_separated(&self.group_by, |ts, c| {
                ts.append(&column_ref(c));
            });
        }

        emit_predicates(&mut ts, Token::Having, &self.having);

        if !self.order_by.is_empty() {
            ts.space().push(Token::OrderBy).space();
            ts.comma_separated(&self.order_by, |ts, o| {
                ts.append(&o.to_tokens());
            });
        }

        let page = dialect.emit_limit_offset(self.limit, self.offset);
        if !page.is_empty() {
            ts.space().append(&page);
        }

        ts
    }
}
