//! Template expression language.
//!
//! A small PHP-like language: variables (`$user`), property and index
//! access (`$user->name`, `$row['id']`), literals, arrays, arithmetic,
//! `.` concatenation, comparison, logical operators, `??`, the ternary and
//! calls to helper functions. `@php` blocks add assignment statements.

mod eval;
pub mod lexer;
mod parser;

use serde::{Deserialize, Serialize};

pub use eval::{is_truthy, loose_eq, to_display, Evaluator, Functions, Scope};
pub use parser::{parse_args, parse_expr, parse_for_header, parse_foreach_header, parse_statements};

/// Parse failure with a byte span relative to the parsed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprError {
    pub message: String,
    pub span: std::ops::Range<usize>,
}

impl ExprError {
    pub fn new(message: impl Into<String>, span: std::ops::Range<usize>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    /// Shift the span by `offset` bytes.
    pub fn offset(mut self, offset: usize) -> Self {
        self.span = self.span.start + offset..self.span.end + offset;
        self
    }
}

impl std::fmt::Display for ExprError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Expr {
    Null,
    Bool { value: bool },
    Int { value: i64 },
    Float { value: f64 },
    Str { value: String },
    Var { name: String },
    /// `[a, b]` or `['k' => v]`.
    Array { items: Vec<ArrayItem> },
    /// `$object->name`
    Property { object: Box<Expr>, name: String },
    /// `$array[key]`
    Index { object: Box<Expr>, index: Box<Expr> },
    Call { function: String, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    /// `a ? b : c`, or `a ?: c` when `then` is absent.
    Ternary {
        condition: Box<Expr>,
        then: Option<Box<Expr>>,
        otherwise: Box<Expr>,
    },
    Coalesce { left: Box<Expr>, right: Box<Expr> },
}

impl Expr {
    pub fn str(value: impl Into<String>) -> Self {
        Expr::Str {
            value: value.into(),
        }
    }

    /// The literal string, if this is one.
    pub fn as_literal_str(&self) -> Option<&str> {
        match self {
            Expr::Str { value } => Some(value),
            _ => None,
        }
    }

    /// Whether this expression can be assigned to.
    pub fn is_place(&self) -> bool {
        match self {
            Expr::Var { .. } => true,
            Expr::Property { object, .. } | Expr::Index { object, .. } => object.is_place(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Concat,
    Coalesce,
}

/// Statement in an `@php` block or a `@for` header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Stmt {
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    /// `$i++`, `--$i`.
    Step { target: Expr, delta: i64 },
    Expr { expr: Expr },
}

/// `@foreach` / `@forelse` header: `source as [$key =>] $value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeachHeader {
    pub source: Expr,
    pub key: Option<String>,
    pub value: String,
}

/// `@for` header: `init; condition; step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForHeader {
    pub init: Vec<Stmt>,
    pub condition: Option<Expr>,
    pub step: Vec<Stmt>,
}
