//! Template syntax tree.
//!
//! This is also the compiled form: [`CompiledView`](super::CompiledView)
//! stores a `Vec<Node>` serialized as JSON in the view cache.

use serde::{Deserialize, Serialize};

use super::expr::{Expr, ForHeader, ForeachHeader, Stmt};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "node")]
pub enum Node {
    Text {
        text: String,
    },
    Echo {
        expr: Expr,
        escape: bool,
    },
    /// `@if`/`@elseif`/`@else`; also `@isset` and `@empty` blocks.
    If {
        branches: Vec<Branch>,
        otherwise: Option<Vec<Node>>,
    },
    /// `@foreach`, or `@forelse` when `empty` is present.
    Foreach {
        header: ForeachHeader,
        body: Vec<Node>,
        empty: Option<Vec<Node>>,
    },
    For {
        header: ForHeader,
        body: Vec<Node>,
    },
    While {
        condition: Expr,
        body: Vec<Node>,
    },
    /// Cases run from the first match until `@break`, like PHP's switch.
    Switch {
        subject: Expr,
        cases: Vec<Case>,
    },
    Break {
        condition: Option<Expr>,
    },
    Continue {
        condition: Option<Expr>,
    },
    Php {
        statements: Vec<Stmt>,
    },
    Include {
        view: Expr,
        data: Option<Expr>,
    },
    /// `@component`; `Slot` nodes in the body become named variables.
    Component {
        view: Expr,
        data: Option<Expr>,
        body: Vec<Node>,
    },
    Slot {
        name: String,
        body: Vec<Node>,
    },
    Yield {
        section: String,
        default: Option<Expr>,
    },
    Section {
        name: String,
        body: Vec<Node>,
    },
    Csrf,
    /// Always one of PUT, POST, DELETE or PATCH.
    Method {
        method: String,
    },
    Asset {
        path: Expr,
    },
    Title {
        value: Expr,
    },
    Meta {
        name: Expr,
        content: Expr,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: Expr,
    pub body: Vec<Node>,
}

/// A `@case`, or `@default` when `value` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub value: Option<Expr>,
    pub body: Vec<Node>,
}
