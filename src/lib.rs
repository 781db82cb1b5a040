//! # Maniac
//!
//! A small synchronous MVC web framework.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │            HTTP (Request / Response, axum adapter)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [routing]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Router → Middleware chain → Handler/Controller    │
//! └─────────────────────────────────────────────────────────┘
//!                │                            │
//!                ▼ [view]                     ▼ [orm / query]
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │  Niac templates           │  │  Model<E> / QueryBuilder │
//! │  lex → parse → compile    │  │  Blueprint / Migrator    │
//! │  → JSON cache → render    │  └──────────────────────────┘
//! └───────────────────────────┘               │
//!                                             ▼ [sql / db]
//!                              ┌──────────────────────────┐
//!                              │  Tokens → dialect SQL    │
//!                              │  Connection (SQLite)     │
//!                              └──────────────────────────┘
//! ```
//!
//! [`mail`] renders mailables through the same view engine, and
//! [`notifications`] fans a notification out to mail and database channels.
//!
//! An [`App`](foundation::App) ties these together. It is built
//! explicitly from [`Settings`](config::Settings); there is no global
//! state.

pub mod config;
pub mod db;
pub mod foundation;
pub mod http;
pub mod mail;
pub mod notifications;
pub mod orm;
pub mod query;
pub mod routing;
pub mod schema;
pub mod sql;
pub mod view;

#[cfg(feature = "server")]
pub mod web;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::db::{DbHandle, Value};
    pub use crate::foundation::App;
    pub use crate::http::{Method, Request, Response};
    pub use crate::mail::{Mailable, Mailer, Outbox};
    pub use crate::notifications::{Notifiable, Notification, NotificationSender};
    pub use crate::orm::{Entity, Model};
    pub use crate::query::QueryBuilder;
    pub use crate::routing::{Action, Controller, GroupAttributes, Middleware, Next, RequestContext, Router};
    pub use crate::schema::{Blueprint, Migration, Migrator, Schema};
    pub use crate::sql::{Dialect, SqlDialect};
    pub use crate::view::NiacEngine;
}

pub use foundation::App;
pub use query::QueryBuilder;
pub use view::NiacEngine;
