//! Request routing.
//!
//! Routes map a method and URI pattern (`/users/{id}`) to an [`Action`]:
//! a closure, or a named [`Controller`] method. Named [`Middleware`] wrap
//! the action, outermost first. Literal routes always outrank
//! parameterized ones; parameterized routes match in registration order.

mod context;
mod error_page;
mod middleware;
mod route;
mod router;

pub use context::RequestContext;
pub use error_page::{default_message, error_response, fallback_html};
pub use middleware::{Controller, Middleware, Next};
pub use route::{Action, Handler, Params, Route};
pub use router::{GroupAttributes, Router};

use crate::http::{HttpError, Method};
use crate::orm::ModelError;
use crate::query::QueryError;
use crate::view::ViewError;

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("No route matches {method} {path}")]
    NotFound { method: Method, path: String },

    #[error("Middleware [{0}] is not registered")]
    UnknownMiddleware(String),

    #[error("Controller [{0}] is not registered")]
    UnknownController(String),

    #[error("Controller [{controller}] has no action [{action}]")]
    UnknownAction { controller: String, action: String },

    #[error("Unresolved route parameter [{0}]")]
    UnresolvedParameter(String),

    #[error("Route parameter [{name}] has an invalid value '{value}'")]
    InvalidParameter { name: String, value: String },

    #[error("No database connection is configured")]
    NoDatabase,

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl RoutingError {
    /// HTTP status for this error.
    pub fn status(&self) -> u16 {
        match self {
            RoutingError::NotFound { .. } | RoutingError::InvalidParameter { .. } => 404,
            RoutingError::Model(e) if e.is_not_found() => 404,
            RoutingError::Http(e) => e.status(),
            _ => 500,
        }
    }

    /// Message shown on the error page. Internal details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            RoutingError::Http(HttpError::Status { message, .. }) => message.clone(),
            other => default_message(other.status()).to_string(),
        }
    }
}

pub type RoutingResult<T> = Result<T, RoutingError>;
