use std::str::FromStr;

use serde_json::Value;

use crate::db::DbHandle;
use crate::http::{Request, Response};
use crate::view::NiacEngine;

use super::{Params, RoutingError, RoutingResult};

/// Everything a handler can reach: the request, the matched route
/// parameters and the application services.
pub struct RequestContext<'a> {
    pub request: Request,
    pub params: Params,
    views: &'a NiacEngine,
    db: Option<&'a DbHandle>,
}

impl<'a> RequestContext<'a> {
    pub fn new(request: Request, views: &'a NiacEngine, db: Option<&'a DbHandle>) -> Self {
        Self {
            request,
            params: Params::new(),
            views,
            db,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// A route parameter that must be present.
    pub fn require(&self, name: &str) -> RoutingResult<&str> {
        self.param(name)
            .ok_or_else(|| RoutingError::UnresolvedParameter(name.to_string()))
    }

    /// A route parameter parsed as `T`; an unparsable value is a 404.
    pub fn param_as<T: FromStr>(&self, name: &str) -> RoutingResult<T> {
        let raw = self.require(name)?;
        raw.parse().map_err(|_| RoutingError::InvalidParameter {
            name: name.to_string(),
            value: raw.to_string(),
        })
    }

    pub fn views(&self) -> &'a NiacEngine {
        self.views
    }

    pub fn db(&self) -> RoutingResult<&'a DbHandle> {
        self.db.ok_or(RoutingError::NoDatabase)
    }

    /// Render a view into an HTML response.
    pub fn view(&self, name: &str, data: &Value) -> RoutingResult<Response> {
        Ok(Response::html(self.views.render(name, data)?))
    }
}
