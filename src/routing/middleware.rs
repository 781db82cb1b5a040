use std::sync::Arc;

use crate::http::Response;

use super::{RequestContext, RoutingResult};

/// Wraps a route's action. Call `next.run(ctx)` to continue, or return a
/// response to short-circuit.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: &mut RequestContext<'_>, next: Next<'_>) -> RoutingResult<Response>;
}

impl<F> Middleware for F
where
    F: Fn(&mut RequestContext<'_>, Next<'_>) -> RoutingResult<Response> + Send + Sync,
{
    fn handle(&self, ctx: &mut RequestContext<'_>, next: Next<'_>) -> RoutingResult<Response> {
        self(ctx, next)
    }
}

type Endpoint<'a> = &'a (dyn Fn(&mut RequestContext<'_>) -> RoutingResult<Response> + 'a);

/// The rest of the middleware chain, ending in the route action.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    endpoint: Endpoint<'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], endpoint: Endpoint<'a>) -> Self {
        Self { chain, endpoint }
    }

    pub fn run(self, ctx: &mut RequestContext<'_>) -> RoutingResult<Response> {
        match self.chain.split_first() {
            Some((first, rest)) => first.handle(ctx, Next::new(rest, self.endpoint)),
            None => (self.endpoint)(ctx),
        }
    }
}

/// A named group of actions, addressed as `Action::controller(name, action)`.
///
/// Unknown actions should return [`RoutingError::UnknownAction`](super::RoutingError::UnknownAction).
pub trait Controller: Send + Sync {
    fn call(&self, action: &str, ctx: &mut RequestContext<'_>) -> RoutingResult<Response>;
}
