use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error};

use crate::db::DbHandle;
use crate::http::{normalize_path, Method, Request, Response};
use crate::view::NiacEngine;

use super::middleware::Next;
use super::{
    error_response, Action, Controller, Middleware, Params, RequestContext, Route, RoutingError,
    RoutingResult,
};

/// Attributes shared by the routes registered inside a [`Router::group`].
#[derive(Debug, Clone, Default)]
pub struct GroupAttributes {
    prefix: Option<String>,
    middleware: Vec<String>,
}

impl GroupAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middleware.push(name.into());
        self
    }
}

/// Route table plus the named middleware and controllers routes refer to.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    literal: HashMap<(Method, String), usize>,
    middleware: HashMap<String, Arc<dyn Middleware>>,
    controllers: HashMap<String, Arc<dyn Controller>>,
    groups: Vec<GroupAttributes>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("middleware", &self.middleware.keys().collect::<Vec<_>>())
            .field("controllers", &self.controllers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    pub fn get(&mut self, uri: &str, action: Action) -> &mut Route {
        self.add(Method::Get, uri, action)
    }

    pub fn post(&mut self, uri: &str, action: Action) -> &mut Route {
        self.add(Method::Post, uri, action)
    }

    pub fn put(&mut self, uri: &str, action: Action) -> &mut Route {
        self.add(Method::Put, uri, action)
    }

    pub fn patch(&mut self, uri: &str, action: Action) -> &mut Route {
        self.add(Method::Patch, uri, action)
    }

    pub fn delete(&mut self, uri: &str, action: Action) -> &mut Route {
        self.add(Method::Delete, uri, action)
    }

    /// Register a route. Enclosing group prefixes are prepended and group
    /// middleware runs before the route's own.
    pub fn add(&mut self, method: Method, uri: &str, action: Action) -> &mut Route {
        let mut full = String::new();
        let mut middleware = Vec::new();
        for group in &self.groups {
            if let Some(prefix) = &group.prefix {
                full.push('/');
                full.push_str(prefix.trim_matches('/'));
            }
            middleware.extend(group.middleware.iter().cloned());
        }
        full.push('/');
        full.push_str(uri.trim_matches('/'));
        let uri = normalize_path(&full);

        let route = Route::new(method, uri.clone(), action, middleware);
        let index = self.routes.len();
        if !route.is_parameterized() {
            // First registration wins for duplicate literals.
            self.literal.entry((method, uri)).or_insert(index);
        }
        debug!(method = %method, uri = %route.uri(), "registered route");
        self.routes.push(route);
        &mut self.routes[index]
    }

    /// Register routes sharing `attributes`. Groups nest.
    pub fn group(&mut self, attributes: GroupAttributes, routes: impl FnOnce(&mut Router)) {
        self.groups.push(attributes);
        routes(self);
        self.groups.pop();
    }

    pub fn register_middleware(&mut self, name: impl Into<String>, middleware: impl Middleware + 'static) {
        self.middleware.insert(name.into(), Arc::new(middleware));
    }

    pub fn register_controller(&mut self, name: impl Into<String>, controller: impl Controller + 'static) {
        self.controllers.insert(name.into(), Arc::new(controller));
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The route registered under `name`.
    pub fn named(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.route_name() == Some(name))
    }

    // =========================================================================
    // Matching
    // =========================================================================

    /// Find the route for `method` and `path`. Literal routes win over
    /// parameterized ones; HEAD falls back to GET.
    pub fn match_route(&self, method: Method, path: &str) -> Option<(&Route, Params)> {
        self.match_exact(method, path).or_else(|| {
            if method == Method::Head {
                self.match_exact(Method::Get, path)
            } else {
                None
            }
        })
    }

    fn match_exact(&self, method: Method, path: &str) -> Option<(&Route, Params)> {
        let path = normalize_path(path);
        if let Some(&index) = self.literal.get(&(method, path.clone())) {
            return Some((&self.routes[index], Params::new()));
        }
        self.routes
            .iter()
            .filter(|r| r.method() == method)
            .find_map(|r| r.captures(&path).map(|params| (r, params)))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Run the matched route through its middleware. Errors are returned
    /// unrendered.
    pub fn dispatch(&self, ctx: &mut RequestContext<'_>) -> RoutingResult<Response> {
        let method = ctx.request.method();
        let (route, params) = self
            .match_route(method, ctx.request.path())
            .ok_or_else(|| RoutingError::NotFound {
                method,
                path: ctx.request.path().to_string(),
            })?;
        ctx.params = params;

        let chain = route
            .middleware_names()
            .iter()
            .map(|name| {
                self.middleware
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RoutingError::UnknownMiddleware(name.clone()))
            })
            .collect::<RoutingResult<Vec<_>>>()?;

        let endpoint = |ctx: &mut RequestContext<'_>| self.invoke(route.action(), ctx);
        Next::new(&chain, &endpoint).run(ctx)
    }

    fn invoke(&self, action: &Action, ctx: &mut RequestContext<'_>) -> RoutingResult<Response> {
        match action {
            Action::Handler(handler) => handler(ctx),
            Action::Controller { controller, action } => self
                .controllers
                .get(controller)
                .ok_or_else(|| RoutingError::UnknownController(controller.clone()))?
                .call(action, ctx),
        }
    }

    /// Dispatch `request` and turn any error into an error page.
    pub fn handle(&self, request: Request, views: &NiacEngine, db: Option<&DbHandle>) -> Response {
        let method = request.method();
        let path = request.path().to_string();
        let mut ctx = RequestContext::new(request, views, db);
        match self.dispatch(&mut ctx) {
            Ok(response) => {
                debug!(method = %method, path = %path, status = response.status(), "handled request");
                response
            }
            Err(err) => {
                let status = err.status();
                if status >= 500 {
                    error!(method = %method, path = %path, status, error = %err, "request failed");
                } else {
                    debug!(method = %method, path = %path, status, error = %err, "request rejected");
                }
                error_response(views, status, &err.public_message())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn text(body: &'static str) -> Action {
        Action::handler(move |_| Ok(Response::text(body)))
    }

    fn engine() -> (tempfile::TempDir, NiacEngine) {
        let dir = tempfile::tempdir().unwrap();
        let engine = NiacEngine::new(vec![dir.path().join("views")], dir.path().join("cache")).unwrap();
        (dir, engine)
    }

    #[test]
    fn test_literal_beats_parameterized_regardless_of_order() {
        let mut router = Router::new();
        router.get("/users/{id}", text("param"));
        router.get("/users/create", text("literal"));

        let (route, params) = router.match_route(Method::Get, "/users/create").unwrap();
        assert_eq!(route.uri(), "/users/create");
        assert!(params.is_empty());

        let (route, params) = router.match_route(Method::Get, "/users/9").unwrap();
        assert_eq!(route.uri(), "/users/{id}");
        assert_eq!(params["id"], "9");
    }

    #[test]
    fn test_method_must_match_and_head_falls_back() {
        let mut router = Router::new();
        router.get("/", text("home"));
        assert!(router.match_route(Method::Post, "/").is_none());
        assert!(router.match_route(Method::Head, "/").is_some());
    }

    #[test]
    fn test_group_prefix_and_middleware_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        for name in ["auth", "admin", "audit"] {
            let log = Arc::clone(&log);
            router.register_middleware(name, move |ctx: &mut RequestContext<'_>, next: Next<'_>| {
                log.lock().unwrap().push(name);
                next.run(ctx)
            });
        }
        router.group(GroupAttributes::new().prefix("/admin").middleware("auth"), |r| {
            r.group(GroupAttributes::new().middleware("admin"), |r| {
                r.get("/dashboard/", text("ok")).middleware("audit").name("dashboard");
            });
        });
        router.get("/public", text("open"));

        assert_eq!(router.routes()[0].uri(), "/admin/dashboard");
        assert_eq!(router.routes()[0].middleware_names(), ["auth", "admin", "audit"]);
        assert!(router.routes()[1].middleware_names().is_empty());
        assert_eq!(router.named("dashboard").unwrap().uri(), "/admin/dashboard");

        let (_dir, views) = engine();
        let response = router.handle(Request::get("/admin/dashboard"), &views, None);
        assert_eq!(response.body(), "ok");
        assert_eq!(*log.lock().unwrap(), ["auth", "admin", "audit"]);
    }

    #[test]
    fn test_middleware_can_short_circuit() {
        let mut router = Router::new();
        router.register_middleware("guest", |_: &mut RequestContext<'_>, _: Next<'_>| {
            Ok(Response::redirect("/login"))
        });
        router.get("/secret", text("secret")).middleware("guest");

        let (_dir, views) = engine();
        let response = router.handle(Request::get("/secret"), &views, None);
        assert_eq!(response.status(), 302);
        assert_eq!(response.header("location"), Some("/login"));
    }

    #[test]
    fn test_unknown_middleware_is_an_error() {
        let mut router = Router::new();
        router.get("/", text("home")).middleware("missing");

        let (_dir, views) = engine();
        let mut ctx = RequestContext::new(Request::get("/"), &views, None);
        assert!(matches!(
            router.dispatch(&mut ctx),
            Err(RoutingError::UnknownMiddleware(name)) if name == "missing"
        ));
    }

    struct Users;

    impl Controller for Users {
        fn call(&self, action: &str, ctx: &mut RequestContext<'_>) -> RoutingResult<Response> {
            match action {
                "show" => {
                    let id: i64 = ctx.param_as("id")?;
                    Ok(Response::text(format!("user {}", id)))
                }
                "update" => Ok(Response::text(format!(
                    "updated {}",
                    ctx.request.input("name").unwrap_or_default()
                ))),
                other => Err(RoutingError::UnknownAction {
                    controller: "users".into(),
                    action: other.into(),
                }),
            }
        }
    }

    #[test]
    fn test_controller_dispatch() {
        let mut router = Router::new();
        router.register_controller("users", Users);
        router.get("/users/{id}", Action::controller("users", "show"));
        router.put("/users/{id}", Action::controller("users", "update"));
        router.get("/users/{id}/edit", Action::controller("users", "edit"));

        let (_dir, views) = engine();
        let shown = router.handle(Request::get("/users/5"), &views, None);
        assert_eq!(shown.body(), "user 5");

        let invalid = router.handle(Request::get("/users/abc"), &views, None);
        assert_eq!(invalid.status(), 404);

        let broken = router.handle(Request::get("/users/5/edit"), &views, None);
        assert_eq!(broken.status(), 500);
    }

    #[test]
    fn test_spoofed_method_reaches_put_route() {
        let mut router = Router::new();
        router.register_controller("users", Users);
        router.put("/users/{id}", Action::controller("users", "update"));

        let (_dir, views) = engine();
        let request = Request::post("/users/5")
            .with_form("_method", "PUT")
            .with_form("name", "Ada");
        let response = router.handle(request, &views, None);
        assert_eq!(response.body(), "updated Ada");
    }

    #[test]
    fn test_unmatched_request_renders_not_found_page() {
        let router = Router::new();
        let (_dir, views) = engine();
        let response = router.handle(Request::get("/nowhere"), &views, None);
        assert_eq!(response.status(), 404);
        assert!(response.body().contains("404 Page Not Found"));
    }
}
