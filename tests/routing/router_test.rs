#[cfg(test)]
mod tests {
    use std::fs;

    use maniac::http::{HttpError, Method, Request, Response};
    use maniac::orm::ModelError;
    use maniac::routing::{
        Action, GroupAttributes, Next, Params, RequestContext, Router, RoutingError,
    };
    use maniac::view::NiacEngine;
    use serde_json::json;
    use tempfile::TempDir;

    fn views(files: &[(&str, &str)]) -> (TempDir, NiacEngine) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("views");
        for (name, source) in files {
            let path = root.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, source).unwrap();
        }
        let engine = NiacEngine::new(vec![root], dir.path().join("cache")).unwrap();
        (dir, engine)
    }

    fn text(body: &'static str) -> Action {
        Action::handler(move |_| Ok(Response::text(body)))
    }

    /// Routes of a small blog.
    fn blog() -> Router {
        let mut router = Router::new();
        router.get("/", text("home"));
        router
            .get("/posts/{post}/comments/{comment}", Action::handler(|ctx| {
                Ok(Response::text(format!(
                    "post {} comment {}",
                    ctx.require("post")?,
                    ctx.require("comment")?
                )))
            }))
            .name("comments.show");
        router.get("/posts/latest", text("latest"));
        router.get("/posts/{slug}", Action::handler(|ctx| {
            ctx.view("posts.show", &json!({ "slug": ctx.require("slug")? }))
        }));
        router.get("/search", Action::handler(|ctx| {
            let term = ctx.request.query("q").unwrap_or_default().to_string();
            Ok(Response::json(&json!({ "q": term }))?)
        }));
        router
    }

    #[test]
    fn test_blog_routes() {
        let (_dir, views) = views(&[("posts/show.niac.php", "<h1>{{ $slug }}</h1>")]);
        let router = blog();

        let home = router.handle(Request::get("/"), &views, None);
        assert_eq!((home.status(), home.body()), (200, "home"));

        let latest = router.handle(Request::get("/posts/latest/"), &views, None);
        assert_eq!(latest.body(), "latest");

        let post = router.handle(Request::get("/posts/hello-world"), &views, None);
        assert_eq!(post.body(), "<h1>hello-world</h1>");
        assert_eq!(post.header("content-type"), Some("text/html; charset=UTF-8"));

        let comment = router.handle(Request::get("/posts/7/comments/42"), &views, None);
        assert_eq!(comment.body(), "post 7 comment 42");

        let search = router.handle(Request::get("/search").with_query("q", "rust"), &views, None);
        assert_eq!(search.body(), r#"{"q":"rust"}"#);
        assert_eq!(search.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_placeholders_match_one_segment() {
        let router = blog();
        assert!(router.match_route(Method::Get, "/posts/a/b").is_none());
        assert!(router.match_route(Method::Get, "/posts").is_none());

        let (route, params) = router.match_route(Method::Get, "/posts/7/comments/42").unwrap();
        assert_eq!(route.route_name(), Some("comments.show"));
        assert_eq!(params["post"], "7");
        assert_eq!(params["comment"], "42");
    }

    #[test]
    fn test_named_route_url() {
        let router = blog();
        let route = router.named("comments.show").unwrap();
        let params: Params = [("post", "3"), ("comment", "9")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(route.url(&params), "/posts/3/comments/9");
        assert!(router.named("missing").is_none());
    }

    #[test]
    fn test_first_literal_registration_wins() {
        let mut router = Router::new();
        router.get("/about", text("first"));
        router.get("/about/", text("second"));

        let (_dir, views) = views(&[]);
        let response = router.handle(Request::get("/about"), &views, None);
        assert_eq!(response.body(), "first");
    }

    // =========================================================================
    // Middleware
    // =========================================================================

    fn token_check(ctx: &mut RequestContext<'_>, next: Next<'_>) -> Result<Response, RoutingError> {
        match ctx.request.header("x-api-token") {
            Some("secret") => next.run(ctx),
            _ => Err(HttpError::abort(419, "Token mismatch").into()),
        }
    }

    fn powered_by(ctx: &mut RequestContext<'_>, next: Next<'_>) -> Result<Response, RoutingError> {
        Ok(next.run(ctx)?.with_header("X-Powered-By", "maniac"))
    }

    #[test]
    fn test_middleware_wraps_group() {
        let mut router = Router::new();
        router.register_middleware("token", token_check);
        router.register_middleware("powered", powered_by);
        router.group(
            GroupAttributes::new().prefix("api").middleware("powered").middleware("token"),
            |api| {
                api.post("/items", Action::handler(|ctx| {
                    let name = ctx.request.input("name").unwrap_or("unnamed").to_string();
                    Ok(Response::text(format!("created {}", name)).with_status(201))
                }));
            },
        );

        let (_dir, views) = views(&[("errors/default.niac.php", "{{ $error['code'] }} {{ $error['message'] }}")]);

        let denied = router.handle(Request::post("/api/items"), &views, None);
        assert_eq!(denied.status(), 419);
        assert_eq!(denied.body(), "419 Token mismatch");
        assert_eq!(denied.header("x-powered-by"), None);

        let request = Request::post("/api/items")
            .with_header("X-Api-Token", "secret")
            .with_form("name", "lamp");
        let created = router.handle(request, &views, None);
        assert_eq!(created.status(), 201);
        assert_eq!(created.body(), "created lamp");
        assert_eq!(created.header("x-powered-by"), Some("maniac"));
    }

    // =========================================================================
    // Error pages
    // =========================================================================

    #[test]
    fn test_error_views_by_status() {
        let (_dir, views) = views(&[
            ("errors/404.niac.php", "Nothing at all"),
            ("errors/default.niac.php", "Oops {{ $error['code'] }}"),
        ]);
        let mut router = Router::new();
        router.get("/users/{id}", Action::handler(|ctx| {
            let id: i64 = ctx.param_as("id")?;
            Err(ModelError::NotFound {
                model: "users".to_string(),
                id: id.to_string(),
            }
            .into())
        }));
        router.get("/report", Action::handler(|ctx| {
            ctx.db()?;
            Ok(Response::text("unreachable"))
        }));

        let missing_route = router.handle(Request::get("/nope"), &views, None);
        assert_eq!((missing_route.status(), missing_route.body()), (404, "Nothing at all"));

        let missing_model = router.handle(Request::get("/users/7"), &views, None);
        assert_eq!(missing_model.status(), 404);

        let bad_param = router.handle(Request::get("/users/seven"), &views, None);
        assert_eq!(bad_param.status(), 404);

        let no_db = router.handle(Request::get("/report"), &views, None);
        assert_eq!((no_db.status(), no_db.body()), (500, "Oops 500"));
    }

    #[test]
    fn test_broken_error_view_falls_back_to_static_page() {
        let (_dir, views) = views(&[("errors/404.niac.php", "{{ $error['code'] / 0 }}")]);
        let router = Router::new();
        let response = router.handle(Request::get("/nope"), &views, None);
        assert_eq!(response.status(), 404);
        assert!(response.body().starts_with("<!DOCTYPE html>"));
        assert!(response.body().contains("<h1>404 Page Not Found</h1>"));
    }

    #[test]
    fn test_dispatch_returns_raw_errors() {
        let (_dir, views) = views(&[]);
        let mut router = Router::new();
        router.delete("/posts/{id}", Action::controller("posts", "destroy"));

        let mut ctx = RequestContext::new(
            Request::post("/posts/1").with_form("_method", "DELETE"),
            &views,
            None,
        );
        let err = router.dispatch(&mut ctx).unwrap_err();
        assert!(matches!(err, RoutingError::UnknownController(ref name) if name == "posts"));
        assert_eq!(err.status(), 500);
        assert_eq!(ctx.param("id"), Some("1"));
    }
}
