use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::http::{Method, Response};

use super::{RequestContext, RoutingResult};

/// Route parameters by placeholder name.
pub type Params = BTreeMap<String, String>;

pub type Handler = Arc<dyn Fn(&mut RequestContext<'_>) -> RoutingResult<Response> + Send + Sync>;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex")
});

/// What a route runs.
#[derive(Clone)]
pub enum Action {
    Handler(Handler),
    Controller { controller: String, action: String },
}

impl Action {
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&mut RequestContext<'_>) -> RoutingResult<Response> + Send + Sync + 'static,
    {
        Action::Handler(Arc::new(f))
    }

    pub fn controller(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Action::Controller {
            controller: controller.into(),
            action: action.into(),
        }
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Handler(_) => f.write_str("Handler(..)"),
            Action::Controller { controller, action } => {
                write!(f, "Controller({}@{})", controller, action)
            }
        }
    }
}

/// A compiled `{name}` pattern.
#[derive(Debug, Clone)]
struct Pattern {
    regex: Regex,
    names: Vec<String>,
}

impl Pattern {
    /// `None` for URIs without placeholders.
    fn compile(uri: &str) -> Option<Self> {
        let mut pattern = String::from("^");
        let mut names = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(uri) {
            let whole = caps.get(0)?;
            pattern.push_str(&regex::escape(&uri[last..whole.start()]));
            pattern.push_str("([^/]+)");
            names.push(caps[1].to_string());
            last = whole.end();
        }
        if names.is_empty() {
            return None;
        }
        pattern.push_str(&regex::escape(&uri[last..]));
        pattern.push('$');
        Regex::new(&pattern).ok().map(|regex| Self { regex, names })
    }

    fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .zip(caps.iter().skip(1))
                .filter_map(|(name, m)| m.map(|m| (name.clone(), m.as_str().to_string())))
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    uri: String,
    action: Action,
    middleware: Vec<String>,
    name: Option<String>,
    pattern: Option<Pattern>,
}

impl Route {
    pub(crate) fn new(method: Method, uri: String, action: Action, middleware: Vec<String>) -> Self {
        let pattern = Pattern::compile(&uri);
        Self {
            method,
            uri,
            action,
            middleware,
            name: None,
            pattern,
        }
    }

    /// Append a middleware by registered name.
    pub fn middleware(&mut self, name: impl Into<String>) -> &mut Self {
        self.middleware.push(name.into());
        self
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn middleware_names(&self) -> &[String] {
        &self.middleware
    }

    pub fn route_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_parameterized(&self) -> bool {
        self.pattern.is_some()
    }

    /// Parameters if this parameterized route matches `path`.
    pub(crate) fn captures(&self, path: &str) -> Option<Params> {
        self.pattern.as_ref()?.captures(path)
    }

    /// URL for this route with `params` substituted.
    pub fn url(&self, params: &Params) -> String {
        PLACEHOLDER
            .replace_all(&self.uri, |caps: &regex::Captures<'_>| {
                params.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}
