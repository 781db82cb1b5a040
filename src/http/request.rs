use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use super::{HttpResult, Method};

/// An incoming request.
///
/// A POST form carrying `_method=PUT|PATCH|DELETE` is treated as that
/// method by [`method`](Self::method).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    query: BTreeMap<String, String>,
    form: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: String,
}

impl Request {
    /// A request for `path`; anything after `?` is dropped, use
    /// [`with_query`](Self::with_query) for decoded parameters.
    pub fn new(method: Method, path: &str) -> Self {
        let path = path.split('?').next().unwrap_or_default();
        Self {
            method,
            path: normalize_path(path),
            ..Self::default()
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::Post, path)
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(key.into(), value.into());
        self
    }

    /// Header names are case-insensitive.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Effective method, after `_method` spoofing.
    pub fn method(&self) -> Method {
        if self.method == Method::Post {
            let spoofed = self.form.get("_method").and_then(|m| m.parse().ok());
            if let Some(method @ (Method::Put | Method::Patch | Method::Delete)) = spoofed {
                return method;
            }
        }
        self.method
    }

    /// Method as received on the wire.
    pub fn real_method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// A form field, falling back to the query string.
    pub fn input(&self, key: &str) -> Option<&str> {
        self.form
            .get(key)
            .or_else(|| self.query.get(key))
            .map(String::as_str)
    }

    /// Query and form input merged; form fields win.
    pub fn all(&self) -> BTreeMap<String, String> {
        let mut all = self.query.clone();
        all.extend(self.form.iter().map(|(k, v)| (k.clone(), v.clone())));
        all
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> HttpResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Leading slash, no trailing slash except for the root.
pub(crate) fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}
