//! Functions available to templates.

use serde_json::Value;

use crate::config::Settings;

use super::escape::escape;
use super::expr::{is_truthy, to_display, Functions};

/// Application hooks used by `@csrf`, `@asset` and template functions.
pub trait ViewHelpers: Send + Sync {
    fn csrf_token(&self) -> String;

    fn csrf_field(&self) -> String {
        format!(
            r#"<input type="hidden" name="_token" value="{}">"#,
            escape(&self.csrf_token())
        )
    }

    fn asset(&self, path: &str) -> String;

    fn url(&self, path: &str) -> String;

    fn config(&self, key: &str) -> Option<Value>;

    /// Extra template functions; `None` when `name` is not one of them.
    fn call(&self, name: &str, args: &[Value]) -> Option<Result<Value, String>> {
        let _ = (name, args);
        None
    }
}

/// Helpers backed by [`Settings`].
#[derive(Debug, Clone)]
pub struct DefaultHelpers {
    settings: Settings,
    csrf_token: String,
}

impl DefaultHelpers {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.clone(),
            csrf_token: String::new(),
        }
    }

    #[must_use]
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = token.into();
        self
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

impl ViewHelpers for DefaultHelpers {
    fn csrf_token(&self) -> String {
        self.csrf_token.clone()
    }

    fn asset(&self, path: &str) -> String {
        let base = self
            .settings
            .app
            .asset_url
            .as_deref()
            .unwrap_or(&self.settings.app.url);
        join_url(base, path)
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.settings.app.url, path)
    }

    fn config(&self, key: &str) -> Option<Value> {
        self.settings.lookup(key)
    }
}

/// Builtin functions plus the helper functions, as seen by the evaluator.
pub(crate) struct TemplateFunctions<'a> {
    pub helpers: &'a dyn ViewHelpers,
}

fn arg<'v>(name: &str, args: &'v [Value], index: usize) -> Result<&'v Value, String> {
    args.get(index).ok_or_else(|| {
        format!(
            "{}() expects at least {} argument{}",
            name,
            index + 1,
            if index == 0 { "" } else { "s" }
        )
    })
}

fn text(name: &str, args: &[Value], index: usize) -> Result<String, String> {
    arg(name, args, index).map(to_display)
}

impl Functions for TemplateFunctions<'_> {
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, String> {
        let value = match name {
            "isset" => Value::Bool(!args.is_empty() && args.iter().all(|a| !a.is_null())),
            "empty" => Value::Bool(args.first().map_or(true, |a| !is_truthy(a))),
            "count" => match arg(name, args, 0)? {
                Value::Array(items) => Value::from(items.len()),
                Value::Object(map) => Value::from(map.len()),
                other => {
                    return Err(format!(
                        "count(): Argument #1 must be of type Countable|array, {} given",
                        to_display(other)
                    ))
                }
            },
            "strtoupper" => Value::String(text(name, args, 0)?.to_uppercase()),
            "strtolower" => Value::String(text(name, args, 0)?.to_lowercase()),
            "ucfirst" => {
                let s = text(name, args, 0)?;
                let mut chars = s.chars();
                Value::String(match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                })
            }
            "trim" => Value::String(text(name, args, 0)?.trim().to_string()),
            "implode" => {
                let glue = text(name, args, 0)?;
                let parts: Vec<String> = match arg(name, args, 1)? {
                    Value::Array(items) => items.iter().map(to_display).collect(),
                    Value::Object(map) => map.values().map(to_display).collect(),
                    _ => return Err("implode(): Argument #2 must be of type array".to_string()),
                };
                Value::String(parts.join(&glue))
            }
            "json_encode" => Value::String(
                serde_json::to_string(arg(name, args, 0)?).map_err(|e| e.to_string())?,
            ),
            "e" => Value::String(escape(&text(name, args, 0)?)),
            "csrf_token" => Value::String(self.helpers.csrf_token()),
            "csrf_field" => Value::String(self.helpers.csrf_field()),
            "asset" => Value::String(self.helpers.asset(&text(name, args, 0)?)),
            "url" => Value::String(self.helpers.url(&text(name, args, 0).unwrap_or_default())),
            "config" => {
                let key = text(name, args, 0)?;
                self.helpers
                    .config(&key)
                    .or_else(|| args.get(1).cloned())
                    .unwrap_or(Value::Null)
            }
            other => {
                return self
                    .helpers
                    .call(other, args)
                    .unwrap_or_else(|| Err(format!("Call to undefined function {}()", other)))
            }
        };
        Ok(value)
    }
}
