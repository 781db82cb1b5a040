//! View resolution, caching and rendering.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::config::Settings;

use super::ast::{Case, Node};
use super::cache::ViewCache;
use super::compiler::{self, CompiledView};
use super::escape::escape;
use super::expr::{
    is_truthy, loose_eq, to_display, Evaluator, Expr, ForHeader, ForeachHeader, Scope, Stmt,
};
use super::helpers::{DefaultHelpers, TemplateFunctions, ViewHelpers};
use super::{ViewError, ViewResult};

/// File extension of view sources.
pub const VIEW_EXTENSION: &str = ".niac.php";

/// Include/component/layout nesting limit.
const MAX_DEPTH: usize = 64;

/// Iteration limit for `@for` and `@while`.
const MAX_LOOP_ITERATIONS: usize = 100_000;

/// Page metadata set by `@title` and `@meta`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub meta: Vec<(String, String)>,
}

impl Metadata {
    fn set_meta(&mut self, name: String, content: String) {
        match self.meta.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = content,
            None => self.meta.push((name, content)),
        }
    }

    /// `<meta>` tags, one per line.
    pub fn tags(&self) -> String {
        self.meta
            .iter()
            .map(|(name, content)| {
                format!(
                    r#"<meta name="{}" content="{}">"#,
                    escape(name),
                    escape(content)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// State shared by one top-level render and every view it pulls in.
#[derive(Default)]
struct RenderState {
    sections: HashMap<String, String>,
    metadata: Metadata,
    depth: usize,
    slot_frames: Vec<Vec<(String, String)>>,
}

/// The template engine.
///
/// Safe to share between threads; each [`render`](Self::render) call gets
/// fresh section and metadata state.
pub struct NiacEngine {
    paths: Vec<PathBuf>,
    namespaces: HashMap<String, Vec<PathBuf>>,
    cache: ViewCache,
    debug: bool,
    helpers: Arc<dyn ViewHelpers>,
    last_metadata: Mutex<Metadata>,
}

impl std::fmt::Debug for NiacEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NiacEngine")
            .field("paths", &self.paths)
            .field("namespaces", &self.namespaces)
            .field("cache", &self.cache)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl NiacEngine {
    /// Create an engine over `paths`, compiling into `cache_dir`.
    pub fn new(paths: Vec<PathBuf>, cache_dir: impl Into<PathBuf>) -> ViewResult<Self> {
        Ok(Self {
            paths,
            namespaces: HashMap::new(),
            cache: ViewCache::open(cache_dir)?,
            debug: false,
            helpers: Arc::new(DefaultHelpers::new(&Settings::default())),
            last_metadata: Mutex::default(),
        })
    }

    /// Engine configured from `[view]` and `[app]` settings, with the
    /// `mail` namespace registered.
    pub fn from_settings(settings: &Settings) -> ViewResult<Self> {
        Ok(Self::new(
            settings.view.paths.clone(),
            settings.view.cache_path.clone(),
        )?
        .with_namespace("mail", settings.view.mail_paths.clone())
        .with_debug(settings.app.debug)
        .with_helpers(Arc::new(DefaultHelpers::new(settings))))
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_helpers(mut self, helpers: Arc<dyn ViewHelpers>) -> Self {
        self.helpers = helpers;
        self
    }

    /// Register roots for `namespace::view` names.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        self.namespaces.insert(namespace.into(), paths);
        self
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn cache(&self) -> &ViewCache {
        &self.cache
    }

    pub fn helpers(&self) -> &dyn ViewHelpers {
        self.helpers.as_ref()
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Candidate files for `name`, in search order, with their cache keys.
    fn candidates(&self, name: &str) -> Vec<(PathBuf, String)> {
        let (namespace, view) = match name.split_once("::") {
            Some((namespace, view)) => (Some(namespace), view),
            None => (None, name),
        };
        let relative = format!("{}{}", view.replace('.', "/"), VIEW_EXTENSION);

        let mut candidates = Vec::new();
        let relative = match namespace {
            Some(namespace) => {
                for root in self.namespaces.get(namespace).into_iter().flatten() {
                    candidates.push((root.join(&relative), format!("{}::{}", namespace, relative)));
                }
                format!("{}/{}", namespace, relative)
            }
            None => relative,
        };
        for root in &self.paths {
            candidates.push((root.join(&relative), relative.clone()));
        }
        candidates
    }

    /// Locate a view's source file and cache key.
    pub fn find(&self, name: &str) -> ViewResult<(PathBuf, String)> {
        self.candidates(name)
            .into_iter()
            .find(|(path, _)| path.is_file())
            .ok_or_else(|| ViewError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.find(name).is_ok()
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    fn compile_source(&self, name: &str, path: &Path) -> ViewResult<(CompiledView, String)> {
        let source = fs::read_to_string(path).map_err(|source| ViewError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let view = compiler::compile(name, path, &source, |layout| self.exists(layout))?;
        let json = compiler::lint(&view)?;
        debug!(view = %name, path = %path.display(), "Compiled view");
        Ok((view, json))
    }

    /// Load a view from the cache, recompiling when stale or in debug mode.
    fn load(&self, name: &str) -> ViewResult<CompiledView> {
        let (path, key) = self.find(name)?;
        let cached = self.cache.path_for(&key);

        if !self.debug && !self.cache.is_stale(&path, &cached) {
            if let Some(view) = self.cache.load(&cached) {
                return Ok(view);
            }
        }

        let (view, json) = self.compile_source(name, &path)?;
        if let Err(e) = self.cache.store(&cached, &json) {
            warn!(view = %name, error = %e, "Could not cache compiled view");
        }
        Ok(view)
    }

    /// Compile a view into the cache unconditionally and return the cache file.
    pub fn compile(&self, name: &str) -> ViewResult<PathBuf> {
        let (path, key) = self.find(name)?;
        let cached = self.cache.path_for(&key);
        let (_, json) = self.compile_source(name, &path)?;
        self.cache.store(&cached, &json)?;
        Ok(cached)
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Render a view with `data`, which must be a JSON object or null.
    pub fn render(&self, name: &str, data: &Value) -> ViewResult<String> {
        let scope = match data {
            Value::Object(map) => map.clone(),
            Value::Null => Scope::new(),
            other => {
                return Err(ViewError::Render {
                    view: name.to_string(),
                    message: format!("view data must be an object, got {}", other),
                })
            }
        };

        let mut state = RenderState::default();
        let html = self.render_view(name, scope, &mut state)?;
        if let Ok(mut last) = self.last_metadata.lock() {
            *last = state.metadata;
        }
        Ok(html)
    }

    /// Render, and outside debug mode replace a failure with an error page.
    ///
    /// Tries `errors.500`, then `errors.default`, then plain text.
    pub fn render_or_fallback(&self, name: &str, data: &Value) -> ViewResult<String> {
        match self.render(name, data) {
            Ok(html) => Ok(html),
            Err(err) if self.debug => Err(err),
            Err(err) => {
                error!(view = %name, error = %err, "View rendering failed");
                let data = json!({
                    "error": {"code": 500, "message": "Internal Server Error"},
                });
                Ok(self
                    .render_error_view(500, &data)
                    .unwrap_or_else(|| "500 Internal Server Error".to_string()))
            }
        }
    }

    /// Render `errors.{code}` or `errors.default`; `None` when neither renders.
    pub fn render_error_view(&self, code: u16, data: &Value) -> Option<String> {
        for name in [format!("errors.{}", code), "errors.default".to_string()] {
            match self.render(&name, data) {
                Ok(html) => return Some(html),
                Err(err) if err.is_not_found() => continue,
                Err(err) => {
                    error!(view = %name, error = %err, "Error view failed to render");
                }
            }
        }
        None
    }

    /// Metadata from the most recent render.
    pub fn metadata(&self) -> Metadata {
        self.last_metadata
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Title from the most recent render, or `default`.
    pub fn title(&self, default: &str) -> String {
        self.metadata()
            .title
            .unwrap_or_else(|| default.to_string())
    }

    /// `<meta>` tags from the most recent render.
    pub fn meta_tags(&self) -> String {
        self.metadata().tags()
    }

    fn render_view(&self, name: &str, scope: Scope, state: &mut RenderState) -> ViewResult<String> {
        if state.depth >= MAX_DEPTH {
            return Err(ViewError::Render {
                view: name.to_string(),
                message: format!("views nested deeper than {} levels", MAX_DEPTH),
            });
        }
        let view = self.load(name)?;

        state.depth += 1;
        let mut scope = scope;
        let result = self.render_compiled(&view, &mut scope, state);
        state.depth -= 1;
        result
    }

    fn render_compiled(
        &self,
        view: &CompiledView,
        scope: &mut Scope,
        state: &mut RenderState,
    ) -> ViewResult<String> {
        let functions = TemplateFunctions {
            helpers: self.helpers.as_ref(),
        };
        let mut out = String::new();
        Renderer {
            engine: self,
            view: &view.name,
            evaluator: Evaluator::new(&functions),
            state: &mut *state,
        }
        .nodes(&view.nodes, scope, &mut out)?;

        // The layout sees the child's sections and final variables.
        if let Some(layout) = &view.layout {
            let title = state.metadata.title.clone().map_or(Value::Null, Value::String);
            let meta = state
                .metadata
                .meta
                .iter()
                .map(|(name, content)| (name.clone(), Value::String(content.clone())))
                .collect();
            scope.insert("__title".to_string(), title);
            scope.insert("__meta".to_string(), Value::Object(meta));
            out.push_str(&self.render_view(layout, scope.clone(), state)?);
        }
        Ok(out)
    }
}

// ============================================================================
// Tree walker
// ============================================================================

enum Flow {
    Normal,
    Break,
    Continue,
}

struct Renderer<'a> {
    engine: &'a NiacEngine,
    view: &'a str,
    evaluator: Evaluator<'a>,
    state: &'a mut RenderState,
}

impl Renderer<'_> {
    fn fail(&self, message: impl Into<String>) -> ViewError {
        ViewError::Render {
            view: self.view.to_string(),
            message: message.into(),
        }
    }

    fn eval(&self, expr: &Expr, scope: &Scope) -> ViewResult<Value> {
        self.evaluator.eval(expr, scope).map_err(|m| self.fail(m))
    }

    fn display(&self, expr: &Expr, scope: &Scope) -> ViewResult<String> {
        Ok(to_display(&self.eval(expr, scope)?))
    }

    fn exec(&self, statements: &[Stmt], scope: &mut Scope) -> ViewResult<()> {
        for stmt in statements {
            self.evaluator
                .exec(stmt, scope)
                .map_err(|m| self.fail(m))?;
        }
        Ok(())
    }

    fn holds(&self, condition: &Option<Expr>, scope: &Scope) -> ViewResult<bool> {
        match condition {
            Some(condition) => Ok(is_truthy(&self.eval(condition, scope)?)),
            None => Ok(true),
        }
    }

    /// Render `nodes` into a buffer. A `@break`/`@continue` inside still
    /// reaches the enclosing loop.
    fn capture(&mut self, nodes: &[Node], scope: &mut Scope) -> ViewResult<(String, Flow)> {
        let mut buffer = String::new();
        let flow = self.nodes(nodes, scope, &mut buffer)?;
        Ok((buffer, flow))
    }

    /// Scope for an included view: the caller's variables plus `data`.
    fn child_scope(&self, data: &Option<Expr>, scope: &Scope) -> ViewResult<Scope> {
        let mut child = scope.clone();
        if let Some(data) = data {
            match self.eval(data, scope)? {
                Value::Object(map) => child.extend(map),
                Value::Null => {}
                other => {
                    return Err(self.fail(format!(
                        "view data must be an array with string keys, got {}",
                        other
                    )))
                }
            }
        }
        Ok(child)
    }

    fn nodes(&mut self, nodes: &[Node], scope: &mut Scope, out: &mut String) -> ViewResult<Flow> {
        for node in nodes {
            match self.node(node, scope, out)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn node(&mut self, node: &Node, scope: &mut Scope, out: &mut String) -> ViewResult<Flow> {
        match node {
            Node::Text { text } => out.push_str(text),
            Node::Echo { expr, escape: true } => out.push_str(&escape(&self.display(expr, scope)?)),
            Node::Echo { expr, escape: false } => out.push_str(&self.display(expr, scope)?),
            Node::If {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    if is_truthy(&self.eval(&branch.condition, scope)?) {
                        return self.nodes(&branch.body, scope, out);
                    }
                }
                if let Some(otherwise) = otherwise {
                    return self.nodes(otherwise, scope, out);
                }
            }
            Node::Foreach {
                header,
                body,
                empty,
            } => return self.foreach(header, body, empty.as_deref(), scope, out),
            Node::For { header, body } => return self.for_loop(header, body, scope, out),
            Node::While { condition, body } => {
                let mut iterations = 0;
                while is_truthy(&self.eval(condition, scope)?) {
                    iterations += 1;
                    if iterations > MAX_LOOP_ITERATIONS {
                        return Err(self.fail("@while exceeded the iteration limit"));
                    }
                    if let Flow::Break = self.nodes(body, scope, out)? {
                        break;
                    }
                }
            }
            Node::Switch { subject, cases } => return self.switch(subject, cases, scope, out),
            Node::Break { condition } => {
                if self.holds(condition, scope)? {
                    return Ok(Flow::Break);
                }
            }
            Node::Continue { condition } => {
                if self.holds(condition, scope)? {
                    return Ok(Flow::Continue);
                }
            }
            Node::Php { statements } => self.exec(statements, scope)?,
            Node::Include { view, data } => {
                let name = self.display(view, scope)?;
                let child = self.child_scope(data, scope)?;
                out.push_str(&self.engine.render_view(&name, child, self.state)?);
            }
            Node::Component { view, data, body } => {
                let name = self.display(view, scope)?;
                self.state.slot_frames.push(Vec::new());
                let captured = self.capture(body, scope);
                let slots = self.state.slot_frames.pop().unwrap_or_default();
                let (slot, flow) = captured?;
                if !matches!(flow, Flow::Normal) {
                    return Ok(flow);
                }

                let mut child = self.child_scope(data, scope)?;
                for (slot_name, html) in slots {
                    child.insert(slot_name, Value::String(html));
                }
                child.insert("slot".to_string(), Value::String(slot));
                out.push_str(&self.engine.render_view(&name, child, self.state)?);
            }
            Node::Slot { name, body } => {
                let (html, flow) = self.capture(body, scope)?;
                if let Some(frame) = self.state.slot_frames.last_mut() {
                    frame.push((name.clone(), html));
                }
                return Ok(flow);
            }
            Node::Yield { section, default } => {
                match self.state.sections.get(section).cloned() {
                    Some(html) => out.push_str(&html),
                    None => {
                        if let Some(default) = default {
                            out.push_str(&self.display(default, scope)?);
                        }
                    }
                }
            }
            Node::Section { name, body } => {
                let (html, flow) = self.capture(body, scope)?;
                self.state.sections.insert(name.clone(), html);
                return Ok(flow);
            }
            Node::Csrf => out.push_str(&self.engine.helpers.csrf_field()),
            Node::Method { method } => out.push_str(&format!(
                r#"<input type="hidden" name="_method" value="{}">"#,
                method
            )),
            Node::Asset { path } => {
                let path = self.display(path, scope)?;
                out.push_str(&escape(&self.engine.helpers.asset(&path)));
            }
            Node::Title { value } => {
                let title = self.display(value, scope)?;
                self.state.metadata.title = Some(title);
            }
            Node::Meta { name, content } => {
                let name = self.display(name, scope)?;
                let content = self.display(content, scope)?;
                self.state.metadata.set_meta(name, content);
            }
        }
        Ok(Flow::Normal)
    }

    fn foreach(
        &mut self,
        header: &ForeachHeader,
        body: &[Node],
        empty: Option<&[Node]>,
        scope: &mut Scope,
        out: &mut String,
    ) -> ViewResult<Flow> {
        let items: Vec<(Value, Value)> = match self.eval(&header.source, scope)? {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Value::from(i), v))
                .collect(),
            Value::Object(map) => map.into_iter().map(|(k, v)| (Value::String(k), v)).collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(self.fail(format!(
                    "foreach() argument must be of type array, {} given",
                    other
                )))
            }
        };

        if items.is_empty() {
            if let Some(empty) = empty {
                return self.nodes(empty, scope, out);
            }
            return Ok(Flow::Normal);
        }

        let outer_loop = scope.remove("loop");
        let count = items.len();
        for (index, (key, value)) in items.into_iter().enumerate() {
            scope.insert(
                "loop".to_string(),
                json!({
                    "index": index,
                    "iteration": index + 1,
                    "count": count,
                    "first": index == 0,
                    "last": index + 1 == count,
                    "remaining": count - index - 1,
                }),
            );
            if let Some(key_var) = &header.key {
                scope.insert(key_var.clone(), key);
            }
            scope.insert(header.value.clone(), value);
            if let Flow::Break = self.nodes(body, scope, out)? {
                break;
            }
        }
        match outer_loop {
            Some(outer) => {
                scope.insert("loop".to_string(), outer);
            }
            None => {
                scope.remove("loop");
            }
        }
        Ok(Flow::Normal)
    }

    fn for_loop(
        &mut self,
        header: &ForHeader,
        body: &[Node],
        scope: &mut Scope,
        out: &mut String,
    ) -> ViewResult<Flow> {
        self.exec(&header.init, scope)?;
        let mut iterations = 0;
        loop {
            if let Some(condition) = &header.condition {
                if !is_truthy(&self.eval(condition, scope)?) {
                    break;
                }
            }
            iterations += 1;
            if iterations > MAX_LOOP_ITERATIONS {
                return Err(self.fail("@for exceeded the iteration limit"));
            }
            if let Flow::Break = self.nodes(body, scope, out)? {
                break;
            }
            self.exec(&header.step, scope)?;
        }
        Ok(Flow::Normal)
    }

    fn switch(
        &mut self,
        subject: &Expr,
        cases: &[Case],
        scope: &mut Scope,
        out: &mut String,
    ) -> ViewResult<Flow> {
        let subject = self.eval(subject, scope)?;

        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(value) = &case.value {
                if loose_eq(&subject, &self.eval(value, scope)?) {
                    start = Some(i);
                    break;
                }
            }
        }
        let Some(start) = start.or_else(|| cases.iter().position(|c| c.value.is_none())) else {
            return Ok(Flow::Normal);
        };

        // Fall through until @break.
        for case in &cases[start..] {
            match self.nodes(&case.body, scope, out)? {
                Flow::Normal => {}
                Flow::Break => return Ok(Flow::Normal),
                Flow::Continue => return Ok(Flow::Continue),
            }
        }
        Ok(Flow::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine(files: &[(&str, &str)]) -> (TempDir, NiacEngine) {
        let dir = tempfile::tempdir().unwrap();
        let views = dir.path().join("views");
        for (name, source) in files {
            let path = views.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, source).unwrap();
        }
        let engine = NiacEngine::new(vec![views], dir.path().join("cache")).unwrap();
        (dir, engine)
    }

    #[test]
    fn test_resolve_dotted_and_namespaced_names() {
        let (dir, engine) = engine(&[
            ("pages/home.niac.php", "home"),
            ("mail/welcome.niac.php", "fallback"),
        ]);
        assert!(engine.exists("pages.home"));
        assert_eq!(engine.render("mail::welcome", &Value::Null).unwrap(), "fallback");

        let mail_root = dir.path().join("mail");
        fs::create_dir_all(&mail_root).unwrap();
        fs::write(mail_root.join("welcome.niac.php"), "namespaced").unwrap();
        let engine = engine.with_namespace("mail", vec![mail_root]);
        assert_eq!(engine.render("mail::welcome", &Value::Null).unwrap(), "namespaced");
    }

    #[test]
    fn test_render_rejects_non_object_data() {
        let (_dir, engine) = engine(&[("a.niac.php", "a")]);
        assert!(matches!(
            engine.render("a", &json!([1])),
            Err(ViewError::Render { .. })
        ));
    }

    #[test]
    fn test_loop_variable() {
        let (_dir, engine) = engine(&[(
            "list.niac.php",
            "@foreach($xs as $x){{ $loop->iteration }}/{{ $loop->count }}{{ $loop->last ? '.' : ',' }}@endforeach",
        )]);
        let html = engine.render("list", &json!({"xs": ["a", "b"]})).unwrap();
        assert_eq!(html, "1/2,2/2.");
    }

    #[test]
    fn test_switch_fallthrough() {
        let (_dir, engine) = engine(&[(
            "s.niac.php",
            "@switch($n) @case(1) one @case(2) two @break @default other @endswitch",
        )]);
        let one = engine.render("s", &json!({"n": 1})).unwrap();
        assert_eq!(one.split_whitespace().collect::<Vec<_>>(), ["one", "two"]);
        let other = engine.render("s", &json!({"n": 9})).unwrap();
        assert_eq!(other.trim(), "other");
    }

    #[test]
    fn test_loop_control_inside_captured_blocks() {
        let (_dir, engine) = engine(&[
            (
                "section.niac.php",
                "@foreach($xs as $x)@section('s'){{ $x }}@break @endsection{{ $x }}@endforeach|@yield('s')",
            ),
            (
                "slot.niac.php",
                "@foreach($xs as $x)@component('box')@slot('title')@continue($x == 2){{ $x }}@endslot@endcomponent@endforeach",
            ),
            ("box.niac.php", "[{!! $title !!}]"),
        ]);
        let data = json!({"xs": [1, 2, 3]});
        assert_eq!(engine.render("section", &data).unwrap(), "|1");
        assert_eq!(engine.render("slot", &data).unwrap(), "[1][3]");
    }

    #[test]
    fn test_yield_default_is_raw() {
        let (_dir, engine) = engine(&[("y.niac.php", "@yield('nav', '<a href=\"/\">Home</a>')")]);
        assert_eq!(engine.render("y", &Value::Null).unwrap(), "<a href=\"/\">Home</a>");
    }

    #[test]
    fn test_runaway_while_is_an_error() {
        let (_dir, engine) = engine(&[("w.niac.php", "@while(true)x@endwhile")]);
        assert!(matches!(
            engine.render("w", &Value::Null),
            Err(ViewError::Render { .. })
        ));
    }

    #[test]
    fn test_recursive_include_is_bounded() {
        let (_dir, engine) = engine(&[("r.niac.php", "@include('r')")]);
        assert!(matches!(
            engine.render("r", &Value::Null),
            Err(ViewError::Render { .. })
        ));
    }
}
