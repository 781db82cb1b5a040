//! Template compilation: source text to a serializable [`CompiledView`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::error;

use super::ast::Node;
use super::parser::{parse_template, TemplateError};
use super::{ViewError, ViewResult};

/// A compiled template, stored as JSON in the view cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledView {
    pub name: String,
    pub path: PathBuf,
    /// Layout rendered after this view, from `@extends`.
    pub layout: Option<String>,
    pub nodes: Vec<Node>,
}

/// Compile `source`, checking that the layout it extends exists.
pub fn compile(
    name: &str,
    path: &Path,
    source: &str,
    layout_exists: impl Fn(&str) -> bool,
) -> ViewResult<CompiledView> {
    let template = parse_template(source).map_err(|err| {
        let err = match err {
            TemplateError::Syntax { message, span } => ViewError::Syntax {
                view: name.to_string(),
                path: path.to_path_buf(),
                span,
                message,
            },
            TemplateError::MismatchedSection { directive, span } => ViewError::MismatchedSection {
                view: name.to_string(),
                path: path.to_path_buf(),
                directive,
                span,
            },
        };
        error!(view = %name, path = %path.display(), error = %err, "View compilation failed");
        err
    })?;

    if let Some(layout) = &template.extends {
        if !layout_exists(layout) {
            return Err(ViewError::LayoutNotFound {
                view: name.to_string(),
                layout: layout.clone(),
            });
        }
    }

    Ok(CompiledView {
        name: name.to_string(),
        path: path.to_path_buf(),
        layout: template.extends,
        nodes: template.nodes,
    })
}

/// Serialize a compiled view, then decode it again to make sure the cached
/// artifact loads before it is written.
pub fn lint(view: &CompiledView) -> ViewResult<String> {
    let compile_error = |e: serde_json::Error| {
        error!(view = %view.name, error = %e, "Compiled view failed lint");
        ViewError::Compile {
            view: view.name.clone(),
            message: e.to_string(),
        }
    };

    let json = serde_json::to_string(view).map_err(compile_error)?;
    let decoded: CompiledView = serde_json::from_str(&json).map_err(compile_error)?;
    if &decoded != view {
        return Err(ViewError::Compile {
            view: view.name.clone(),
            message: "compiled view does not round-trip through the cache format".to_string(),
        });
    }
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_records_layout() {
        let view = compile("home", Path::new("home.niac.php"), "@extends('app')\nHi", |l| {
            l == "app"
        })
        .unwrap();
        assert_eq!(view.layout.as_deref(), Some("app"));
        assert_eq!(view.nodes, vec![Node::Text { text: "Hi".into() }]);
    }

    #[test]
    fn test_compile_missing_layout() {
        let err = compile("home", Path::new("home.niac.php"), "@extends('missing.layout')", |_| {
            false
        })
        .unwrap_err();
        assert!(matches!(err, ViewError::LayoutNotFound { layout, .. } if layout == "missing.layout"));
    }

    #[test]
    fn test_compile_syntax_error_carries_location() {
        let err = compile("home", Path::new("views/home.niac.php"), "@if($a)", |_| true).unwrap_err();
        let ViewError::Syntax { view, path, span, .. } = err else {
            panic!("expected syntax error");
        };
        assert_eq!(view, "home");
        assert_eq!(path, PathBuf::from("views/home.niac.php"));
        assert_eq!(span, 0..7);
    }

    #[test]
    fn test_lint_round_trip() {
        let view = compile("v", Path::new("v.niac.php"), "@foreach($xs as $k => $x){{ $k . $x }}@endforeach", |_| true).unwrap();
        let json = lint(&view).unwrap();
        let decoded: CompiledView = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, view);
    }
}
