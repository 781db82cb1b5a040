#[cfg(test)]
mod tests {
    use std::fs;

    use maniac::view::{NiacEngine, ViewError};
    use serde_json::{json, Value};
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

    const APP_LAYOUT: &str = "<html><head><title>{{ $__title ?? 'Site' }}</title></head>\n\
<body>@yield('content')</body>\n\
<footer>@yield('footer', 'Default & footer')</footer></html>";

    const ABOUT: &str = "@extends('layouts.app')\n\
@title('About ' . $name)\n\
@meta('description', 'About page')\n\
@section('content')\n\
<p>{{ $name }}</p>\n\
@endsection\n";

    #[test]
    fn test_section_then_yield_in_one_view() {
        let (_dir, engine) = engine(&[("x.niac.php", "@section('x')A@endsection @yield('x')")]);
        let html = engine.render("x", &Value::Null).unwrap();
        assert_eq!(html.trim(), "A");
    }

    #[test]
    fn test_extends_fills_layout() {
        let (_dir, engine) = engine(&[
            ("layouts/app.niac.php", APP_LAYOUT),
            ("pages/about.niac.php", ABOUT),
        ]);
        let html = engine.render("pages.about", &json!({"name": "Ada"})).unwrap();
        insta::assert_snapshot!(html, @r###"
        <html><head><title>About Ada</title></head>
        <body><p>Ada</p>
        </body>
        <footer>Default & footer</footer></html>
        "###);
    }

    #[test]
    fn test_title_and_meta_are_recorded() {
        let (_dir, engine) = engine(&[
            ("layouts/app.niac.php", APP_LAYOUT),
            ("pages/about.niac.php", ABOUT),
            ("plain.niac.php", "no metadata"),
        ]);
        engine.render("pages.about", &json!({"name": "Ada"})).unwrap();
        assert_eq!(engine.title("Site"), "About Ada");
        assert_eq!(
            engine.meta_tags(),
            r#"<meta name="description" content="About page">"#
        );

        engine.render("plain", &Value::Null).unwrap();
        assert_eq!(engine.title("Site"), "Site");
        assert_eq!(engine.meta_tags(), "");
    }

    #[test]
    fn test_layout_sees_meta() {
        let (_dir, engine) = engine(&[
            ("layout.niac.php", "{{ $__meta['robots'] ?? 'index' }}|@yield('body')"),
            (
                "page.niac.php",
                "@extends('layout')\n@meta('robots', 'noindex')\n@meta('robots', 'none')\n@section('body', $text)\n",
            ),
        ]);
        let html = engine.render("page", &json!({"text": "<hi>"})).unwrap();
        assert_eq!(html, "none|&lt;hi&gt;");
    }

    #[test]
    fn test_nested_layouts() {
        let (_dir, engine) = engine(&[
            ("layouts/base.niac.php", "<body>@yield('body')</body>"),
            (
                "layouts/page.niac.php",
                "@extends('layouts.base')\n@section('body')<main>@yield('content')</main>@endsection\n",
            ),
            (
                "home.niac.php",
                "@extends('layouts.page')\n@section('content')home@endsection\n",
            ),
        ]);
        let html = engine.render("home", &Value::Null).unwrap();
        assert_eq!(html, "<body><main>home</main></body>");
    }

    #[test]
    fn test_last_section_wins() {
        let (_dir, engine) = engine(&[(
            "twice.niac.php",
            "@section('x')one@endsection@section('x')two@endsection@yield('x')",
        )]);
        assert_eq!(engine.render("twice", &Value::Null).unwrap(), "two");
    }

    #[test]
    fn test_missing_layout_is_not_found() {
        let (_dir, engine) = engine(&[(
            "orphan.niac.php",
            "@extends('layouts.missing')\n@section('content')x@endsection",
        )]);
        let err = engine.render("orphan", &Value::Null).unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(
            err,
            ViewError::LayoutNotFound { ref layout, .. } if layout == "layouts.missing"
        ));
    }

    #[test]
    fn test_mismatched_sections() {
        let (_dir, engine) = engine(&[
            ("stray.niac.php", "text\n@endsection"),
            ("open.niac.php", "@section('content')\nnever closed"),
        ]);
        for name in ["stray", "open"] {
            let err = engine.render(name, &Value::Null).unwrap_err();
            assert!(
                matches!(err, ViewError::MismatchedSection { .. }),
                "{name}: {err}"
            );
        }
    }

    // =========================================================================
    // Fallbacks
    // =========================================================================

    #[test]
    fn test_render_or_fallback_uses_error_views() {
        let (_dir, engine) = engine(&[
            ("broken.niac.php", "{{ 1 / 0 }}"),
            ("errors/default.niac.php", "Error {{ $error['code'] }}: {{ $error['message'] }}"),
        ]);
        let html = engine.render_or_fallback("broken", &Value::Null).unwrap();
        assert_eq!(html, "Error 500: Internal Server Error");
    }

    #[test]
    fn test_render_or_fallback_ends_in_plain_text() {
        let (_dir, engine) = engine(&[
            ("broken.niac.php", "{{ 1 / 0 }}"),
            ("errors/500.niac.php", "@if(true)"),
        ]);
        let html = engine.render_or_fallback("broken", &Value::Null).unwrap();
        assert_eq!(html, "500 Internal Server Error");
    }

    #[test]
    fn test_debug_mode_propagates_render_errors() {
        let (_dir, engine) = engine(&[("broken.niac.php", "{{ 1 / 0 }}")]);
        let engine = engine.with_debug(true);
        let err = engine.render_or_fallback("broken", &Value::Null).unwrap_err();
        assert!(err.to_string().contains("Division by zero"));
    }
}
