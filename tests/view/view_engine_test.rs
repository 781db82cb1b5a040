#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    use maniac::config::Settings;
    use maniac::view::{NiacEngine, ViewError};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn write_views(root: &Path, files: &[(&str, &str)]) {
        for (name, source) in files {
            let path = root.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, source).unwrap();
        }
    }

    fn engine(files: &[(&str, &str)]) -> (TempDir, NiacEngine) {
        let dir = tempfile::tempdir().unwrap();
        write_views(&dir.path().join("views"), files);
        let engine = views_in(&dir);
        (dir, engine)
    }

    fn views_in(dir: &TempDir) -> NiacEngine {
        NiacEngine::new(vec![dir.path().join("views")], dir.path().join("cache")).unwrap()
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    const HOME: &str = "<h1>{{ $title }}</h1>\n@foreach($items as $item)\n<li>{{ $loop->iteration }}. {{ $item }}</li>\n@endforeach\n";

    // =========================================================================
    // Cache
    // =========================================================================

    #[test]
    fn test_cached_render_matches_fresh_compile() {
        let (dir, engine) = engine(&[("home.niac.php", HOME)]);
        let data = json!({"title": "Tom & Jerry", "items": ["a", "b"]});

        let first = engine.render("home", &data).unwrap();
        assert_eq!(first, "<h1>Tom &amp; Jerry</h1>\n<li>1. a</li>\n<li>2. b</li>\n");
        assert!(engine.cache().path_for("home.niac.php").is_file());

        let cached = engine.render("home", &data).unwrap();
        let fresh = views_in(&dir).with_debug(true).render("home", &data).unwrap();
        assert_eq!(cached, first);
        assert_eq!(fresh, first);
    }

    #[test]
    fn test_cache_is_used_until_source_changes() {
        let (dir, engine) = engine(&[("home.niac.php", "original"), ("other.niac.php", "other")]);
        let home = dir.path().join("views/home.niac.php");
        set_mtime(&home, SystemTime::now() - Duration::from_secs(60));

        // Point home's cache entry at another view's compiled form.
        let other = engine.compile("other").unwrap();
        fs::copy(&other, engine.cache().path_for("home.niac.php")).unwrap();
        assert_eq!(engine.render("home", &Value::Null).unwrap(), "other");

        set_mtime(&home, SystemTime::now() + Duration::from_secs(60));
        assert_eq!(engine.render("home", &Value::Null).unwrap(), "original");
    }

    #[test]
    fn test_corrupt_cache_entry_is_recompiled() {
        let (dir, engine) = engine(&[("home.niac.php", "fine")]);
        set_mtime(
            &dir.path().join("views/home.niac.php"),
            SystemTime::now() - Duration::from_secs(60),
        );
        fs::write(engine.cache().path_for("home.niac.php"), "{not json").unwrap();
        assert_eq!(engine.render("home", &Value::Null).unwrap(), "fine");
    }

    #[test]
    fn test_compile_and_clear() {
        let (_dir, engine) = engine(&[("a.niac.php", "a"), ("b/c.niac.php", "c")]);
        let a = engine.compile("a").unwrap();
        let c = engine.compile("b.c").unwrap();
        assert_ne!(a, c);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("json"));

        let compiled: Value = serde_json::from_str(&fs::read_to_string(&c).unwrap()).unwrap();
        assert_eq!(compiled["name"], "b.c");

        assert_eq!(engine.cache().clear().unwrap(), 2);
        assert!(!a.exists());
    }

    #[test]
    fn test_compile_reports_syntax_errors() {
        let (_dir, engine) = engine(&[("broken.niac.php", "ok\n@if($a)\nnever closed\n")]);
        let err = engine.compile("broken").unwrap_err();
        match err {
            ViewError::Syntax { view, span, .. } => {
                assert_eq!(view, "broken");
                assert_eq!(span, 3..10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_view_is_not_found() {
        let (_dir, engine) = engine(&[]);
        let err = engine.render("nope.nothing", &Value::Null).unwrap_err();
        assert!(err.is_not_found());
    }

    // =========================================================================
    // Echoes and directives
    // =========================================================================

    #[test]
    fn test_echo_forms() {
        let (_dir, engine) = engine(&[(
            "echo.niac.php",
            "{{ $html }}|{!! $html !!}|@{{ $html }}|{{-- hidden --}}{--- also hidden ---}|me@example.com|@@if",
        )]);
        let html = engine.render("echo", &json!({"html": "<b>x</b>"})).unwrap();
        assert_eq!(
            html,
            "&lt;b&gt;x&lt;/b&gt;|<b>x</b>|{{ $html }}||me@example.com|@if"
        );
    }

    #[test]
    fn test_conditionals() {
        let (_dir, engine) = engine(&[
            (
                "grade.niac.php",
                "@if($n > 10)big@elseif($n > 5)medium@else{{ 'small' }}@endif",
            ),
            (
                "guards.niac.php",
                "@isset($name)hi {{ $name }};@endisset@empty($items)no items@endempty",
            ),
        ]);
        let grade = |n: i64| engine.render("grade", &json!({ "n": n })).unwrap();
        assert_eq!(grade(11), "big");
        assert_eq!(grade(6), "medium");
        assert_eq!(grade(1), "small");

        assert_eq!(
            engine.render("guards", &json!({"name": "Ada", "items": []})).unwrap(),
            "hi Ada;no items"
        );
        assert_eq!(
            engine.render("guards", &json!({"items": [1]})).unwrap(),
            ""
        );
    }

    #[test]
    fn test_loops() {
        let (_dir, engine) = engine(&[
            (
                "users.niac.php",
                "@forelse($users as $user){{ $user }},@empty<i>none</i>@endforelse",
            ),
            ("count.niac.php", "@for($i = 0; $i < 3; $i++){{ $i }}@endfor"),
            (
                "pairs.niac.php",
                "@foreach($map as $key => $value)@continue($key == 'skip'){{ $key }}={{ $value }};@endforeach",
            ),
        ]);
        assert_eq!(
            engine.render("users", &json!({"users": ["a", "b"]})).unwrap(),
            "a,b,"
        );
        assert_eq!(
            engine.render("users", &json!({"users": []})).unwrap(),
            "<i>none</i>"
        );
        assert_eq!(engine.render("count", &Value::Null).unwrap(), "012");
        assert_eq!(
            engine
                .render("pairs", &json!({"map": {"a": 1, "skip": 2, "c": 3}}))
                .unwrap(),
            "a=1;c=3;"
        );
    }

    #[test]
    fn test_php_blocks_share_scope() {
        let (_dir, engine) = engine(&[(
            "sum.niac.php",
            "@php $total = 0; @endphp@foreach($prices as $p)@php $total += $p; @endphp@endforeach{{ $total }}",
        )]);
        let html = engine.render("sum", &json!({"prices": [1, 2, 3]})).unwrap();
        assert_eq!(html, "6");
    }

    #[test]
    fn test_form_helpers() {
        let (_dir, engine) = engine(&[(
            "form.niac.php",
            "<form>@csrf@method('put')</form><link href=\"@asset('css/app.css')\">",
        )]);
        let html = engine.render("form", &Value::Null).unwrap();
        assert_eq!(
            html,
            "<form><input type=\"hidden\" name=\"_token\" value=\"\"><input type=\"hidden\" name=\"_method\" value=\"PUT\"></form><link href=\"http://localhost/css/app.css\">"
        );
    }

    #[test]
    fn test_include_merges_caller_data() {
        let (_dir, engine) = engine(&[
            ("page.niac.php", "@include('partials.greeting', ['greeting' => 'Hello'])!"),
            ("partials/greeting.niac.php", "{{ $greeting }}, {{ $name }}"),
        ]);
        let html = engine.render("page", &json!({"name": "Ada", "greeting": "Hi"})).unwrap();
        assert_eq!(html, "Hello, Ada!");
    }

    #[test]
    fn test_component_with_slots() {
        let (_dir, engine) = engine(&[
            (
                "page.niac.php",
                "@component('alert', ['type' => 'error'])@slot('title')Oops@endslot Something broke@endcomponent",
            ),
            (
                "alert.niac.php",
                "<div class=\"{{ $type }}\"><b>{!! $title !!}</b>{!! $slot !!}</div>",
            ),
        ]);
        let html = engine.render("page", &Value::Null).unwrap();
        assert_eq!(html, "<div class=\"error\"><b>Oops</b> Something broke</div>");
    }

    #[test]
    fn test_undefined_function_is_a_render_error() {
        let (_dir, engine) = engine(&[("d.niac.php", "{{ date('Y') }}")]);
        let err = engine.render("d", &Value::Null).unwrap_err();
        assert!(matches!(err, ViewError::Render { .. }));
        assert!(err.to_string().contains("date()"));
    }

    // =========================================================================
    // Settings and namespaces
    // =========================================================================

    #[test]
    fn test_engine_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let views = dir.path().join("resources/views");
        let mail = dir.path().join("resources/mail");
        write_views(&views, &[("mail/welcome.niac.php", "shadowed")]);
        write_views(
            &mail,
            &[("welcome.niac.php", "Welcome to {{ config('app.name') }}, {{ $name }}")],
        );

        let mut settings = Settings::default();
        settings.app.name = "Maniac".to_string();
        settings.view.paths = vec![views];
        settings.view.mail_paths = vec![mail];
        settings.view.cache_path = dir.path().join("storage/views");

        let engine = NiacEngine::from_settings(&settings).unwrap();
        let html = engine.render("mail::welcome", &json!({"name": "Ada"})).unwrap();
        assert_eq!(html, "Welcome to Maniac, Ada");
        assert!(dir.path().join("storage/views").is_dir());
    }
}
