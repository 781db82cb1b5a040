#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use maniac::config::Settings;
    use maniac::foundation::App;
    use maniac::mail::{AttachmentSource, MailError, Mailable, Outbox};
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, source: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }

    fn app(theme: &str) -> (TempDir, App, Outbox) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.app.name = "Maniac".to_string();
        settings.app.url = "https://maniac.test".to_string();
        settings.view.paths = vec![dir.path().join("views")];
        settings.view.mail_paths = vec![dir.path().join("mail")];
        settings.view.cache_path = dir.path().join("cache");
        settings.mail.from_address = Some("no-reply@maniac.test".to_string());
        settings.mail.from_name = Some("Maniac Framework".to_string());
        settings.mail.theme = theme.to_string();

        write(
            dir.path(),
            "mail/welcome.niac.php",
            "# Welcome, {{ $user['name'] }}!\n\n\
             Your dashboard is at <{{ url('dashboard') }}>.\n\n\
             @if($user['admin'])\n\
             You have **admin** rights.\n\
             @endif\n",
        );
        write(
            dir.path(),
            "mail/themes/framed.niac.php",
            "<h1>{{ config('app.name') }}</h1>\n\
             @foreach($components as $c)\n\
             @if($c['type'] === 'greeting')<h2>{{ $c['value'] }}</h2>\n@endif\n\
             @endforeach\n\
             {!! $body !!}",
        );

        let outbox = Outbox::new();
        let app = App::from_settings(settings)
            .unwrap()
            .with_transport(Arc::new(outbox.clone()));
        (dir, app, outbox)
    }

    fn welcome(name: &str, email: &str) -> Mailable {
        Mailable::new()
            .to((email, name))
            .subject("Welcome to Maniac Framework!")
            .greeting(format!("Hello {}!", name))
            .line("Welcome to the Maniac Framework!")
            .action("Explore Dashboard", "https://maniac.test/dashboard")
            .line("We are excited to have you on board.")
            .panel(format!("Your account details: <br>Email: {}", email))
            .table(
                [json!({"key": "Name", "value": name}), json!({"key": "Email", "value": email})],
                ["key", "value"],
            )
            .signature("The Maniac Team")
            .footer("Maniac Framework. All rights reserved.")
    }

    #[test]
    fn test_component_mail_with_builtin_theme() {
        let (_dir, app, outbox) = app("default");
        let sent = app.mailer().send(welcome("Ada", "ada@example.com")).unwrap();

        assert_eq!(outbox.messages(), vec![sent.clone()]);
        assert_eq!(
            sent.from.map(|a| a.to_string()).as_deref(),
            Some(r#""Maniac Framework" <no-reply@maniac.test>"#)
        );
        assert_eq!(sent.to[0].to_string(), r#""Ada" <ada@example.com>"#);

        let html = sent.html.unwrap();
        assert!(html.contains("<title>Welcome to Maniac Framework!</title>"));
        assert!(html.contains("<h2>Hello Ada!</h2>"));
        assert!(html.contains(r#"<a href="https://maniac.test/dashboard">Explore Dashboard</a>"#));
        assert!(html.contains("<div class=\"panel\">Your account details: <br>Email: ada@example.com</div>"));
        assert!(html.contains("<tr><td>Email</td><td>ada@example.com</td></tr>"));

        insta::assert_snapshot!(sent.text.unwrap(), @r"
        Hello Ada!

        Welcome to the Maniac Framework!

        Explore Dashboard: https://maniac.test/dashboard

        We are excited to have you on board.

        Your account details: Email: ada@example.com

        key: Name
        value: Ada
        -----
        key: Email
        value: ada@example.com
        -----

        --
        The Maniac Team

        Maniac Framework. All rights reserved.
        ");
    }

    #[test]
    fn test_markdown_mail_with_theme_view() {
        let (_dir, app, outbox) = app("framed");
        let mail = Mailable::new()
            .to("grace@example.com")
            .subject("Welcome")
            .greeting("Hi Grace")
            .markdown("mail::welcome")
            .with("user", json!({"name": "Grace <Hopper>", "admin": true}));

        app.mailer().send(mail).unwrap();
        let sent = outbox.take().remove(0);

        insta::assert_snapshot!(sent.html.unwrap().trim_end(), @r#"
        <h1>Maniac</h1>
        <h2>Hi Grace</h2>
        <h1>Welcome, Grace &lt;Hopper&gt;!</h1>
        <p>Your dashboard is at <a href="https://maniac.test/dashboard">https://maniac.test/dashboard</a>.</p>
        <p>You have <strong>admin</strong> rights.</p>
        "#);
        assert_eq!(
            sent.text.as_deref(),
            Some(
                "Hi Grace\n\nWelcome, Grace <Hopper>!\n\
                 Your dashboard is at https://maniac.test/dashboard.\n\
                 You have admin rights."
            )
        );
    }

    #[test]
    fn test_send_failures_leave_outbox_empty() {
        let (_dir, app, outbox) = app("default");

        let err = app.mailer().send(Mailable::new().line("nobody")).unwrap_err();
        assert!(matches!(err, MailError::NoRecipients));

        let err = app.mailer().send(welcome("Bad", "not-an-address")).unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress(ref a) if a == "not-an-address"));

        let err = app
            .mailer()
            .to("ada@example.com")
            .send(Mailable::new().markdown("mail::missing"))
            .unwrap_err();
        assert!(err.to_string().starts_with("Error rendering email view [mail::missing]"));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_attachments_are_carried() {
        let (_dir, app, outbox) = app("default");
        app.mailer()
            .to("ada@example.com")
            .bcc("audit@example.com")
            .send(
                Mailable::new()
                    .line("Report attached.")
                    .attach_data("a,b\n1,2\n", "report.csv", Some("text/csv"))
                    .attach("/srv/terms.pdf"),
            )
            .unwrap();

        let messages = outbox.messages();
        let sent = &messages[0];
        assert_eq!(sent.bcc[0].address, "audit@example.com");
        assert_eq!(sent.attachments.len(), 2);
        assert_eq!(sent.attachments[0].source, AttachmentSource::Data(b"a,b\n1,2\n".to_vec()));
        assert_eq!(sent.attachments[0].name.as_deref(), Some("report.csv"));
        assert_eq!(sent.attachments[1].source, AttachmentSource::Path("/srv/terms.pdf".into()));
    }
}
