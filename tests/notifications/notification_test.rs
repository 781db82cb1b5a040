#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use maniac::config::Settings;
    use maniac::db::Value;
    use maniac::foundation::App;
    use maniac::mail::{Mailable, Outbox};
    use maniac::notifications::{
        CreateNotificationsTable, DatabaseChannel, Notifiable, Notification, NotificationError, OnDemand,
    };
    use maniac::orm::{Entity, Model};
    use maniac::schema::{Migration, Migrator, Schema, SchemaResult};
    use serde_json::json;
    use tempfile::TempDir;

    struct User;

    impl Entity for User {
        const FILLABLE: &'static [&'static str] = &["name", "email", "prefers_email"];
    }

    struct CreateUsersTable;

    impl Migration for CreateUsersTable {
        fn name(&self) -> &str {
            "2025_05_02_151835_create_users_table"
        }

        fn up(&self, schema: &Schema) -> SchemaResult<()> {
            schema.create("users", |table| {
                table.id();
                table.string("name");
                table.string("email").nullable();
                table.boolean("prefers_email").default(false);
            })
        }

        fn down(&self, schema: &Schema) -> SchemaResult<()> {
            schema.drop_if_exists("users")
        }
    }

    struct InvoicePaid {
        id: i64,
        amount: f64,
    }

    impl Notification for InvoicePaid {
        fn via(&self, notifiable: &dyn Notifiable) -> Vec<&'static str> {
            let mut channels = vec!["database"];
            if notifiable.route_notification_for("mail").is_some() {
                channels.push("mail");
            }
            channels
        }

        fn to_mail(&self, _: &dyn Notifiable) -> Option<Mailable> {
            Some(
                Mailable::new()
                    .subject(format!("Your Invoice #{} Has Been Paid", self.id))
                    .line(format!("Invoice #{} for {} has been paid.", self.id, self.amount)),
            )
        }

        fn to_database(&self, _: &dyn Notifiable) -> serde_json::Value {
            json!({
                "invoice_id": self.id,
                "amount_paid": self.amount,
                "message": format!("Invoice #{} for {} has been paid.", self.id, self.amount),
            })
        }
    }

    struct UserRegistered {
        name: String,
    }

    impl Notification for UserRegistered {
        fn via(&self, _: &dyn Notifiable) -> Vec<&'static str> {
            vec!["mail", "database"]
        }

        fn to_mail(&self, _: &dyn Notifiable) -> Option<Mailable> {
            Some(
                Mailable::new()
                    .subject("Welcome to Maniac Framework!")
                    .greeting(format!("Hello {}!", self.name))
                    .line("Thank you for registering with us!")
                    .action("Login Now", "https://maniac.test/login"),
            )
        }

        fn to_array(&self, _: &dyn Notifiable) -> serde_json::Value {
            json!({ "message": format!("User {} registered.", self.name) })
        }
    }

    /// Prefers mail only when the user opted in.
    struct MailPreference<'a>(&'a Model<User>);

    impl Notifiable for MailPreference<'_> {
        fn notifiable_type(&self) -> String {
            self.0.notifiable_type()
        }

        fn notifiable_id(&self) -> Value {
            self.0.notifiable_id()
        }

        fn route_notification_for(&self, channel: &str) -> Option<String> {
            match self.0.get("prefers_email").as_i64() {
                Some(1) => self.0.route_notification_for(channel),
                _ => None,
            }
        }
    }

    fn app() -> (TempDir, App, Outbox) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.app.url = "https://maniac.test".to_string();
        settings.view.paths = vec![dir.path().join("views")];
        settings.view.mail_paths = vec![dir.path().join("mail")];
        settings.view.cache_path = dir.path().join("cache");
        settings.database.path = dir.path().join("app.sqlite").to_string_lossy().into_owned();
        settings.mail.from_address = Some("billing@maniac.test".to_string());

        let outbox = Outbox::new();
        let app = App::from_settings(settings)
            .unwrap()
            .connect()
            .unwrap()
            .with_transport(Arc::new(outbox.clone()));
        Migrator::new(app.schema().unwrap())
            .unwrap()
            .run(&[&CreateUsersTable, &CreateNotificationsTable])
            .unwrap();
        (dir, app, outbox)
    }

    fn user(app: &App, name: &str, email: Option<&str>, prefers_email: bool) -> Model<User> {
        Model::<User>::create(
            app.db().unwrap(),
            [
                ("name", Value::from(name)),
                ("email", Value::from(email)),
                ("prefers_email", Value::from(prefers_email)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_invoice_paid_respects_mail_preference() {
        let (_dir, app, outbox) = app();
        let ada = user(&app, "Ada", Some("ada@example.com"), true);
        let bob = user(&app, "Bob", Some("bob@example.com"), false);

        let dispatch = app.notifications().send(
            &[&MailPreference(&ada), &MailPreference(&bob)],
            &InvoicePaid { id: 7, amount: 12.5 },
        );
        assert!(dispatch.is_ok());
        let delivered: Vec<&str> = dispatch.delivered.iter().map(|(channel, _)| channel.as_str()).collect();
        assert_eq!(delivered, vec!["database", "mail", "database"]);

        let messages = outbox.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].to[0].address, "ada@example.com");
        assert_eq!(messages[0].subject.as_deref(), Some("Your Invoice #7 Has Been Paid"));
        assert_eq!(messages[0].from.as_ref().map(|a| a.address.as_str()), Some("billing@maniac.test"));

        let store = DatabaseChannel::new(app.db().unwrap().clone());
        let stored = store.unread_for(&bob).unwrap();
        assert_eq!(stored.len(), 1);
        let data: serde_json::Value = serde_json::from_str(stored[0]["data"].as_str().unwrap()).unwrap();
        assert_eq!(
            data,
            json!({"invoice_id": 7, "amount_paid": 12.5, "message": "Invoice #7 for 12.5 has been paid."})
        );
        assert!(stored[0]["notifiable_type"].as_str().unwrap().ends_with("::User"));
        assert_eq!(stored[0]["notifiable_id"], bob.key());
    }

    #[test]
    fn test_user_registered_over_both_channels() {
        let (_dir, app, outbox) = app();
        let grace = user(&app, "Grace", Some("grace@example.com"), false);
        let nobody = user(&app, "Nobody", None, false);

        let notification = UserRegistered { name: "Grace".to_string() };
        let dispatch = app.notifications().notify(&grace, &notification);
        assert_eq!(dispatch.delivered.len(), 2);

        let dispatch = app.notifications().notify(&nobody, &notification);
        assert_eq!(dispatch.skipped, 1);
        assert_eq!(dispatch.delivered.len(), 1);

        let sent = outbox.take();
        assert_eq!(sent.len(), 1);
        let html = sent[0].html.as_deref().unwrap();
        assert!(html.contains("<h2>Hello Grace!</h2>"));
        assert!(html.contains(r#"<a href="https://maniac.test/login">Login Now</a>"#));

        let store = DatabaseChannel::new(app.db().unwrap().clone());
        let rows = store.notifications_for(&grace).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["data"], Value::from(r#"{"message":"User Grace registered."}"#));

        let id = rows[0]["id"].as_str().unwrap().to_string();
        assert!(store.mark_as_read(&id).unwrap());
        assert!(store.unread_for(&grace).unwrap().is_empty());
        assert_eq!(store.notifications_for(&nobody).unwrap().len(), 1);
    }

    #[test]
    fn test_on_demand_and_failures() {
        let (_dir, app, outbox) = app();
        let ops = OnDemand::route("mail", "ops@example.com");

        let dispatch = app
            .notifications()
            .notify(&ops, &UserRegistered { name: "Ops".to_string() });
        assert_eq!(dispatch.delivered, vec![("mail".to_string(), "on-demand".to_string())]);
        assert_eq!(dispatch.skipped, 1);

        let broken = OnDemand::route("mail", "not an address");
        let dispatch = app
            .notifications()
            .notify(&broken, &UserRegistered { name: "Ops".to_string() });
        assert_eq!(dispatch.failures.len(), 1);
        assert_eq!(dispatch.failures[0].channel, "mail");
        assert!(matches!(dispatch.failures[0].error, NotificationError::Mail(_)));
        assert_eq!(outbox.len(), 1);
    }
}
