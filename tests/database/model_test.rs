#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use maniac::db::{Bindings, Connection, DbHandle, DbResult, ResultSet, Row, SqliteConnection, Value};
    use maniac::orm::{Entity, FieldTable, Model, ModelError};
    use maniac::sql::Dialect;

    /// SQLite connection that remembers every statement it runs.
    struct CountingConnection {
        inner: SqliteConnection,
        statements: Mutex<Vec<String>>,
    }

    impl CountingConnection {
        fn count(&self) -> usize {
            self.statements.lock().unwrap().len()
        }

        fn last(&self) -> String {
            self.statements.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    impl Connection for CountingConnection {
        fn dialect(&self) -> Dialect {
            self.inner.dialect()
        }

        fn server_version(&self) -> String {
            self.inner.server_version()
        }

        fn execute(&self, sql: &str, bindings: &Bindings) -> DbResult<u64> {
            self.statements.lock().unwrap().push(sql.to_string());
            self.inner.execute(sql, bindings)
        }

        fn fetch_all(&self, sql: &str, bindings: &Bindings) -> DbResult<ResultSet> {
            self.statements.lock().unwrap().push(sql.to_string());
            self.inner.fetch_all(sql, bindings)
        }

        fn exec_batch(&self, sql: &str) -> DbResult<()> {
            self.inner.exec_batch(sql)
        }

        fn last_insert_id(&self) -> DbResult<i64> {
            self.inner.last_insert_id()
        }

        fn begin(&self) -> DbResult<()> {
            self.inner.begin()
        }

        fn commit(&self) -> DbResult<()> {
            self.inner.commit()
        }

        fn rollback(&self) -> DbResult<()> {
            self.inner.rollback()
        }
    }

    struct User;

    impl Entity for User {
        const FILLABLE: &'static [&'static str] = &["name", "email", "votes"];

        fn fields() -> FieldTable {
            FieldTable::new()
                .getter("name", |v| match v {
                    Value::Text(s) => Value::Text(s.to_uppercase()),
                    other => other.clone(),
                })
                .setter("email", |v| match v {
                    Value::Text(s) => Value::Text(s.to_lowercase()),
                    other => other,
                })
        }
    }

    struct Post;

    impl Entity for Post {
        const FILLABLE: &'static [&'static str] = &["title", "user_id"];
    }

    struct Role;

    impl Entity for Role {}

    fn setup() -> (Arc<CountingConnection>, DbHandle) {
        let conn = Arc::new(CountingConnection {
            inner: SqliteConnection::open_in_memory().unwrap(),
            statements: Mutex::new(Vec::new()),
        });
        conn.exec_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, email TEXT, votes INTEGER NOT NULL DEFAULT 0, is_admin INTEGER NOT NULL DEFAULT 0);
             CREATE TABLE posts (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT, user_id INTEGER);
             CREATE TABLE roles (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);
             CREATE TABLE role_user (user_id INTEGER, role_id INTEGER);",
        )
        .unwrap();
        let db: DbHandle = conn.clone();
        (conn, db)
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_table_names_derive_from_type() {
        assert_eq!(Model::<User>::table(), "users");
        assert_eq!(Model::<Post>::table(), "posts");
    }

    #[test]
    fn test_create_and_find() {
        let (_, db) = setup();
        let user = Model::<User>::create(&db, [("name", "Ada"), ("email", "ADA@Example.com")]).unwrap();
        assert!(user.exists());
        assert_eq!(user.key(), Value::Int(1));

        let found = Model::<User>::find(&db, 1).unwrap().unwrap();
        assert_eq!(found.get("name"), Value::from("ADA"));
        assert_eq!(found.get("email"), Value::from("ada@example.com"));
        assert_eq!(found.attributes()["name"], Value::from("Ada"));
        assert!(!found.is_dirty());

        assert!(Model::<User>::find(&db, 99).unwrap().is_none());
    }

    #[test]
    fn test_save_without_changes_runs_no_sql() {
        let (conn, db) = setup();
        let mut user = Model::<User>::create(&db, [("name", "Ada")]).unwrap();
        let before = conn.count();
        assert!(user.save().unwrap());
        assert_eq!(conn.count(), before);

        let mut loaded = Model::<User>::find_or_fail(&db, user.key()).unwrap();
        let before = conn.count();
        assert!(loaded.save().unwrap());
        assert_eq!(conn.count(), before);
    }

    #[test]
    fn test_save_writes_only_dirty_attributes() {
        let (conn, db) = setup();
        let mut user = Model::<User>::create(&db, [("name", "Ada"), ("email", "ada@example.com")]).unwrap();
        user.set("name", "Ada Lovelace").unwrap();
        assert_eq!(user.dirty().len(), 1);

        assert!(user.save().unwrap());
        assert_eq!(
            conn.last(),
            "UPDATE \"users\" SET \"name\" = :update_name WHERE \"id\" = :where_0"
        );
        assert!(!user.is_dirty());
    }

    #[test]
    fn test_mass_assignment_is_guarded() {
        let (_, db) = setup();
        let mut user = Model::<User>::make(&db, [("name", "Eve"), ("is_admin", "1")]);
        assert!(!user.has("is_admin"));
        assert!(matches!(
            user.set("is_admin", 1),
            Err(ModelError::NotFillable(key)) if key == "is_admin"
        ));

        user.save().unwrap();
        let stored = Model::<User>::find(&db, user.key()).unwrap().unwrap();
        assert_eq!(stored.get("is_admin"), Value::Int(0));
    }

    #[test]
    fn test_find_or_fail() {
        let (_, db) = setup();
        let err = Model::<User>::find_or_fail(&db, 7).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "users with ID 7 not found");
    }

    #[test]
    fn test_update_delete_and_increment() {
        let (_, db) = setup();
        let mut unsaved = Model::<User>::make(&db, [("name", "Ghost")]);
        assert!(!unsaved.update([("name", "Still ghost")]).unwrap());

        let mut user = Model::<User>::create(&db, [("name", "Ada")]).unwrap();
        assert!(user.update([("email", "ada@example.com")]).unwrap());

        assert_eq!(user.increment("votes", 3).unwrap(), 1);
        assert_eq!(user.get("votes"), Value::Int(3));
        assert!(!user.is_dirty());
        let stored = Model::<User>::find(&db, user.key()).unwrap().unwrap();
        assert_eq!(stored.get("votes"), Value::Int(3));

        assert!(user.delete().unwrap());
        assert!(!user.exists());
        assert!(Model::<User>::find(&db, 1).unwrap().is_none());
    }

    #[test]
    fn test_first_or_new_and_update_or_create() {
        let (_, db) = setup();
        let fresh = Model::<User>::first_or_new(
            &db,
            row(&[("email", Value::from("a@b.c"))]),
            row(&[("name", Value::from("Ann"))]),
        )
        .unwrap();
        assert!(!fresh.exists());
        assert_eq!(fresh.get("name"), Value::from("ANN"));

        let created = Model::<User>::update_or_create(
            &db,
            row(&[("email", Value::from("a@b.c"))]),
            row(&[("name", Value::from("Ann"))]),
        )
        .unwrap();
        assert!(created.exists());

        let updated = Model::<User>::update_or_create(
            &db,
            row(&[("email", Value::from("a@b.c"))]),
            row(&[("name", Value::from("Anne"))]),
        )
        .unwrap();
        assert_eq!(updated.key(), created.key());
        assert_eq!(Model::<User>::query(&db).count().unwrap(), 1);
        assert_eq!(
            Model::<User>::pluck(&db, "name", [("email", "a@b.c")]).unwrap(),
            vec![Value::from("Anne")]
        );
    }

    #[test]
    fn test_paginate() {
        let (_, db) = setup();
        for name in ["a", "b", "c", "d", "e"] {
            Model::<User>::create(&db, [("name", name)]).unwrap();
        }
        let page = Model::<User>::paginate(&db, 2, 3).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.last_page, 3);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].get("name"), Value::from("E"));
    }

    #[test]
    fn test_relationships() {
        let (_, db) = setup();
        let ada = Model::<User>::create(&db, [("name", "Ada")]).unwrap();
        let grace = Model::<User>::create(&db, [("name", "Grace")]).unwrap();
        let post = Model::<Post>::create(&db, [("title", Value::from("Notes")), ("user_id", ada.key())]).unwrap();
        Model::<Post>::create(&db, [("title", Value::from("Other")), ("user_id", grace.key())]).unwrap();

        let posts = ada.has_many::<Post>("user_id").unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].get("title"), Value::from("Notes"));

        let author = post.belongs_to::<User>("user_id").unwrap().unwrap();
        assert_eq!(author.key(), ada.key());

        db.exec_batch(
            "INSERT INTO roles (name) VALUES ('admin'), ('editor');
             INSERT INTO role_user (user_id, role_id) VALUES (1, 2);",
        )
        .unwrap();
        let roles = ada.belongs_to_many::<Role>("role_user", "user_id", "role_id").unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].get("name"), Value::from("editor"));
    }

    #[test]
    fn test_to_json_reads_through_accessors() {
        let (_, db) = setup();
        let user = Model::<User>::create(&db, [("name", "Ada")]).unwrap();
        let json = user.to_json();
        assert_eq!(json["name"], "ADA");
        assert_eq!(json["id"], 1);
        assert_eq!(serde_json::to_value(&user).unwrap(), json);
    }
}
