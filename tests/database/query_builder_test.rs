#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use maniac::db::{self, Bindings, Connection, DbHandle, DbResult, ResultSet, SqliteConnection, Value};
    use maniac::query::{QueryBuilder, QueryError};
    use maniac::sql::Dialect;

    /// Records statements instead of running them. Speaks MySQL.
    #[derive(Default)]
    struct RecordingConnection {
        statements: Mutex<Vec<(String, Bindings)>>,
    }

    impl RecordingConnection {
        fn last(&self) -> (String, Bindings) {
            self.statements.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Connection for RecordingConnection {
        fn dialect(&self) -> Dialect {
            Dialect::MySql
        }

        fn server_version(&self) -> String {
            "8.0.36".to_string()
        }

        fn execute(&self, sql: &str, bindings: &Bindings) -> DbResult<u64> {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), bindings.clone()));
            Ok(1)
        }

        fn fetch_all(&self, sql: &str, bindings: &Bindings) -> DbResult<ResultSet> {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), bindings.clone()));
            Ok(ResultSet::default())
        }

        fn exec_batch(&self, _sql: &str) -> DbResult<()> {
            Ok(())
        }

        fn last_insert_id(&self) -> DbResult<i64> {
            Ok(42)
        }

        fn begin(&self) -> DbResult<()> {
            Ok(())
        }

        fn commit(&self) -> DbResult<()> {
            Ok(())
        }

        fn rollback(&self) -> DbResult<()> {
            Ok(())
        }
    }

    fn mysql() -> (Arc<RecordingConnection>, DbHandle) {
        let conn = Arc::new(RecordingConnection::default());
        let db: DbHandle = conn.clone();
        (conn, db)
    }

    fn sqlite() -> DbHandle {
        let db = db::handle(SqliteConnection::open_in_memory().unwrap());
        db.exec_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, role TEXT, votes INTEGER NOT NULL DEFAULT 0);
             INSERT INTO users (name, role, votes) VALUES ('Ada', 'admin', 10), ('Grace', 'editor', 3), ('Linus', 'guest', 7);",
        )
        .unwrap();
        db
    }

    fn names(rows: &[maniac::db::Row]) -> Vec<String> {
        rows.iter()
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect()
    }

    // =========================================================================
    // SQL text
    // =========================================================================

    #[test]
    fn test_select_with_filters_order_and_page() {
        let (_, db) = mysql();
        let qb = QueryBuilder::table(db, "users")
            .select(["id", "name"])
            .where_("age", ">=", 18)
            .unwrap()
            .where_in("role", ["admin", "editor"])
            .order_by("name", "asc")
            .limit(10)
            .offset(20);

        insta::assert_snapshot!(qb.to_sql().unwrap(), @"SELECT `id`, `name` FROM `users` WHERE `age` >= :where_0 AND `role` IN (:where_1_0, :where_1_1) ORDER BY `name` ASC LIMIT 10 OFFSET 20");
        assert_eq!(
            qb.bindings(),
            &vec![
                ("where_0".to_string(), Value::Int(18)),
                ("where_1_0".to_string(), Value::from("admin")),
                ("where_1_1".to_string(), Value::from("editor")),
            ]
        );
    }

    #[test]
    fn test_joins_and_aliases() {
        let (_, db) = mysql();
        let qb = QueryBuilder::table(db, "posts")
            .select(["posts.*", "users.name as author"])
            .join("users", "posts.user_id", "=", "users.id")
            .unwrap()
            .left_join("comments", "comments.post_id", "=", "posts.id")
            .unwrap();

        insta::assert_snapshot!(qb.to_sql().unwrap(), @"SELECT `posts`.*, `users`.`name` AS `author` FROM `posts` INNER JOIN `users` ON `posts`.`user_id` = `users`.`id` LEFT JOIN `comments` ON `comments`.`post_id` = `posts`.`id`");
    }

    #[test]
    fn test_group_by_and_having() {
        let (_, db) = mysql();
        let qb = QueryBuilder::table(db, "orders")
            .select(["customer_id", "COUNT(*) as total"])
            .group_by(["customer_id"])
            .having("total", ">", 5)
            .unwrap();

        insta::assert_snapshot!(qb.to_sql().unwrap(), @"SELECT `customer_id`, COUNT(*) AS `total` FROM `orders` GROUP BY `customer_id` HAVING `total` > :having_0");
    }

    #[test]
    fn test_empty_in_list_never_matches() {
        let (_, db) = mysql();
        let qb = QueryBuilder::table(db, "users").where_in("id", Vec::<i64>::new());
        insta::assert_snapshot!(qb.to_sql().unwrap(), @"SELECT * FROM `users` WHERE 0=1");
        assert!(qb.bindings().is_empty());
    }

    #[test]
    fn test_invalid_direction_sorts_ascending() {
        let (_, db) = mysql();
        let qb = QueryBuilder::table(db, "users").order_by("name", "sideways");
        insta::assert_snapshot!(qb.to_sql().unwrap(), @"SELECT * FROM `users` ORDER BY `name` ASC");
    }

    #[test]
    fn test_random_order_per_dialect() {
        let (_, db) = mysql();
        let mysql_sql = QueryBuilder::table(db, "users").in_random_order().to_sql().unwrap();
        let sqlite_sql = QueryBuilder::table(sqlite(), "users").in_random_order().to_sql().unwrap();
        assert!(mysql_sql.ends_with("ORDER BY RAND() ASC"));
        assert!(sqlite_sql.ends_with("ORDER BY RANDOM() ASC"));
    }

    #[test]
    fn test_insert_statement() {
        let (conn, db) = mysql();
        let id = QueryBuilder::table(db, "users")
            .insert_get_id([("name", "Ada"), ("email", "ada@example.com")])
            .unwrap();
        assert_eq!(id, Some(42));

        let (sql, bindings) = conn.last();
        insta::assert_snapshot!(sql, @"INSERT INTO `users` (`name`, `email`) VALUES (:insert_name, :insert_email)");
        assert_eq!(bindings[0], ("insert_name".to_string(), Value::from("Ada")));
    }

    #[test]
    fn test_update_statement_binds_set_then_where() {
        let (conn, db) = mysql();
        QueryBuilder::table(db, "users")
            .where_eq("id", 7)
            .update([("name", "Ada")])
            .unwrap();

        let (sql, bindings) = conn.last();
        insta::assert_snapshot!(sql, @"UPDATE `users` SET `name` = :update_name WHERE `id` = :where_0");
        let names: Vec<&str> = bindings.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["update_name", "where_0"]);
    }

    #[test]
    fn test_increment_and_delete_statements() {
        let (conn, db) = mysql();
        let qb = QueryBuilder::table(db, "users").where_eq("id", 7);

        qb.increment("votes", 2).unwrap();
        insta::assert_snapshot!(conn.last().0, @"UPDATE `users` SET `votes` = `votes` + :amount WHERE `id` = :where_0");

        qb.decrement("votes", 1).unwrap();
        insta::assert_snapshot!(conn.last().0, @"UPDATE `users` SET `votes` = `votes` - :amount WHERE `id` = :where_0");

        qb.delete().unwrap();
        insta::assert_snapshot!(conn.last().0, @"DELETE FROM `users` WHERE `id` = :where_0");
    }

    #[test]
    fn test_unfiltered_mutations_never_reach_the_database() {
        let (conn, db) = mysql();
        let qb = QueryBuilder::table(db, "users");
        assert!(matches!(qb.update([("name", "x")]), Err(QueryError::MissingWhere(_))));
        assert!(matches!(qb.delete(), Err(QueryError::MissingWhere(_))));
        assert!(matches!(qb.decrement("votes", 1), Err(QueryError::MissingWhere(_))));
        assert!(conn.statements.lock().unwrap().is_empty());
    }

    // =========================================================================
    // Execution
    // =========================================================================

    #[test]
    fn test_get_first_and_count() {
        let db = sqlite();
        let qb = QueryBuilder::table(db.clone(), "users")
            .where_("votes", ">", 5)
            .unwrap()
            .order_by("votes", "desc");

        assert_eq!(names(&qb.get().unwrap()), ["Ada", "Linus"]);
        assert_eq!(qb.first().unwrap().unwrap()["name"], Value::from("Ada"));
        assert_eq!(qb.count().unwrap(), 2);
        assert!(qb.exists().unwrap());

        let nobody = QueryBuilder::table(db, "users").where_in("id", Vec::<i64>::new());
        assert!(nobody.get().unwrap().is_empty());
        assert!(nobody.doesnt_exist().unwrap());
    }

    #[test]
    fn test_or_where_and_like() {
        let db = sqlite();
        let rows = QueryBuilder::table(db.clone(), "users")
            .where_eq("role", "admin")
            .or_where("name", "LIKE", "Lin%")
            .unwrap()
            .order_by("id", "asc")
            .get()
            .unwrap();
        assert_eq!(names(&rows), ["Ada", "Linus"]);

        let rows = QueryBuilder::table(db, "users")
            .where_like("name", "%ac%")
            .get()
            .unwrap();
        assert_eq!(names(&rows), ["Grace"]);
    }

    #[test]
    fn test_get_column_and_distinct() {
        let db = sqlite();
        QueryBuilder::table(db.clone(), "users")
            .insert([("name", "Ada"), ("role", "admin")])
            .unwrap();

        let roles = QueryBuilder::table(db, "users")
            .select(["role"])
            .distinct()
            .order_by("role", "asc")
            .get_column()
            .unwrap();
        assert_eq!(
            roles,
            vec![Value::from("admin"), Value::from("editor"), Value::from("guest")]
        );
    }

    #[test]
    fn test_insert_many_and_increment() {
        let db = sqlite();
        let rows: Vec<maniac::db::Row> = vec![
            [("name".to_string(), Value::from("Ken"))].into_iter().collect(),
            [("name".to_string(), Value::from("Dennis"))].into_iter().collect(),
        ];
        let qb = QueryBuilder::table(db.clone(), "users");
        assert_eq!(qb.insert_many(&rows).unwrap(), 2);
        assert_eq!(qb.count().unwrap(), 5);

        let ada = QueryBuilder::table(db.clone(), "users").where_eq("name", "Ada");
        assert_eq!(ada.increment("votes", 5).unwrap(), 1);
        assert_eq!(ada.first().unwrap().unwrap()["votes"], Value::Int(15));

        assert_eq!(ada.delete().unwrap(), 1);
        assert!(ada.doesnt_exist().unwrap());
    }

    #[test]
    fn test_execution_error_carries_sql() {
        let db = sqlite();
        let err = QueryBuilder::table(db, "missing").get().unwrap_err();
        match err {
            QueryError::Execution { sql, .. } => assert_eq!(sql, "SELECT * FROM \"missing\""),
            other => panic!("unexpected error: {other}"),
        }
    }
}
