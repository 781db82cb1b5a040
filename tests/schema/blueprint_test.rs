#[cfg(test)]
mod tests {
    use maniac::db::{self, DbHandle, SqliteConnection, Value};
    use maniac::query::{QueryBuilder, QueryError};
    use maniac::schema::{Blueprint, Schema, SchemaError};
    use maniac::sql::{Dialect, ReferentialAction};

    fn schema() -> Schema {
        Schema::new(db::handle(SqliteConnection::open_in_memory().unwrap()))
    }

    fn create_users(schema: &Schema) {
        schema
            .create("users", |table| {
                table.id();
                table.string("name");
                table.string("email").unique();
                table.integer("votes").default(0);
                table.boolean("is_active").default(true);
                table.timestamps();
            })
            .unwrap();
    }

    fn create_posts(schema: &Schema) {
        schema
            .create("posts", |table| {
                table.id();
                table.big_integer("user_id").unsigned();
                table.string("title").index();
                table.text("body").nullable();
                table
                    .foreign("user_id")
                    .references("id", "users")
                    .on_delete(ReferentialAction::Cascade);
            })
            .unwrap();
    }

    fn users(db: &DbHandle) -> QueryBuilder {
        QueryBuilder::table(db.clone(), "users")
    }

    #[test]
    fn test_posts_table_mysql() {
        let mut table = Blueprint::new("posts");
        table.id();
        table.big_integer("user_id").unsigned();
        table.string_with_length("slug", 120).unique();
        table.decimal("price");
        table
            .foreign("user_id")
            .references("id", "users")
            .on_delete(ReferentialAction::Cascade);

        let sql = table
            .to_create_table(Dialect::MySql, "8.0.36")
            .unwrap()
            .to_sql(Dialect::MySql);
        insta::assert_snapshot!(sql, @"CREATE TABLE `posts` (`id` BIGINT UNSIGNED NOT NULL AUTO_INCREMENT, `user_id` BIGINT UNSIGNED NOT NULL, `slug` VARCHAR(120) NOT NULL, `price` DECIMAL(8,2) NOT NULL, PRIMARY KEY (`id`), UNIQUE INDEX `posts_slug_unique` (`slug`), CONSTRAINT `fk_posts_user_id` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4");
    }

    #[test]
    fn test_created_table_applies_defaults() {
        let schema = schema();
        create_users(&schema);

        let id = users(schema.db())
            .insert_get_id([("name", "Ada"), ("email", "ada@example.com")])
            .unwrap();
        assert_eq!(id, Some(1));

        let row = users(schema.db()).where_eq("id", 1).first().unwrap().unwrap();
        assert_eq!(row["votes"], Value::Int(0));
        assert_eq!(row["is_active"], Value::Int(1));
        assert_eq!(row["created_at"], Value::Null);
    }

    #[test]
    fn test_unique_index_is_enforced() {
        let schema = schema();
        create_users(&schema);

        users(schema.db())
            .insert([("name", "Ada"), ("email", "ada@example.com")])
            .unwrap();
        let err = users(schema.db())
            .insert([("name", "Imposter"), ("email", "ada@example.com")])
            .unwrap_err();
        assert!(matches!(err, QueryError::Execution { .. }));
        assert_eq!(users(schema.db()).count().unwrap(), 1);
    }

    #[test]
    fn test_foreign_key_cascades_on_delete() {
        let schema = schema();
        create_users(&schema);
        create_posts(&schema);

        let db = schema.db();
        users(db)
            .insert([("name", "Ada"), ("email", "ada@example.com")])
            .unwrap();
        QueryBuilder::table(db.clone(), "posts")
            .insert([("user_id", Value::Int(1)), ("title", Value::from("Notes"))])
            .unwrap();

        let orphan = QueryBuilder::table(db.clone(), "posts")
            .insert([("user_id", Value::Int(99)), ("title", Value::from("Orphan"))]);
        assert!(orphan.is_err());

        users(db).where_eq("id", 1).delete().unwrap();
        assert_eq!(QueryBuilder::table(db.clone(), "posts").count().unwrap(), 0);
    }

    #[test]
    fn test_alter_adds_usable_columns() {
        let schema = schema();
        create_users(&schema);

        schema
            .table("users", |table| {
                table.string("nickname").nullable().unique();
                table.integer("age").default(18);
            })
            .unwrap();

        users(schema.db())
            .insert([("name", "Ada"), ("email", "ada@example.com"), ("nickname", "countess")])
            .unwrap();
        let row = users(schema.db()).first().unwrap().unwrap();
        assert_eq!(row["nickname"], Value::from("countess"));
        assert_eq!(row["age"], Value::Int(18));
    }

    #[test]
    fn test_alter_missing_table_fails() {
        let schema = schema();
        let err = schema
            .table("ghosts", |table| {
                table.string("name").nullable();
            })
            .unwrap_err();
        assert!(matches!(err, SchemaError::AlterFailed { ref table, .. } if table == "ghosts"));
    }

    #[test]
    fn test_drop_if_exists_removes_table() {
        let schema = schema();
        create_users(&schema);
        assert!(schema.has_table("users").unwrap());

        schema.drop_if_exists("users").unwrap();
        assert!(!schema.has_table("users").unwrap());
        assert!(users(schema.db()).count().is_err());
    }
}
