//! The `notifications` table.

use chrono::Utc;
use tracing::warn;

use super::channels::Channel;
use super::{Notifiable, Notification, NotificationResult};
use crate::db::{DbHandle, Row, Value};
use crate::query::{QueryBuilder, QueryResult};
use crate::schema::{Migration, Schema, SchemaResult};

pub const NOTIFICATIONS_TABLE: &str = "notifications";

fn now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Stores [`Notification::to_database`] as a JSON row in `notifications`.
#[derive(Clone)]
pub struct DatabaseChannel {
    db: DbHandle,
}

impl std::fmt::Debug for DatabaseChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseChannel")
            .field("dialect", &self.db.dialect())
            .finish()
    }
}

impl DatabaseChannel {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    fn table(&self) -> QueryBuilder {
        QueryBuilder::table(self.db.clone(), NOTIFICATIONS_TABLE)
    }

    /// Every stored notification for `notifiable`, newest first.
    pub fn notifications_for(&self, notifiable: &dyn Notifiable) -> QueryResult<Vec<Row>> {
        self.table()
            .where_eq("notifiable_type", notifiable.notifiable_type())
            .where_eq("notifiable_id", notifiable.notifiable_id())
            .order_by("created_at", "desc")
            .get()
    }

    /// Stored notifications with no `read_at`.
    pub fn unread_for(&self, notifiable: &dyn Notifiable) -> QueryResult<Vec<Row>> {
        let mut rows = self.notifications_for(notifiable)?;
        rows.retain(|row| row.get("read_at").map_or(true, Value::is_null));
        Ok(rows)
    }

    /// Set `read_at` on one notification. Returns whether it existed.
    pub fn mark_as_read(&self, id: &str) -> QueryResult<bool> {
        let now = now();
        let updated = self
            .table()
            .where_eq("id", id)
            .update([("read_at", now.clone()), ("updated_at", now)])?;
        Ok(updated > 0)
    }
}

impl Channel for DatabaseChannel {
    fn send(&self, notifiable: &dyn Notifiable, notification: &dyn Notification) -> NotificationResult<bool> {
        let notifiable_id = notifiable.notifiable_id();
        if notifiable_id.is_null() {
            warn!(
                notification = notification.kind(),
                notifiable_type = %notifiable.notifiable_type(),
                "Cannot store a notification for a notifiable without a key"
            );
            return Ok(false);
        }

        let data = serde_json::to_string(&notification.to_database(notifiable))?;
        let now = now();
        self.table().insert([
            ("id", Value::from(uuid::Uuid::new_v4().to_string())),
            ("type", Value::from(notification.kind())),
            ("notifiable_type", Value::from(notifiable.notifiable_type())),
            ("notifiable_id", notifiable_id),
            ("data", Value::from(data)),
            ("read_at", Value::Null),
            ("created_at", Value::from(now.clone())),
            ("updated_at", Value::from(now)),
        ])?;
        Ok(true)
    }
}

/// Creates the table [`DatabaseChannel`] writes to.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateNotificationsTable;

impl Migration for CreateNotificationsTable {
    fn name(&self) -> &str {
        "0000_00_00_000000_create_notifications_table"
    }

    fn up(&self, schema: &Schema) -> SchemaResult<()> {
        schema.create(NOTIFICATIONS_TABLE, |table| {
            table.string_with_length("id", 36).primary();
            table.string("type");
            table.string("notifiable_type");
            table.big_integer("notifiable_id").unsigned();
            table.text("data");
            table.timestamp("read_at").nullable();
            table.timestamps();
            table.index(["notifiable_type", "notifiable_id"]);
        })
    }

    fn down(&self, schema: &Schema) -> SchemaResult<()> {
        schema.drop_if_exists(NOTIFICATIONS_TABLE)
    }
}
