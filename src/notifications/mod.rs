//! Notifications delivered over named channels.
//!
//! A [`Notification`] names its channels per notifiable (`via`) and
//! provides one representation per channel: a [`Mailable`] for `mail`, a
//! JSON document for `database`. A [`NotificationSender`] resolves the
//! channel names to registered [`Channel`]s.
//!
//! ```ignore
//! struct InvoicePaid { id: i64, amount: f64 }
//!
//! impl Notification for InvoicePaid {
//!     fn via(&self, _: &dyn Notifiable) -> Vec<&'static str> {
//!         vec!["database", "mail"]
//!     }
//!
//!     fn to_mail(&self, _: &dyn Notifiable) -> Option<Mailable> {
//!         Some(Mailable::new().subject("Invoice paid").line(format!("Invoice #{} is paid.", self.id)))
//!     }
//!
//!     fn to_database(&self, _: &dyn Notifiable) -> serde_json::Value {
//!         json!({ "invoice_id": self.id, "amount": self.amount })
//!     }
//! }
//!
//! app.notifications().notify(&user, &InvoicePaid { id: 7, amount: 12.5 });
//! ```

mod channels;
mod database;
mod notifiable;
mod sender;

pub use channels::{Channel, MailChannel};
pub use database::{CreateNotificationsTable, DatabaseChannel, NOTIFICATIONS_TABLE};
pub use notifiable::{Notifiable, OnDemand};
pub use sender::{ChannelFailure, Dispatch, NotificationSender};

use serde_json::{json, Value};

use crate::mail::{MailError, Mailable};
use crate::query::QueryError;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification channel [{0}] is not registered")]
    UnknownChannel(String),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("Failed to store notification: {0}")]
    Query(#[from] QueryError),

    #[error("Failed to encode notification data: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

pub trait Notification {
    /// Channel names for this notifiable.
    fn via(&self, notifiable: &dyn Notifiable) -> Vec<&'static str>;

    /// The `mail` representation. `None` skips the channel.
    fn to_mail(&self, _notifiable: &dyn Notifiable) -> Option<Mailable> {
        None
    }

    /// The `database` representation; defaults to [`to_array`](Self::to_array).
    fn to_database(&self, notifiable: &dyn Notifiable) -> Value {
        self.to_array(notifiable)
    }

    fn to_array(&self, _notifiable: &dyn Notifiable) -> Value {
        json!({})
    }

    /// Stored as `type`; the implementing type's path by default.
    fn kind(&self) -> &'static str {
        std::any::type_name_of_val(self)
    }
}
