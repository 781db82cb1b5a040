use std::collections::HashMap;

use crate::db::Value;
use crate::orm::{Entity, Model};

/// Something notifications can be sent to.
pub trait Notifiable {
    /// Stored as `notifiable_type` by the database channel.
    fn notifiable_type(&self) -> String;

    /// Stored as `notifiable_id`. `Null` means the notifiable cannot be
    /// stored.
    fn notifiable_id(&self) -> Value;

    /// Routing for a channel, e.g. the email address for `mail`.
    fn route_notification_for(&self, _channel: &str) -> Option<String> {
        None
    }
}

/// Models route `mail` to their `email` attribute.
impl<E: Entity> Notifiable for Model<E> {
    fn notifiable_type(&self) -> String {
        std::any::type_name::<E>().to_string()
    }

    fn notifiable_id(&self) -> Value {
        self.key()
    }

    fn route_notification_for(&self, channel: &str) -> Option<String> {
        match channel {
            "mail" => match self.get("email") {
                Value::Text(email) if !email.is_empty() => Some(email),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A notifiable made only of routes, for recipients with no model:
/// `OnDemand::route("mail", "ops@example.com")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnDemand {
    routes: HashMap<String, String>,
}

impl OnDemand {
    pub fn route(channel: impl Into<String>, route: impl Into<String>) -> Self {
        Self::default().and_route(channel, route)
    }

    #[must_use]
    pub fn and_route(mut self, channel: impl Into<String>, route: impl Into<String>) -> Self {
        self.routes.insert(channel.into(), route.into());
        self
    }
}

impl Notifiable for OnDemand {
    fn notifiable_type(&self) -> String {
        "on-demand".to_string()
    }

    fn notifiable_id(&self) -> Value {
        Value::Null
    }

    fn route_notification_for(&self, channel: &str) -> Option<String> {
        self.routes.get(channel).cloned()
    }
}
