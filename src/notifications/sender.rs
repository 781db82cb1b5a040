use std::collections::BTreeMap;

use tracing::{error, warn};

use super::channels::Channel;
use super::{Notifiable, Notification, NotificationError};

/// A channel that failed for one notifiable.
#[derive(Debug)]
pub struct ChannelFailure {
    pub channel: String,
    pub notifiable_type: String,
    pub error: NotificationError,
}

/// Outcome of one [`NotificationSender::send`].
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Deliveries, as `(channel, notifiable_type)`.
    pub delivered: Vec<(String, String)>,
    /// Channels that had nothing to send.
    pub skipped: usize,
    pub failures: Vec<ChannelFailure>,
}

impl Dispatch {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Routes notifications to named channels.
#[derive(Default)]
pub struct NotificationSender<'a> {
    channels: BTreeMap<String, Box<dyn Channel + 'a>>,
}

impl std::fmt::Debug for NotificationSender<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSender")
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<'a> NotificationSender<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_channel(mut self, name: impl Into<String>, channel: impl Channel + 'a) -> Self {
        self.register_channel(name, channel);
        self
    }

    /// Register or replace a channel.
    pub fn register_channel(&mut self, name: impl Into<String>, channel: impl Channel + 'a) {
        self.channels.insert(name.into(), Box::new(channel));
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Deliver `notification` to one notifiable.
    pub fn notify(&self, notifiable: &dyn Notifiable, notification: &dyn Notification) -> Dispatch {
        self.send(&[notifiable], notification)
    }

    /// Deliver `notification` over every channel its `via` names, for each
    /// notifiable in turn.
    ///
    /// A failing or unknown channel is logged and recorded in the
    /// [`Dispatch`]; the remaining channels and notifiables still run.
    pub fn send(&self, notifiables: &[&dyn Notifiable], notification: &dyn Notification) -> Dispatch {
        let mut dispatch = Dispatch::default();
        for notifiable in notifiables {
            for name in notification.via(*notifiable) {
                let notifiable_type = notifiable.notifiable_type();
                let result = match self.channels.get(name) {
                    Some(channel) => channel.send(*notifiable, notification),
                    None => {
                        warn!(channel = %name, "Notification channel not registered");
                        Err(NotificationError::UnknownChannel(name.to_string()))
                    }
                };
                match result {
                    Ok(true) => dispatch.delivered.push((name.to_string(), notifiable_type)),
                    Ok(false) => dispatch.skipped += 1,
                    Err(e) => {
                        error!(
                            channel = %name,
                            notification = notification.kind(),
                            notifiable_type = %notifiable_type,
                            error = %e,
                            "Failed to send notification"
                        );
                        dispatch.failures.push(ChannelFailure {
                            channel: name.to_string(),
                            notifiable_type,
                            error: e,
                        });
                    }
                }
            }
        }
        dispatch
    }
}
