//! Delivery channels.

use tracing::warn;

use super::{Notifiable, Notification, NotificationResult};
use crate::mail::{Address, Mailer};

/// One way of delivering a notification.
///
/// `send` returns `false` when the notification or the notifiable has
/// nothing for this channel.
pub trait Channel {
    fn send(&self, notifiable: &dyn Notifiable, notification: &dyn Notification) -> NotificationResult<bool>;
}

/// Sends [`Notification::to_mail`] to the notifiable's `mail` route.
#[derive(Debug, Clone, Copy)]
pub struct MailChannel<'a> {
    mailer: Mailer<'a>,
}

impl<'a> MailChannel<'a> {
    pub fn new(mailer: Mailer<'a>) -> Self {
        Self { mailer }
    }
}

impl Channel for MailChannel<'_> {
    fn send(&self, notifiable: &dyn Notifiable, notification: &dyn Notification) -> NotificationResult<bool> {
        let Some(mailable) = notification.to_mail(notifiable) else {
            return Ok(false);
        };
        let Some(route) = notifiable.route_notification_for("mail") else {
            warn!(
                notification = notification.kind(),
                notifiable_type = %notifiable.notifiable_type(),
                "No mail route for notifiable"
            );
            return Ok(false);
        };
        self.mailer.send(mailable.to(Address::new(route)))?;
        Ok(true)
    }
}
