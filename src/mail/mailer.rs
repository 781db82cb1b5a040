//! Rendering mailables into messages and handing them to a transport.

use serde_json::Value;
use tracing::{error, info};

use super::mailable::{Body, Component, Mailable};
use super::message::{Address, Message};
use super::transport::Transport;
use super::{markdown, theme, MailError, MailResult};
use crate::config::MailSettings;
use crate::view::NiacEngine;

/// Renders [`Mailable`]s with the application's views and delivers them.
///
/// A `Mailer` only borrows its parts, so it is cheap to copy into
/// notification channels.
#[derive(Clone, Copy)]
pub struct Mailer<'a> {
    views: &'a NiacEngine,
    settings: &'a MailSettings,
    transport: &'a dyn Transport,
}

impl std::fmt::Debug for Mailer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("settings", self.settings)
            .finish_non_exhaustive()
    }
}

impl<'a> Mailer<'a> {
    pub fn new(views: &'a NiacEngine, settings: &'a MailSettings, transport: &'a dyn Transport) -> Self {
        Self {
            views,
            settings,
            transport,
        }
    }

    /// Sender from `[mail]`, used when a mailable sets none.
    pub fn default_from(&self) -> Option<Address> {
        let address = self.settings.from_address.as_ref()?;
        Some(match &self.settings.from_name {
            Some(name) => Address::named(address.clone(), name.clone()),
            None => Address::new(address.clone()),
        })
    }

    /// Start a message with extra `to` recipients.
    pub fn to(&self, address: impl Into<Address>) -> PendingMail<'a> {
        PendingMail::new(*self).to(address)
    }

    pub fn cc(&self, address: impl Into<Address>) -> PendingMail<'a> {
        PendingMail::new(*self).cc(address)
    }

    pub fn bcc(&self, address: impl Into<Address>) -> PendingMail<'a> {
        PendingMail::new(*self).bcc(address)
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Render the HTML and text bodies and fill in the envelope.
    ///
    /// - Component mail: the theme around the components, and a text body
    ///   built from the same components.
    /// - `view`: the view output as HTML; no text body unless `text` is set.
    /// - `markdown`: the view output converted to HTML inside the theme,
    ///   and a text body stripped from it.
    ///
    /// A `text` view always supplies the text body.
    pub fn render(&self, mailable: &Mailable) -> MailResult<Message> {
        let data = mailable.view_data();
        let components = mailable.components();
        let title = mailable.subject_line().unwrap_or_default();

        let (html, text) = match mailable.body() {
            Body::Components => (
                self.themed(title, &data, components, "")?,
                Some(theme::text(components)).filter(|t| !t.is_empty()),
            ),
            Body::View(name) => (self.view(name, &data)?, None),
            Body::Markdown(name) => {
                let body = markdown::to_html(&self.view(name, &data)?);
                let mut text = theme::text(components);
                let stripped = markdown::to_text(&body);
                if !text.is_empty() && !stripped.is_empty() {
                    text.push_str("\n\n");
                }
                text.push_str(&stripped);
                (self.themed(title, &data, components, &body)?, Some(text))
            }
        };
        let text = match &mailable.text_view {
            Some(name) => Some(self.view(name, &data)?),
            None => text,
        };

        Ok(Message {
            from: mailable.from.clone().or_else(|| self.default_from()),
            to: mailable.to.clone(),
            cc: mailable.cc.clone(),
            bcc: mailable.bcc.clone(),
            reply_to: mailable.reply_to.clone(),
            subject: mailable.subject.clone(),
            html: Some(html),
            text,
            attachments: mailable.attachments.clone(),
        })
    }

    /// The theme view when the application has one, otherwise the built-in
    /// theme.
    fn themed(&self, title: &str, data: &Value, components: &[Component], body: &str) -> MailResult<String> {
        let name = format!("mail::themes.{}", self.settings.theme);
        if !self.views.exists(&name) {
            return Ok(theme::html(title, components, body));
        }
        let mut data = data.clone();
        if let Value::Object(map) = &mut data {
            map.insert("body".to_string(), Value::String(body.to_string()));
        }
        self.view(&name, &data)
    }

    fn view(&self, name: &str, data: &Value) -> MailResult<String> {
        self.views.render(name, data).map_err(|source| {
            error!(view = %name, error = %source, "Mail view rendering failed");
            MailError::View {
                view: name.to_string(),
                source,
            }
        })
    }

    // ========================================================================
    // Delivery
    // ========================================================================

    /// Render, validate and deliver. Returns the delivered message.
    pub fn send(&self, mailable: Mailable) -> MailResult<Message> {
        let result = self.render(&mailable).and_then(|message| {
            message.validate()?;
            self.transport.deliver(&message)?;
            Ok(message)
        });
        match &result {
            Ok(message) => {
                let to: Vec<&str> = message.recipients().map(|a| a.address.as_str()).collect();
                info!(to = ?to, subject = message.subject.as_deref().unwrap_or(""), "Email sent");
            }
            Err(e) => error!(error = %e, "Email sending failed"),
        }
        result
    }
}

/// Recipients gathered before the mailable is known:
/// `mailer.to("ada@example.com").cc("ops@example.com").send(mail)`.
#[derive(Debug, Clone)]
pub struct PendingMail<'a> {
    mailer: Mailer<'a>,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    reply_to: Vec<Address>,
}

impl<'a> PendingMail<'a> {
    pub fn new(mailer: Mailer<'a>) -> Self {
        Self {
            mailer,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: Vec::new(),
        }
    }

    #[must_use]
    pub fn to(mut self, address: impl Into<Address>) -> Self {
        self.to.push(address.into());
        self
    }

    #[must_use]
    pub fn cc(mut self, address: impl Into<Address>) -> Self {
        self.cc.push(address.into());
        self
    }

    #[must_use]
    pub fn bcc(mut self, address: impl Into<Address>) -> Self {
        self.bcc.push(address.into());
        self
    }

    #[must_use]
    pub fn reply_to(mut self, address: impl Into<Address>) -> Self {
        self.reply_to.push(address.into());
        self
    }

    /// Append the gathered recipients to the mailable's own and send it.
    pub fn send(self, mut mailable: Mailable) -> MailResult<Message> {
        mailable.to.extend(self.to);
        mailable.cc.extend(self.cc);
        mailable.bcc.extend(self.bcc);
        mailable.reply_to.extend(self.reply_to);
        self.mailer.send(mailable)
    }
}
