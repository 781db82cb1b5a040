//! Mail composition and rendering.
//!
//! A [`Mailable`] describes a message: envelope, a body built from a Niac
//! view, a Markdown view or content components (greeting, lines, action
//! button, panel, table, signature, footer), and attachments. A [`Mailer`]
//! renders it into a [`Message`] and passes it to a [`Transport`].
//!
//! Component and Markdown mail is wrapped in the `mail::themes.{theme}`
//! view when the application provides one, and in a built-in theme
//! otherwise.
//!
//! ```ignore
//! let outbox = Outbox::new();
//! let mailer = Mailer::new(app.views(), &app.settings().mail, &outbox);
//! mailer
//!     .to("ada@example.com")
//!     .send(Mailable::new().subject("Welcome").markdown("mail::welcome"))?;
//! ```

mod mailable;
mod mailer;
pub mod markdown;
mod message;
mod theme;
mod transport;

pub use mailable::{Body, Component, Mailable};
pub use mailer::{Mailer, PendingMail};
pub use message::{Address, Attachment, AttachmentSource, Message};
pub use transport::{LogTransport, Outbox, Transport};

use crate::view::ViewError;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Error rendering email view [{view}]: {source}")]
    View {
        view: String,
        #[source]
        source: ViewError,
    },

    #[error("Invalid email address: {0:?}")]
    InvalidAddress(String),

    #[error("Message has no sender and no default from address is configured")]
    MissingSender,

    #[error("Message has no recipients")]
    NoRecipients,

    #[error("Mail transport failed: {0}")]
    Transport(String),
}

pub type MailResult<T> = Result<T, MailError>;
