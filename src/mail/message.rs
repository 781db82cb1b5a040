//! Rendered messages and their addresses.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::{MailError, MailResult};

/// A mailbox, optionally with a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub address: String,
    pub name: Option<String>,
}

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    pub fn named(address: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            address: address.into(),
            name: (!name.is_empty()).then_some(name),
        }
    }

    /// Reject anything that is not `local@domain` with no spaces or angle
    /// brackets.
    pub fn validate(&self) -> MailResult<()> {
        let valid = match self.address.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !self
                        .address
                        .contains(|c: char| c.is_whitespace() || c == '<' || c == '>')
            }
            None => false,
        };
        if valid {
            Ok(())
        } else {
            Err(MailError::InvalidAddress(self.address.clone()))
        }
    }
}

impl fmt::Display for Address {
    /// `"Ada" <ada@example.com>`, or the bare address.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "\"{}\" <{}>", name.replace('"', "\\\""), self.address),
            None => f.write_str(&self.address),
        }
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Address::new(address)
    }
}

impl From<String> for Address {
    fn from(address: String) -> Self {
        Address::new(address)
    }
}

impl From<(&str, &str)> for Address {
    fn from((address, name): (&str, &str)) -> Self {
        Address::named(address, name)
    }
}

/// Where an attachment's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentSource {
    Path(PathBuf),
    Data(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub source: AttachmentSource,
    pub name: Option<String>,
    pub mime: Option<String>,
}

/// A fully rendered message, ready for a [`Transport`](super::Transport).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Message {
    pub from: Option<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub reply_to: Vec<Address>,
    pub subject: Option<String>,
    pub html: Option<String>,
    pub text: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Every address the message is delivered to.
    pub fn recipients(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    /// Check the sender, every recipient and that there is at least one.
    pub fn validate(&self) -> MailResult<()> {
        let from = self.from.as_ref().ok_or(MailError::MissingSender)?;
        from.validate()?;
        if self.recipients().next().is_none() {
            return Err(MailError::NoRecipients);
        }
        self.recipients()
            .chain(&self.reply_to)
            .try_for_each(Address::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display() {
        assert_eq!(Address::new("ada@example.com").to_string(), "ada@example.com");
        assert_eq!(
            Address::from(("ada@example.com", "Ada \"Countess\" Lovelace")).to_string(),
            r#""Ada \"Countess\" Lovelace" <ada@example.com>"#
        );
        assert_eq!(Address::named("ada@example.com", "").name, None);
    }

    #[test]
    fn test_address_validation() {
        for ok in ["ada@example.com", "a.b+tag@mail.example.org"] {
            assert!(Address::new(ok).validate().is_ok(), "{}", ok);
        }
        for bad in ["", "ada", "@example.com", "ada@", "a@b@c", "ada lovelace@example.com", "<ada@example.com>"] {
            assert!(
                matches!(Address::new(bad).validate(), Err(MailError::InvalidAddress(a)) if a == bad),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_message_validation() {
        let mut message = Message::default();
        assert!(matches!(message.validate(), Err(MailError::MissingSender)));

        message.from = Some(Address::new("app@example.com"));
        assert!(matches!(message.validate(), Err(MailError::NoRecipients)));

        message.bcc.push(Address::new("audit@example.com"));
        assert!(message.validate().is_ok());

        message.reply_to.push(Address::new("not an address"));
        assert!(matches!(message.validate(), Err(MailError::InvalidAddress(_))));
    }
}
