//! Delivery seam for rendered messages.
//!
//! Network transports (SMTP, sendmail) live outside this crate; they plug in
//! by implementing [`Transport`].

use std::sync::{Arc, Mutex};

use tracing::info;

use super::message::{Address, Message};
use super::{MailError, MailResult};

pub trait Transport: Send + Sync {
    fn deliver(&self, message: &Message) -> MailResult<()>;
}

/// Logs each message at `info` and drops it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn deliver(&self, message: &Message) -> MailResult<()> {
        let to: Vec<String> = message.recipients().map(Address::to_string).collect();
        info!(
            to = ?to,
            subject = message.subject.as_deref().unwrap_or(""),
            html_bytes = message.html.as_ref().map_or(0, String::len),
            "Mail delivered to log"
        );
        Ok(())
    }
}

/// Keeps delivered messages in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of every message delivered so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return every stored message.
    pub fn take(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|mut m| std::mem::take(&mut *m))
            .unwrap_or_default()
    }
}

impl Transport for Outbox {
    fn deliver(&self, message: &Message) -> MailResult<()> {
        self.messages
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".to_string()))?
            .push(message.clone());
        Ok(())
    }
}
