//! The mailable builder.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};

use super::message::{Address, Attachment, AttachmentSource};

/// A content block of a component mail, rendered in order by the theme.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Component {
    Greeting(String),
    Line(String),
    Action { text: String, url: String },
    /// Raw HTML, not escaped by the theme.
    Panel(String),
    Table {
        data: Vec<Map<String, Value>>,
        columns: Vec<String>,
    },
    Signature(String),
    Footer(String),
}

/// How the HTML body is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Only the content components, wrapped in the theme.
    Components,
    /// A Niac view rendered as the HTML body.
    View(String),
    /// A Niac view producing Markdown, converted and wrapped in the theme.
    Markdown(String),
}

/// A mail message under construction.
///
/// Components and a view can be combined: the view sees the components as
/// `$components`.
///
/// ```ignore
/// let welcome = Mailable::new()
///     .to(("ada@example.com", "Ada"))
///     .subject("Welcome!")
///     .greeting("Hello Ada!")
///     .line("Thanks for signing up.")
///     .action("Open dashboard", "https://example.com/dashboard");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Mailable {
    pub(crate) from: Option<Address>,
    pub(crate) to: Vec<Address>,
    pub(crate) cc: Vec<Address>,
    pub(crate) bcc: Vec<Address>,
    pub(crate) reply_to: Vec<Address>,
    pub(crate) subject: Option<String>,
    pub(crate) body: Body,
    pub(crate) text_view: Option<String>,
    pub(crate) data: Map<String, Value>,
    pub(crate) components: Vec<Component>,
    pub(crate) attachments: Vec<Attachment>,
}

impl Default for Mailable {
    fn default() -> Self {
        Self {
            from: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: Vec::new(),
            subject: None,
            body: Body::Components,
            text_view: None,
            data: Map::new(),
            components: Vec::new(),
            attachments: Vec::new(),
        }
    }
}

impl Mailable {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Envelope
    // ========================================================================

    #[must_use]
    pub fn from(mut self, address: impl Into<Address>) -> Self {
        self.from = Some(address.into());
        self
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

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    // ========================================================================
    // Body
    // ========================================================================

    /// Render the HTML body from a Niac view.
    #[must_use]
    pub fn view(mut self, name: impl Into<String>) -> Self {
        self.body = Body::View(name.into());
        self
    }

    /// Render Markdown from a Niac view, then wrap it in the theme.
    #[must_use]
    pub fn markdown(mut self, name: impl Into<String>) -> Self {
        self.body = Body::Markdown(name.into());
        self
    }

    /// Render the plain-text body from a Niac view.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>) -> Self {
        self.text_view = Some(name.into());
        self
    }

    /// Add a view variable. Later values replace earlier ones.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.data.insert(key.into(), value);
        self
    }

    /// Merge every key of a JSON object into the view data.
    #[must_use]
    pub fn with_all(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data.extend(map);
        }
        self
    }

    #[must_use]
    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(Attachment {
            source: AttachmentSource::Path(path.into()),
            name: None,
            mime: None,
        });
        self
    }

    #[must_use]
    pub fn attach_data(mut self, data: impl Into<Vec<u8>>, name: impl Into<String>, mime: Option<&str>) -> Self {
        self.attachments.push(Attachment {
            source: AttachmentSource::Data(data.into()),
            name: Some(name.into()),
            mime: Some(mime.unwrap_or("application/octet-stream").to_string()),
        });
        self
    }

    // ========================================================================
    // Content components
    // ========================================================================

    #[must_use]
    pub fn greeting(self, greeting: impl Into<String>) -> Self {
        self.component(Component::Greeting(greeting.into()))
    }

    #[must_use]
    pub fn line(self, text: impl Into<String>) -> Self {
        self.component(Component::Line(text.into()))
    }

    /// A call-to-action button.
    #[must_use]
    pub fn action(self, text: impl Into<String>, url: impl Into<String>) -> Self {
        self.component(Component::Action {
            text: text.into(),
            url: url.into(),
        })
    }

    #[must_use]
    pub fn panel(self, html: impl Into<String>) -> Self {
        self.component(Component::Panel(html.into()))
    }

    /// A table of JSON-object rows. With no columns, the first row's keys
    /// are used.
    #[must_use]
    pub fn table(
        self,
        rows: impl IntoIterator<Item = Value>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let data: Vec<Map<String, Value>> = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        let mut columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            columns = data.first().map(|row| row.keys().cloned().collect()).unwrap_or_default();
        }
        self.component(Component::Table { data, columns })
    }

    #[must_use]
    pub fn signature(self, signature: impl Into<String>) -> Self {
        self.component(Component::Signature(signature.into()))
    }

    #[must_use]
    pub fn footer(self, footer: impl Into<String>) -> Self {
        self.component(Component::Footer(footer.into()))
    }

    fn component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn recipients(&self) -> &[Address] {
        &self.to
    }

    pub fn subject_line(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// View data plus `components` and `subject`.
    pub fn view_data(&self) -> Value {
        let mut data = self.data.clone();
        data.insert(
            "components".to_string(),
            serde_json::to_value(&self.components).unwrap_or(Value::Null),
        );
        data.insert(
            "subject".to_string(),
            self.subject.clone().map(Value::String).unwrap_or(Value::Null),
        );
        Value::Object(data)
    }
}
