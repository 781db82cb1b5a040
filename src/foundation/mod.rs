//! Application context.
//!
//! An [`App`] owns everything a request needs: settings, the view engine,
//! the database handle, the router and the mail transport. It is built once
//! at startup and shared by reference; nothing here is global.
//!
//! # Example
//!
//! ```ignore
//! use maniac::foundation::App;
//! use maniac::http::{Request, Response};
//! use maniac::routing::Action;
//!
//! let mut app = App::from_settings(Settings::load(None)?)?.connect()?;
//! app.router_mut().get("/", Action::handler(|ctx| ctx.view("home", &json!({}))));
//! let response = app.handle(Request::get("/"));
//! ```

use std::sync::Arc;

use tracing::info;

use crate::config::{Settings, SettingsError};
use crate::db::{self, DbError, DbHandle};
use crate::http::{Request, Response};
use crate::mail::{LogTransport, Mailer, Transport};
use crate::notifications::{DatabaseChannel, MailChannel, NotificationSender};
use crate::routing::Router;
use crate::schema::Schema;
use crate::view::{NiacEngine, ViewError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Settings(#[from] SettingsError),

    #[error("View engine error: {0}")]
    View(#[from] ViewError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

pub type AppResult<T> = Result<T, AppError>;

pub struct App {
    settings: Settings,
    views: NiacEngine,
    db: Option<DbHandle>,
    router: Router,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("name", &self.settings.app.name)
            .field("views", &self.views)
            .field("database", &self.db.as_ref().map(|db| db.dialect()))
            .field("router", &self.router)
            .finish()
    }
}

impl App {
    /// An application around an existing view engine, with no database and
    /// no routes.
    pub fn new(settings: Settings, views: NiacEngine) -> Self {
        Self {
            settings,
            views,
            db: None,
            router: Router::new(),
            transport: Arc::new(LogTransport),
        }
    }

    /// Build the view engine described by `settings`. The database is not
    /// opened until [`connect`](Self::connect).
    pub fn from_settings(settings: Settings) -> AppResult<Self> {
        let views = NiacEngine::from_settings(&settings)?;
        Ok(Self::new(settings, views))
    }

    /// Open the `[database]` connection.
    pub fn connect(self) -> AppResult<Self> {
        let db = db::connect(&self.settings.database)?;
        info!(driver = %self.settings.database.driver, path = %self.settings.database.path, "database connected");
        Ok(self.with_database(db))
    }

    #[must_use]
    pub fn with_database(mut self, db: DbHandle) -> Self {
        self.db = Some(db);
        self
    }

    #[must_use]
    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Replace the mail transport, which logs messages by default.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn views(&self) -> &NiacEngine {
        &self.views
    }

    pub fn db(&self) -> Option<&DbHandle> {
        self.db.as_ref()
    }

    /// Schema builder over the application database.
    pub fn schema(&self) -> Option<Schema> {
        self.db.clone().map(Schema::new)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Mailer over the application views, `[mail]` settings and transport.
    pub fn mailer(&self) -> Mailer<'_> {
        Mailer::new(&self.views, &self.settings.mail, self.transport.as_ref())
    }

    /// Sender with the `mail` channel, plus `database` once connected.
    pub fn notifications(&self) -> NotificationSender<'_> {
        let mut sender = NotificationSender::new().with_channel("mail", MailChannel::new(self.mailer()));
        if let Some(db) = &self.db {
            sender.register_channel("database", DatabaseChannel::new(db.clone()));
        }
        sender
    }

    /// Route `request` and produce a response. Failures become error pages.
    pub fn handle(&self, request: Request) -> Response {
        self.router.handle(request, &self.views, self.db.as_ref())
    }
}
