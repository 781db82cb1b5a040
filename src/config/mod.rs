//! Configuration module for Maniac.
//!
//! Handles the `maniac.toml` file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, AppSettings, DatabaseSettings, MailSettings, Settings, SettingsError,
    SettingsResult, ViewSettings,
};
