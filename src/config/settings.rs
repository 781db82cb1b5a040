//! TOML-based configuration for Maniac.
//!
//! Supports a config file (maniac.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [app]
//! name = "Maniac"
//! url = "https://example.com"
//! debug = false
//! asset_url = "https://cdn.example.com"
//!
//! [database]
//! driver = "sqlite"
//! path = "${DB_PATH}"
//!
//! [view]
//! paths = ["resources/views"]
//! cache_path = "storage/cache/views"
//! mail_paths = ["resources/views/mail"]
//!
//! [mail]
//! from_address = "hello@example.com"
//! from_name = "Maniac"
//! theme = "default"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize settings: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub view: ViewSettings,
    pub mail: MailSettings,
}

/// Application settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppSettings {
    /// Application name, shown in error pages and available to views.
    pub name: String,

    /// Base URL used by the `url` view helper.
    pub url: String,

    /// Debug mode: always recompile views and let render errors propagate.
    pub debug: bool,

    /// Base URL for `@asset`; falls back to `url` when unset.
    pub asset_url: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "Maniac".to_string(),
            url: "http://localhost".to_string(),
            debug: false,
            asset_url: None,
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database driver (sqlite).
    pub driver: String,

    /// Database file, or `:memory:`.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            driver: "sqlite".to_string(),
            path: "database/database.sqlite".to_string(),
        }
    }
}

/// View engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewSettings {
    /// View roots, searched in order.
    pub paths: Vec<PathBuf>,

    /// Directory for compiled views.
    pub cache_path: PathBuf,

    /// Roots for the `mail::` namespace.
    pub mail_paths: Vec<PathBuf>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from("resources/views")],
            cache_path: PathBuf::from("storage/cache/views"),
            mail_paths: vec![PathBuf::from("resources/views/mail")],
        }
    }
}

/// Mail rendering settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MailSettings {
    /// Sender used when a mailable sets none.
    pub from_address: Option<String>,

    pub from_name: Option<String>,

    /// Theme wrapping component and Markdown mail (`mail::themes.{theme}`).
    pub theme: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            from_address: None,
            from_name: None,
            theme: "default".to_string(),
        }
    }
}

impl std::str::FromStr for Settings {
    type Err = SettingsError;

    /// Parse settings from TOML text, expanding `${VAR}` in string values.
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let table: toml::Table = toml::from_str(content)?;
        let mut raw = toml::Value::Table(table);
        expand_value(&mut raw)?;
        Ok(raw.try_into()?)
    }
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// Relative paths in the file resolve against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut settings: Settings = content.parse()?;
        if let Some(base) = path.parent() {
            settings.resolve_paths(base);
        }
        Ok(settings)
    }

    /// Load settings from an explicit path or the default locations.
    ///
    /// Searches in order:
    /// 1. The explicit path, if given
    /// 2. Environment variable `MANIAC_CONFIG`
    /// 3. `./maniac.toml`
    /// 4. `~/.config/maniac/config.toml`
    pub fn load(path: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        if let Ok(path) = env::var("MANIAC_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("maniac.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("maniac").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Make relative paths absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &PathBuf| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.clone()
            }
        };

        self.view.paths = self.view.paths.iter().map(resolve).collect();
        self.view.mail_paths = self.view.mail_paths.iter().map(resolve).collect();
        self.view.cache_path = resolve(&self.view.cache_path);

        if self.database.path != ":memory:" {
            self.database.path = resolve(&PathBuf::from(&self.database.path))
                .to_string_lossy()
                .into_owned();
        }
    }

    /// Look up a dotted key such as `app.name`.
    pub fn lookup(&self, key: &str) -> Option<serde_json::Value> {
        let mut current = serde_json::to_value(self).ok()?;
        for part in key.split('.') {
            current = current.get(part)?.clone();
        }
        Some(current)
    }

    /// Render the effective settings as TOML.
    pub fn to_toml(&self) -> SettingsResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Expand `${VAR}` references in every string of a parsed document.
fn expand_value(value: &mut toml::Value) -> SettingsResult<()> {
    match value {
        toml::Value::String(s) => {
            *s = expand_env_vars(s)?;
        }
        toml::Value::Array(items) => {
            for item in items {
                expand_value(item)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                expand_value(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` syntax. A lone `$` is kept as is.
pub fn expand_env_vars(s: &str) -> SettingsResult<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
            let value =
                env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
            result.push_str(&value);
        } else {
            result.push(c);
        }
    }

    Ok(result)
}
