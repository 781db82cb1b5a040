//! HTTP request and response types.
//!
//! These are plain values with no transport attached; the optional `server`
//! feature adapts them to axum.

mod request;
mod response;

pub(crate) use request::normalize_path;
pub use request::Request;
pub use response::{reason_phrase, Response};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// An explicit abort with a status code, e.g. 404 or 419.
    #[error("{status} {message}")]
    Status { status: u16, message: String },

    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl HttpError {
    pub fn abort(status: u16, message: impl Into<String>) -> Self {
        HttpError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            HttpError::UnsupportedMethod(_) => 405,
            HttpError::Status { status, .. } => *status,
            HttpError::InvalidJson(_) => 400,
        }
    }
}

pub type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(HttpError::UnsupportedMethod(s.to_string())),
        }
    }
}
