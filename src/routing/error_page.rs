use serde_json::json;

use crate::http::Response;
use crate::view::{escape, NiacEngine};

/// Default message for an error status.
pub fn default_message(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        404 => "Page Not Found",
        419 => "Page Expired",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "An error occurred",
    }
}

/// The page used when no error view can be rendered.
pub fn fallback_html(status: u16, message: &str) -> String {
    let title = default_message(status);
    format!(
        "<!DOCTYPE html><html><head><title>{status} {title}</title></head><body><h1>{status} {title}</h1><p>{}</p></body></html>",
        escape(message)
    )
}

/// Render `errors.{status}`, then `errors.default`, then [`fallback_html`].
///
/// Error views receive `$error` with `code` and `message`.
pub fn error_response(views: &NiacEngine, status: u16, message: &str) -> Response {
    let message = if message.is_empty() {
        default_message(status)
    } else {
        message
    };
    let data = json!({ "error": { "code": status, "message": message } });
    let body = views
        .render_error_view(status, &data)
        .unwrap_or_else(|| fallback_html(status, message));
    Response::html(body).with_status(status)
}
