//! Axum adapter
//!
//! Every request goes to a single fallback handler that converts it into a
//! [`Request`], runs [`App::handle`] on the blocking pool and converts the
//! [`Response`] back.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{FromRequest, Query, State},
    http::{header, request::Parts, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Form, Router,
};
use tracing::{error, info, warn};

use crate::foundation::App;
use crate::http::{Method, Request, Response};
use crate::routing::error_response;

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

type Pairs = Vec<(String, String)>;

/// Build the axum router serving `app`.
pub fn router(app: Arc<App>) -> Router {
    Router::new().fallback(dispatch).with_state(app)
}

/// Serve `app` on `addr` until the process stops.
pub async fn serve(app: App, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, app = %app.settings().app.name, "listening");
    axum::serve(listener, router(Arc::new(app))).await
}

async fn dispatch(State(app): State<Arc<App>>, request: axum::extract::Request) -> axum::response::Response {
    let (parts, body) = request.into_parts();

    let method: Method = match parts.method.as_str().parse::<Method>() {
        Ok(method) => method,
        Err(e) => {
            warn!(method = %parts.method, "unsupported request method");
            return into_axum(error_response(app.views(), e.status(), ""));
        }
    };

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "request body rejected");
            return into_axum(error_response(app.views(), 400, ""));
        }
    };

    let request = into_request(method, &parts, bytes).await;
    let handled = {
        let app = Arc::clone(&app);
        tokio::task::spawn_blocking(move || app.handle(request)).await
    };
    match handled {
        Ok(response) => into_axum(response),
        Err(e) => {
            error!(error = %e, "request handler panicked");
            into_axum(error_response(app.views(), 500, ""))
        }
    }
}

async fn into_request(method: Method, parts: &Parts, bytes: Bytes) -> Request {
    let mut request = Request::new(method, parts.uri.path());

    if let Ok(Query(pairs)) = Query::<Pairs>::try_from_uri(&parts.uri) {
        for (key, value) in pairs {
            request = request.with_query(key, value);
        }
    }

    for (name, value) in &parts.headers {
        match value.to_str() {
            Ok(value) => request = request.with_header(name.as_str(), value),
            Err(_) => warn!(header = %name, "ignoring non-text request header"),
        }
    }

    let is_form = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));
    if is_form {
        for (key, value) in decode_form(bytes.clone()).await {
            request = request.with_form(key, value);
        }
    }

    request.with_body(String::from_utf8_lossy(&bytes).into_owned())
}

/// Decode an urlencoded body with axum's form extractor.
async fn decode_form(bytes: Bytes) -> Pairs {
    let built = axum::http::Request::builder()
        .method(axum::http::Method::POST)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(bytes));
    let request = match built {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "could not rebuild form request");
            return Pairs::new();
        }
    };
    match Form::<Pairs>::from_request(request, &()).await {
        Ok(Form(pairs)) => pairs,
        Err(e) => {
            warn!(error = %e, "malformed form body");
            Pairs::new()
        }
    }
}

fn into_axum(response: Response) -> axum::response::Response {
    let status = StatusCode::from_u16(response.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let headers = response.headers().to_vec();
    let mut out = (status, response.into_body()).into_response();
    for (name, value) in headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().insert(name, value);
            }
            _ => warn!(header = %name, "dropping invalid response header"),
        }
    }
    out
}
