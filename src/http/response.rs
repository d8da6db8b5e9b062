//! Response construction helpers shared by the admin surface and REST resources.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const APPLICATION_JSON: &str = "application/json";

/// A response with an explicit status and content type.
pub fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Body>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(content_type))],
        body.into(),
    )
        .into_response()
}

pub fn text(status: StatusCode, body: impl Into<Body>) -> Response {
    with_body(status, TEXT_PLAIN, body)
}

pub fn json(status: StatusCode, body: impl Into<Body>) -> Response {
    with_body(status, APPLICATION_JSON, body)
}

pub fn html(status: StatusCode, body: impl Into<Body>) -> Response {
    with_body(status, TEXT_HTML, body)
}
