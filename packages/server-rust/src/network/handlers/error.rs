//! Error responses for the HTTP transport.
//!
//! A failed call answers with the classified status, an `X-Esp-Error` header
//! and a `{"error": "..."}` JSON body. Both carry the error's display text;
//! the header percent-encodes what a header value cannot hold.

use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::service::{classify, OperationError};

/// Error text, percent-encoded outside visible ASCII. `%` itself is encoded
/// too, so `urlencoding::decode` recovers the text exactly.
pub const ERROR_HEADER: HeaderName = HeaderName::from_static("x-esp-error");

#[derive(Debug)]
pub struct HttpError(pub OperationError);

impl From<OperationError> for HttpError {
    fn from(e: OperationError) -> Self {
        Self(e)
    }
}

fn header_value(message: &str) -> HeaderValue {
    let mut encoded = String::with_capacity(message.len());
    let mut buf = [0u8; 4];
    for c in message.chars() {
        if c == ' ' || (c.is_ascii_graphic() && c != '%') {
            encoded.push(c);
        } else {
            encoded.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    HeaderValue::from_str(&encoded).unwrap_or_else(|_| HeaderValue::from_static("error"))
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = classify(Some(&self.0));
        let message = self.0.to_string();

        let mut response = (status, Json(json!({ "error": message }))).into_response();
        response
            .headers_mut()
            .insert(ERROR_HEADER, header_value(&message));
        response
    }
}
