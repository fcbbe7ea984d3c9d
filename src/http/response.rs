//! Response rendering.
//!
//! # Responsibilities
//! - Wrap handler output in the `{"data":...,"error":...}` envelope
//! - Produce the default not-found response
//! - Convert rendered replies into axum responses
//!
//! # Design Decisions
//! - Bodies are rendered before the response is returned, so the byte count
//!   is known when a failure is logged
//! - Every reply is JSON and never cached

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
const FALLBACK_BODY: &[u8] = br#"{"data":null,"error":"InternalError"}"#;

/// Message of the default not-found response.
pub const NOT_FOUND_MESSAGE: &str = "NotFound";

/// JSON body of every reply.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub data: Option<&'a serde_json::Value>,
    pub error: Option<&'a str>,
}

/// Serialize an envelope.
pub fn render_envelope(data: Option<&serde_json::Value>, error: Option<&str>) -> Vec<u8> {
    serde_json::to_vec(&Envelope { data, error }).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize response envelope");
        FALLBACK_BODY.to_vec()
    })
}

/// A fully rendered response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn new(status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// `{"data":null,"error":"NotFound"}` with the given status.
    pub fn not_found(status: u16) -> Self {
        Self::new(
            status,
            HeaderMap::new(),
            render_envelope(None, Some(NOT_FOUND_MESSAGE)),
        )
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        for (name, value) in self.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes() {
        assert_eq!(
            render_envelope(None, Some("NotFound")),
            br#"{"data":null,"error":"NotFound"}"#.to_vec()
        );
        let data = serde_json::json!({"name": "ann"});
        assert_eq!(
            render_envelope(Some(&data), None),
            br#"{"data":{"name":"ann"},"error":null}"#.to_vec()
        );
    }

    #[test]
    fn test_not_found_reply() {
        let response = Reply::not_found(404).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            CONTENT_TYPE_JSON
        );
        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-cache");
    }

    #[test]
    fn test_reply_keeps_handler_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-total", HeaderValue::from_static("3"));
        let response = Reply::new(201, headers, b"{}".to_vec()).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-total").unwrap(), "3");
    }
}
