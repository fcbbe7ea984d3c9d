//! Per-request data handed to route handlers.
//!
//! # Responsibilities
//! - Carry the resolved id, path segments and gap segments
//! - Expose the request line, headers, query and body
//! - Collect the response data and status set by the handler
//!
//! # Design Decisions
//! - One context per request, owned by the dispatching task
//! - Failure constructors use the configured default status codes

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::http::{request::Parts, HeaderMap, Method, Uri, Version};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::RouterConfig;
use crate::error::{AppError, HandlerResult, InternalError, RequestError};
use crate::http::request::X_REQUEST_ID;
use crate::routing::ResolvedPath;

/// Request context passed to every handler.
#[derive(Debug, Clone)]
pub struct Context {
    /// Id parsed from the path, 0 when the route has none.
    pub id: i64,
    /// Caller id from the user-id parser, 0 when unknown.
    pub user_id: i64,
    /// Response status for a successful handler. Defaults to 200.
    pub status: u16,
    /// Response payload, serialized under `"data"`.
    pub data: Option<serde_json::Value>,
    /// Extra response headers.
    pub response_headers: HeaderMap,

    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    body: Bytes,
    segments: Vec<String>,
    gaps: Vec<String>,
    written: usize,
    config: Arc<RouterConfig>,
}

impl Context {
    pub fn new(
        parts: Parts,
        body: Bytes,
        resolved: ResolvedPath,
        config: Arc<RouterConfig>,
    ) -> Self {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        Self {
            id: resolved.id,
            user_id: 0,
            status: 200,
            data: None,
            response_headers: HeaderMap::new(),
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            remote_addr,
            body,
            segments: resolved.segments,
            gaps: resolved.gaps,
            written: 0,
            config,
        }
    }

    /// A context with no resolved path, empty body and default configuration.
    pub fn for_parts(parts: Parts) -> Self {
        Self::new(
            parts,
            Bytes::new(),
            ResolvedPath::default(),
            Arc::new(RouterConfig::default()),
        )
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Raw path segments after the base path; index 0 is the resource.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn path_segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// Gap segments of the matched resource.
    pub fn gaps(&self) -> &[String] {
        &self.gaps
    }

    /// Bytes of the rendered response body, known once the handler returned.
    pub fn written(&self) -> usize {
        self.written
    }

    pub(crate) fn set_written(&mut self, written: usize) {
        self.written = written;
    }

    /// First value of a query parameter.
    pub fn query(&self, name: &str) -> Option<String> {
        let query = self.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Decode the body as JSON. Malformed bodies are request errors.
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, Box<dyn AppError>> {
        serde_json::from_slice(&self.body).map_err(|e| self.request_error(e.to_string()))
    }

    /// Set the response payload.
    pub fn set_data<T: Serialize>(&mut self, data: &T) -> HandlerResult {
        let value = serde_json::to_value(data).map_err(|e| self.internal_error(e))?;
        self.data = Some(value);
        Ok(())
    }

    /// A client error with the configured request-error status.
    pub fn request_error(&self, message: impl Into<String>) -> Box<dyn AppError> {
        Box::new(RequestError::with_status(
            message,
            self.config.status.request_error,
        ))
    }

    /// An internal error with the configured internal-error status.
    pub fn internal_error(
        &self,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Box<dyn AppError> {
        Box::new(InternalError::with_status(
            cause,
            self.config.status.internal_error,
        ))
    }

    /// `"Unauthorized"` with the configured unauthorized status.
    pub fn unauthorized(&self) -> Box<dyn AppError> {
        Box::new(RequestError::with_status(
            "Unauthorized",
            self.config.status.unauthorized,
        ))
    }
}
