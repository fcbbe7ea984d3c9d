//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::stack::DEFAULT_FRAME_FORMAT;
use crate::error::{INTERNAL_ERROR_STATUS, NOT_FOUND_STATUS, REQUEST_ERROR_STATUS, UNAUTHORIZED_STATUS};
use crate::observability::error_log::{DEFAULT_LINE_FORMAT, DEFAULT_TIME_FORMAT};
use crate::routing::naming::DEFAULT_WORD_SEPARATOR;

/// Root configuration for the resource router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener and request handling.
    pub server: ServerConfig,
    /// Route table construction.
    pub routing: RoutingConfig,
    /// Default status codes.
    pub status: StatusConfig,
    /// Diagnostic and error logging.
    pub logging: LoggingConfig,
    /// Prometheus exporter.
    pub metrics: MetricsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
    /// Prefix every route is served under. Starts and ends with `/`.
    pub base_path: String,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
    /// Header holding the caller's numeric user id.
    pub user_id_header: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            base_path: "/".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            user_id_header: None,
        }
    }
}

/// Route table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Inserted before every inner uppercase letter of a name.
    pub word_separator: String,
    /// Fail the build when two methods map to the same route key.
    pub reject_duplicate_routes: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            word_separator: DEFAULT_WORD_SEPARATOR.to_string(),
            reject_duplicate_routes: false,
        }
    }
}

/// Default status codes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusConfig {
    pub request_error: u16,
    pub internal_error: u16,
    pub unauthorized: u16,
    pub not_found: u16,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            request_error: REQUEST_ERROR_STATUS,
            internal_error: INTERNAL_ERROR_STATUS,
            unauthorized: UNAUTHORIZED_STATUS,
            not_found: NOT_FOUND_STATUS,
        }
    }
}

/// Where error log lines of one kind are written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    Off,
    Stderr,
    Stdout,
    /// Forward to the tracing subscriber.
    Tracing,
    /// Append to a file.
    File(PathBuf),
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`.
    pub level: String,
    /// Sink for request error lines.
    pub request_errors: LogTarget,
    /// Sink for internal error lines.
    pub internal_errors: LogTarget,
    /// Error line template.
    pub line_format: String,
    /// strftime format of the `{time}` field.
    pub time_format: String,
    /// Template of one stack frame.
    pub frame_format: String,
    /// Records held before the oldest is dropped.
    pub queue_capacity: usize,
    /// Background writer tasks.
    pub workers: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            request_errors: LogTarget::Off,
            internal_errors: LogTarget::Stderr,
            line_format: DEFAULT_LINE_FORMAT.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            frame_format: DEFAULT_FRAME_FORMAT.to_string(),
            queue_capacity: 1024,
            workers: 2,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable metrics endpoint.
    pub enabled: bool,
    /// Metrics endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}
