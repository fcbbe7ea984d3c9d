//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (status codes, queue sizes)
//! - Validate shapes (base path, word separator, addresses, time format)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use chrono::format::{Item, StrftimeItems};
use thiserror::Error;

use crate::config::schema::RouterConfig;

/// One rejected setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every semantic constraint of `config`.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let base = &config.server.base_path;
    if !base.starts_with('/') || !base.ends_with('/') {
        errors.push(ValidationError::new(
            "server.base_path",
            format!("{base:?} must start and end with '/'"),
        ));
    }
    check_address(&mut errors, "server.bind_address", &config.server.bind_address);
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than 0"));
    }
    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::new("server.max_body_bytes", "must be greater than 0"));
    }

    let sep = &config.routing.word_separator;
    if sep.is_empty() {
        errors.push(ValidationError::new("routing.word_separator", "must not be empty"));
    } else if sep.contains('/') || sep.chars().any(|c| c.is_uppercase()) {
        errors.push(ValidationError::new(
            "routing.word_separator",
            format!("{sep:?} must not contain '/' or uppercase letters"),
        ));
    }

    let status = &config.status;
    for (field, code) in [
        ("status.request_error", status.request_error),
        ("status.internal_error", status.internal_error),
        ("status.unauthorized", status.unauthorized),
        ("status.not_found", status.not_found),
    ] {
        if !(100..=599).contains(&code) {
            errors.push(ValidationError::new(field, format!("{code} is not a valid HTTP status")));
        }
    }

    let logging = &config.logging;
    if logging.queue_capacity == 0 {
        errors.push(ValidationError::new("logging.queue_capacity", "must be greater than 0"));
    }
    if logging.workers == 0 {
        errors.push(ValidationError::new("logging.workers", "must be greater than 0"));
    }
    if StrftimeItems::new(&logging.time_format).any(|item| matches!(item, Item::Error)) {
        errors.push(ValidationError::new(
            "logging.time_format",
            format!("{:?} is not a valid strftime format", logging.time_format),
        ));
    }

    if config.metrics.enabled {
        check_address(&mut errors, "metrics.address", &config.metrics.address);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("{value:?} is not a socket address")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(config: &RouterConfig) -> Vec<&'static str> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RouterConfig::default()).is_ok());
    }

    #[test]
    fn test_base_path_shape() {
        let mut config = RouterConfig::default();
        config.server.base_path = "/api".to_string();
        assert_eq!(fields(&config), vec!["server.base_path"]);

        config.server.base_path = "/api/v1/".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_separator_rules() {
        let mut config = RouterConfig::default();
        config.routing.word_separator = String::new();
        assert_eq!(fields(&config), vec!["routing.word_separator"]);

        config.routing.word_separator = "/".to_string();
        assert_eq!(fields(&config), vec!["routing.word_separator"]);

        config.routing.word_separator = "X".to_string();
        assert_eq!(fields(&config), vec!["routing.word_separator"]);

        config.routing.word_separator = "-".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = RouterConfig::default();
        config.status.not_found = 42;
        config.status.internal_error = 600;
        config.logging.queue_capacity = 0;
        config.logging.time_format = "%Q".to_string();
        config.server.bind_address = "localhost".to_string();
        config.metrics.enabled = true;
        config.metrics.address = "nowhere".to_string();

        assert_eq!(
            fields(&config),
            vec![
                "server.bind_address",
                "status.internal_error",
                "status.not_found",
                "logging.queue_capacity",
                "logging.time_format",
                "metrics.address",
            ]
        );
    }
}
