//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect conflicting static mounts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: ServerConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{LogChannel, ServerConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check semantic constraints, collecting every violation.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.http.max_body_bytes == 0 {
        errors.push(ValidationError::new("http.max_body_bytes", "must be greater than 0"));
    }

    let mut prefixes = HashSet::new();
    for (i, mount) in config.static_files.iter().enumerate() {
        if !mount.prefix.starts_with('/') {
            errors.push(ValidationError::new(
                format!("static_files[{i}].prefix"),
                "must start with '/'",
            ));
        }
        if mount.root.is_empty() {
            errors.push(ValidationError::new(format!("static_files[{i}].root"), "must not be empty"));
        }
        if !prefixes.insert(mount.prefix.trim_end_matches('/')) {
            errors.push(ValidationError::new(
                format!("static_files[{i}].prefix"),
                format!("'{}' is mounted more than once", mount.prefix),
            ));
        }
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    let logging = &config.observability;
    let channel_levels = [
        ("observability.console.level", &logging.console.level),
        ("observability.file.level", &logging.file.level),
    ];
    for (field, level) in channel_levels {
        if let Some(level) = level {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                errors.push(ValidationError::new(field, format!("unknown level '{level}'")));
            }
        }
    }

    let uses = |channel: LogChannel| {
        logging.log_channel == channel || (logging.log_channel == LogChannel::Stack && logging.stack.contains(&channel))
    };
    if logging.log_channel == LogChannel::Stack {
        if logging.stack.is_empty() {
            errors.push(ValidationError::new("observability.stack", "must list at least one channel"));
        }
        if logging.stack.contains(&LogChannel::Stack) {
            errors.push(ValidationError::new("observability.stack", "a stack cannot contain itself"));
        }
    }
    if uses(LogChannel::File) {
        if logging.file.directory.is_empty() {
            errors.push(ValidationError::new("observability.file.directory", "must not be empty"));
        }
        if logging.file.prefix.is_empty() {
            errors.push(ValidationError::new("observability.file.prefix", "must not be empty"));
        }
    }

    if config.observability.metrics_enabled && config.observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StaticMount;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.request_secs = 0;
        config.observability.log_level = "loud".into();
        config.static_files = vec![
            StaticMount {
                prefix: "/assets".into(),
                root: "./a".into(),
            },
            StaticMount {
                prefix: "/assets/".into(),
                root: "./b".into(),
            },
        ];

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "timeouts.request_secs",
                "static_files[1].prefix",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "bad".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_log_channel_rules() {
        let mut config = ServerConfig::default();
        config.observability.log_channel = LogChannel::Stack;
        config.observability.stack = vec![LogChannel::File, LogChannel::Stack];
        config.observability.file.prefix = String::new();
        config.observability.console.level = Some("chatty".into());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "observability.console.level",
                "observability.stack",
                "observability.file.prefix",
            ]
        );

        config.observability.stack.clear();
        config.observability.file.prefix = "app".into();
        config.observability.console.level = Some("debug".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].message, "must list at least one channel");
    }
}
