//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request handling limits.
    pub http: HttpConfig,

    /// Directories served as static files.
    pub static_files: Vec<StaticMount>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one request, in seconds.
    pub request_secs: u64,

    /// Time allowed to drain in-flight requests on shutdown, in seconds.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Maximum buffered request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// A directory mounted under a URL prefix.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StaticMount {
    /// URL prefix, e.g. "/assets".
    pub prefix: String,

    /// Filesystem directory to serve from.
    pub root: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Where log events go.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogChannel {
    /// Standard output.
    #[default]
    Console,
    /// Rotating JSON files.
    File,
    /// Every channel listed in `stack`.
    Stack,
}

/// How often the file channel starts a new file.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConsoleChannelConfig {
    /// Overrides `log_level` for this channel.
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FileChannelConfig {
    /// Overrides `log_level` for this channel.
    pub level: Option<String>,

    /// Directory holding the log files.
    pub directory: String,

    /// File name prefix; files are named `<prefix>.<date>.log`.
    pub prefix: String,

    pub rotation: LogRotation,

    /// Rotated files to keep; 0 keeps all of them.
    pub max_files: usize,
}

impl Default for FileChannelConfig {
    fn default() -> Self {
        Self {
            level: None,
            directory: "./logs".to_string(),
            prefix: "switchyard".to_string(),
            rotation: LogRotation::Daily,
            max_files: 7,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Console output format.
    pub log_format: LogFormat,

    /// Channel that receives log events.
    pub log_channel: LogChannel,

    pub console: ConsoleChannelConfig,

    pub file: FileChannelConfig,

    /// Channels fanned out to when `log_channel = "stack"`.
    pub stack: Vec<LogChannel>,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            log_channel: LogChannel::Console,
            console: ConsoleChannelConfig::default(),
            file: FileChannelConfig::default(),
            stack: Vec::new(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.http.max_body_bytes, 2 * 1024 * 1024);
        assert!(config.static_files.is_empty());
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_sections() {
        let config: ServerConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:3000"

            [observability]
            log_format = "json"

            [[static_files]]
            prefix = "/assets"
            root = "./public"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:3000");
        assert_eq!(config.timeouts.shutdown_secs, 15);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(
            config.static_files,
            vec![StaticMount {
                prefix: "/assets".into(),
                root: "./public".into(),
            }]
        );
    }

    #[test]
    fn test_log_channels() {
        let config: ServerConfig = toml::from_str(
            r#"
            [observability]
            log_channel = "stack"
            stack = ["console", "file"]

            [observability.file]
            level = "warn"
            directory = "/var/log/switchyard"
            rotation = "hourly"
            "#,
        )
        .unwrap();

        let observability = config.observability;
        assert_eq!(observability.log_channel, LogChannel::Stack);
        assert_eq!(observability.stack, vec![LogChannel::Console, LogChannel::File]);
        assert_eq!(observability.file.level.as_deref(), Some("warn"));
        assert_eq!(observability.file.rotation, LogRotation::Hourly);
        assert_eq!(observability.file.prefix, "switchyard");
        assert_eq!(observability.file.max_files, 7);
        assert!(observability.console.level.is_none());
    }
}
