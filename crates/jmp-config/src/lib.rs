//! Shared configuration for the JSON Message Protocol daemon.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults are
//! overridden by a TOML file (`--config-path` or `JMP_CONFIG_PATH`), then by
//! `JMP_*` environment variables, and finally by command-line flags.

mod defaults;
mod logging;
mod endpoint;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_SCHEMA_DIRECTORY, DEFAULT_TCP_PORT,
    DEFAULT_WATCH_INTERVAL_MS, default_log_filter, default_log_filter_string, default_log_format,
    default_max_message_bytes, default_schema_directory, default_socket_endpoint,
    default_watch_interval_ms,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use endpoint::{EndpointParseError, EndpointPreparationError, SocketEndpoint};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "JMP")]
pub struct Config {
    /// Endpoint the daemon listens on.
    #[serde(default = "default_socket_endpoint")]
    #[ortho_config(default = default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// Root directory holding `<type>.schema` documents.
    #[serde(default = "default_schema_directory")]
    #[ortho_config(default = default_schema_directory())]
    pub schema_directory: Utf8PathBuf,
    /// Largest accepted envelope line, in bytes.
    #[serde(default = "default_max_message_bytes")]
    #[ortho_config(default = DEFAULT_MAX_MESSAGE_BYTES)]
    pub max_message_bytes: usize,
    /// Poll interval for schema file watches, in milliseconds.
    #[serde(default = "default_watch_interval_ms")]
    #[ortho_config(default = DEFAULT_WATCH_INTERVAL_MS)]
    pub watch_interval_ms: u64,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format of the log sink.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            schema_directory: default_schema_directory(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            watch_interval_ms: DEFAULT_WATCH_INTERVAL_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint the daemon listens on.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Root directory of the schema store.
    #[must_use]
    pub fn schema_directory(&self) -> &Utf8Path {
        self.schema_directory.as_path()
    }

    /// Largest accepted envelope line, in bytes.
    #[must_use]
    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }

    /// Poll interval for schema file watches.
    #[must_use]
    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format of the log sink.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_documented_values() {
        let config = Config::default();
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.max_message_bytes(), 1024 * 1024);
        assert_eq!(config.watch_interval(), Duration::from_millis(250));
        assert_eq!(config.schema_directory(), Utf8Path::new("schemas"));
    }
}
