//! Structured health reporting for daemon lifecycle events.

use std::path::Path;
use std::sync::Arc;

use jmp_config::Config;

use crate::bootstrap::{BootstrapError, ServeError};
use crate::transport::ListenerHandle;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked once the schema directory has been opened.
    fn schema_store_ready(&self, root: &Path);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the listener accepts connections.
    fn listener_ready(&self, listener: &ListenerHandle);

    /// Invoked when the daemon could not start serving.
    fn serve_failed(&self, error: &ServeError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn schema_store_ready(&self, root: &Path) {
        (**self).schema_store_ready(root);
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_ready(&self, listener: &ListenerHandle) {
        (**self).listener_ready(listener);
    }

    fn serve_failed(&self, error: &ServeError) {
        (**self).serve_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn schema_store_ready(&self, root: &Path) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "schema_store_ready",
            root = %root.display(),
            "schema directory opened"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            socket = %config.daemon_socket(),
            schema_directory = %config.schema_directory(),
            max_message_bytes = config.max_message_bytes(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn listener_ready(&self, listener: &ListenerHandle) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_ready",
            endpoint = %listener.endpoint(),
            local_addr = ?listener.local_addr(),
            "daemon accepting connections"
        );
    }

    fn serve_failed(&self, error: &ServeError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "serve_failed",
            error = %error,
            "daemon failed to start serving"
        );
    }
}
