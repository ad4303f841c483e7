//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig as _, OrthoError};
use thiserror::Error;

use jmp_config::{Config, EndpointPreparationError};
use jmp_protocol::{
    ConfigurationError, MessageHandler, RandomIdGenerator, Router, SchemaDirectorySource,
};

use crate::dispatch::EnvelopeConnectionHandler;
use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: EndpointPreparationError,
    },
    /// The schema directory could not be opened.
    #[error("failed to open schema directory: {source}")]
    SchemaStore {
        /// Error reported by the schema directory source.
        #[source]
        source: ConfigurationError,
    },
}

/// Errors surfaced while starting to serve connections.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The message handler could not be assembled.
    #[error("failed to build message handler: {source}")]
    Handler {
        /// Underlying configuration error.
        #[source]
        source: ConfigurationError,
    },
    /// The listener could not be bound or started.
    #[error("failed to start socket listener: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    schemas: SchemaDirectorySource,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The schema store backing payload validation.
    #[must_use]
    pub const fn schemas(&self) -> &SchemaDirectorySource {
        &self.schemas
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Binds the configured endpoint and serves envelopes routed by `router`.
    ///
    /// Replies carry random identifiers. The returned handle keeps the
    /// listener running until it is shut down or dropped.
    pub fn serve(&self, router: Arc<dyn Router>) -> Result<ListenerHandle, ServeError> {
        let result = self.start_listener(router);
        match &result {
            Ok(listener) => self.reporter.listener_ready(listener),
            Err(error) => self.reporter.serve_failed(error),
        }
        result
    }

    fn start_listener(&self, router: Arc<dyn Router>) -> Result<ListenerHandle, ServeError> {
        let handler = MessageHandler::builder()
            .shared_router(router)
            .schema_fetcher(self.schemas.clone())
            .id_generator(RandomIdGenerator)
            .build()
            .map_err(|source| ServeError::Handler { source })?;
        let connections = Arc::new(EnvelopeConnectionHandler::new(
            handler,
            self.config.max_message_bytes(),
        ));
        SocketListener::bind(self.config.daemon_socket())
            .and_then(|listener| listener.start(connections))
            .map_err(|source| ServeError::Listener { source })
    }
}

/// Bootstraps the daemon using the supplied collaborators.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match prepare(loader, reporter.as_ref()) {
        Ok((config, schemas, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Daemon {
                config,
                schemas,
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn prepare(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
) -> Result<(Config, SchemaDirectorySource, TelemetryHandle), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    config
        .daemon_socket()
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;
    let schemas = SchemaDirectorySource::with_watch_interval(
        config.schema_directory().as_std_path(),
        config.watch_interval(),
    )
    .map_err(|source| BootstrapError::SchemaStore { source })?;
    reporter.schema_store_ready(schemas.root());
    Ok((config, schemas, telemetry))
}
