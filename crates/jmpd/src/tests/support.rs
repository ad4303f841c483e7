//! Shared collaborators for the daemon test suites.

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, mpsc};

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig as _, OrthoError};
use serde_json::Value;
use tempfile::TempDir;

use jmp_config::{Config, SocketEndpoint};

use crate::bootstrap::{BootstrapError, ConfigLoader, ServeError};
use crate::health::HealthReporter;
use crate::process::{ShutdownError, ShutdownSignal};
use crate::transport::ListenerHandle;

/// Loader that points the daemon at scratch directories.
pub struct TestConfigLoader {
    schemas: TempDir,
    sockets: TempDir,
    endpoint: SocketEndpoint,
    max_message_bytes: usize,
}

impl TestConfigLoader {
    /// Listens on an ephemeral loopback TCP port.
    pub fn tcp() -> Self {
        Self::with_endpoint(|_| SocketEndpoint::tcp("127.0.0.1", 0))
    }

    /// Listens on a Unix socket inside a scratch directory.
    #[cfg(unix)]
    pub fn unix() -> Self {
        Self::with_endpoint(|dir| {
            let path = Utf8PathBuf::from_path_buf(dir.path().join("run").join("jmpd.sock"))
                .expect("utf8 socket path");
            SocketEndpoint::unix(path)
        })
    }

    fn with_endpoint(endpoint: impl FnOnce(&TempDir) -> SocketEndpoint) -> Self {
        let schemas = TempDir::new().expect("schema dir");
        let sockets = TempDir::new().expect("socket dir");
        let endpoint = endpoint(&sockets);
        Self {
            schemas,
            sockets,
            endpoint,
            max_message_bytes: 4096,
        }
    }

    pub fn with_max_message_bytes(mut self, limit: usize) -> Self {
        self.max_message_bytes = limit;
        self
    }

    /// Writes `document` as the schema of `message_type`.
    pub fn given_schema(&self, message_type: &str, document: &Value) {
        let path = self
            .schemas
            .path()
            .join(format!("{}.schema", message_type.replace('.', "/")));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("schema dirs");
        }
        fs::write(path, document.to_string()).expect("write schema");
    }

    pub fn socket_path(&self) -> Option<PathBuf> {
        self.endpoint
            .unix_path()
            .map(|path| path.as_std_path().to_path_buf())
    }

    pub fn socket_dir(&self) -> &std::path::Path {
        self.sockets.path()
    }

    fn schema_directory(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.schemas.path().to_path_buf()).expect("utf8 schema dir")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            daemon_socket: self.endpoint.clone(),
            schema_directory: self.schema_directory(),
            max_message_bytes: self.max_message_bytes,
            watch_interval_ms: 10,
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an invalid socket on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("jmpd"),
            OsString::from("--daemon-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}

/// Health events recorded during a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    SchemaStoreReady(PathBuf),
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerReady,
    ServeFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events.lock().expect("events lock").clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn schema_store_ready(&self, root: &std::path::Path) {
        self.record(HealthEvent::SchemaStoreReady(root.to_path_buf()));
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, _listener: &ListenerHandle) {
        self.record(HealthEvent::ListenerReady);
    }

    fn serve_failed(&self, error: &ServeError) {
        self.record(HealthEvent::ServeFailed(error.to_string()));
    }
}

/// Shutdown signal fired by the test through the returned sender.
pub struct ManualShutdown {
    receiver: Mutex<mpsc::Receiver<()>>,
}

impl ManualShutdown {
    pub fn new() -> (mpsc::Sender<()>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            sender,
            Self {
                receiver: Mutex::new(receiver),
            },
        )
    }
}

impl ShutdownSignal for ManualShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        // A dropped sender also releases the daemon.
        let _ = self.receiver.lock().expect("receiver lock").recv();
        Ok(())
    }
}
