//! The JSON Message Protocol daemon.
//!
//! `jmpd` exposes a [`jmp_protocol::MessageHandler`] over a TCP or Unix
//! socket. Bootstrap loads the layered [`jmp_config::Config`], installs
//! structured telemetry, prepares the socket directory and opens the schema
//! directory. [`Daemon::serve`] then binds the listener and answers each JSONL
//! line a client sends with one response frame (see [`ResponseFrame`]).
//!
//! Lifecycle steps are reported to a [`HealthReporter`]; the default
//! [`StructuredHealthReporter`] logs them through `tracing`.

mod bootstrap;
mod builtin;
mod dispatch;
mod health;
mod process;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, ServeError, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use builtin::{ECHO_TYPE, builtin_routes, echo};
pub use dispatch::{MESSAGE_TOO_LARGE_CODE, ResponseFrame, status_for};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, TERMINATION_SIGNALS,
    run_daemon, run_daemon_with,
};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use transport::{ListenerError, ListenerHandle};

#[cfg(test)]
mod tests;
