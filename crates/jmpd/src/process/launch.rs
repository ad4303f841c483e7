//! Sequences bootstrap, serving, and shutdown.

use std::sync::Arc;

use jmp_protocol::Router;
use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the daemon in the foreground with the production collaborators until
/// a termination signal arrives.
pub fn run_daemon(router: Arc<dyn Router>) -> Result<(), LaunchError> {
    let shutdown = SystemShutdownSignal::install()?;
    let reporter = Arc::new(StructuredHealthReporter::new());
    run_daemon_with(&SystemConfigLoader, reporter, &shutdown, router)
}

/// Runs the daemon with injected collaborators.
pub fn run_daemon_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
    router: Arc<dyn Router>,
) -> Result<(), LaunchError> {
    let daemon = bootstrap_with(loader, reporter)?;
    let listener = daemon.serve(router)?;
    shutdown.wait()?;
    info!(
        target: PROCESS_TARGET,
        endpoint = %listener.endpoint(),
        "stopping listener"
    );
    listener.shutdown();
    listener.join()?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
