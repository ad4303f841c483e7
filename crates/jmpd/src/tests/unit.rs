//! Unit tests for the daemon bootstrap.

use std::sync::Arc;

use camino::Utf8PathBuf;
use jmp_config::Config;
use rstest::rstest;

use crate::bootstrap::{ConfigLoader, StaticConfigLoader, bootstrap_with};
use crate::builtin_routes;

use super::support::{FailingConfigLoader, HealthEvent, RecordingHealthReporter, TestConfigLoader};

#[rstest]
fn bootstrap_reports_each_step() {
    let loader = TestConfigLoader::tcp();
    let reporter = Arc::new(RecordingHealthReporter::default());

    let daemon = bootstrap_with(&loader, reporter.clone()).expect("bootstrap should succeed");

    let root = daemon.schemas().root().to_path_buf();
    assert_eq!(
        reporter.events(),
        vec![
            HealthEvent::BootstrapStarting,
            HealthEvent::SchemaStoreReady(root),
            HealthEvent::BootstrapSucceeded,
        ]
    );
    assert_eq!(daemon.config().max_message_bytes(), 4096);
}

#[rstest]
fn bootstrap_does_not_bind_the_socket() {
    let loader = TestConfigLoader::tcp();
    let reporter = Arc::new(RecordingHealthReporter::default());

    bootstrap_with(&loader, reporter.clone()).expect("bootstrap should succeed");

    assert!(!reporter.events().contains(&HealthEvent::ListenerReady));
}

#[rstest]
fn configuration_failures_are_reported() {
    let reporter = Arc::new(RecordingHealthReporter::default());

    let Err(error) = bootstrap_with(&FailingConfigLoader, reporter.clone()) else {
        panic!("invalid socket should fail configuration");
    };

    assert!(error.to_string().contains("failed to load configuration"));
    let events = reporter.events();
    assert_eq!(events.first(), Some(&HealthEvent::BootstrapStarting));
    assert!(matches!(events.last(), Some(HealthEvent::BootstrapFailed(_))));
}

#[rstest]
fn missing_schema_directory_fails_bootstrap() {
    let loader = TestConfigLoader::tcp();
    let mut config = loader.load().expect("config");
    config.schema_directory = Utf8PathBuf::from("/nonexistent/jmpd/schemas");
    let reporter = Arc::new(RecordingHealthReporter::default());

    let Err(error) = bootstrap_with(&StaticConfigLoader::new(config), reporter.clone()) else {
        panic!("missing schema directory should fail bootstrap");
    };

    assert!(error.to_string().contains("failed to open schema directory"));
    assert!(
        !reporter
            .events()
            .iter()
            .any(|event| matches!(event, HealthEvent::SchemaStoreReady(_)))
    );
}

#[test]
fn static_loader_returns_its_configuration() {
    let config = Config {
        max_message_bytes: 17,
        ..Config::default()
    };
    let loaded = StaticConfigLoader::new(config.clone())
        .load()
        .expect("static config");
    assert_eq!(loaded, config);
}

#[rstest]
fn serve_reports_bind_failures() {
    let occupied = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("reserve port");
    let port = occupied.local_addr().expect("addr").port();
    let loader = TestConfigLoader::tcp();
    let mut config = loader.load().expect("config");
    config.daemon_socket = jmp_config::SocketEndpoint::tcp("127.0.0.1", port);
    let reporter = Arc::new(RecordingHealthReporter::default());
    let daemon =
        bootstrap_with(&StaticConfigLoader::new(config), reporter.clone()).expect("bootstrap");

    let error = daemon
        .serve(Arc::new(builtin_routes()))
        .expect_err("port is taken");

    assert!(error.to_string().contains("failed to start socket listener"));
    assert!(matches!(
        reporter.events().last(),
        Some(HealthEvent::ServeFailed(_))
    ));
}
