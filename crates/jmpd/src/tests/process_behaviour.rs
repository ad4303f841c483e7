//! Foreground lifecycle: serve until the shutdown signal fires.
#![cfg(unix)]

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{Value, json};

use crate::builtin_routes;
use crate::process::run_daemon_with;

use super::support::{HealthEvent, ManualShutdown, RecordingHealthReporter, TestConfigLoader};

fn wait_for_socket(path: &Path) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if UnixStream::connect(path).is_ok() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn daemon_serves_until_shutdown() {
    let loader = Arc::new(TestConfigLoader::unix());
    loader.given_schema("echo", &json!({"type": "string"}));
    let socket = loader.socket_path().expect("unix endpoint");
    let reporter = Arc::new(RecordingHealthReporter::default());
    let (trigger, shutdown) = ManualShutdown::new();

    let daemon = {
        let loader = Arc::clone(&loader);
        let reporter = Arc::clone(&reporter);
        thread::spawn(move || {
            run_daemon_with(
                loader.as_ref(),
                reporter,
                &shutdown,
                Arc::new(builtin_routes()),
            )
        })
    };
    assert!(wait_for_socket(&socket), "daemon never listened");

    let mut stream = UnixStream::connect(&socket).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout");
    stream
        .write_all(b"{\"i\":\"p1\",\"t\":\"echo\",\"d\":\"up\"}\n")
        .expect("write");
    let mut frame = String::new();
    BufReader::new(&stream)
        .read_line(&mut frame)
        .expect("read frame");
    let frame: Value = serde_json::from_str(&frame).expect("frame is json");
    assert_eq!(frame["envelope"]["r"], "p1");

    trigger.send(()).expect("daemon waiting for shutdown");
    daemon
        .join()
        .expect("daemon thread")
        .expect("clean shutdown");

    assert!(!socket.exists(), "socket removed on shutdown");
    assert!(reporter.events().contains(&HealthEvent::ListenerReady));
}

#[test]
fn serve_failures_end_the_launch() {
    let loader = TestConfigLoader::unix();
    let (_trigger, shutdown) = ManualShutdown::new();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let occupied = loader.socket_path().expect("unix endpoint");
    std::fs::create_dir_all(occupied.parent().expect("socket parent")).expect("run dir");
    std::fs::write(&occupied, b"not a socket").expect("occupy socket path");

    let error = run_daemon_with(&loader, reporter.clone(), &shutdown, Arc::new(builtin_routes()))
        .expect_err("socket path is occupied");

    assert!(error.to_string().starts_with("daemon failed to serve"));
    assert!(matches!(
        reporter.events().last(),
        Some(HealthEvent::ServeFailed(_))
    ));
}
