//! Malformed configuration files abort loading instead of being ignored.

use std::ffi::OsString;
use std::fs;

use tempfile::TempDir;

use jmp_config::Config;
use ortho_config::OrthoConfig as _;

#[test]
fn malformed_config_file_is_reported() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("jmp.toml");
    fs::write(
        &path,
        r#"daemon_socket = { transport = "tcp", port = not_a_number }"#,
    )
    .expect("write malformed config");

    let args = vec![
        OsString::from("jmpd"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    let message = error.to_string();
    assert!(!message.is_empty(), "error should describe the failure");
}
