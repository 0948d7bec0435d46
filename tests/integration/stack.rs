#[path = "common/mod.rs"]
mod common;

use std::{
    fs,
    path::Path,
    process::{Command, Stdio},
};

use common::{wait_for_contents, wait_for_path, write_sleeping_stack};
use nix::{
    sys::signal::{self, Signal},
    unistd::Pid,
};
use predicates::str::contains;
use tempfile::tempdir;

fn write_stack_config(dir: &Path, root: &Path) -> std::path::PathBuf {
    let config_path = dir.join("portastack.yaml");
    let config = format!(
        r#"root: {}
web_server:
  dir: nginx
  command: nginx
  stop_command: nginx-quit
database:
  dir: mariadb/bin
  command: mariadbd
  install_command: mariadb-install-db
script_runtime:
  dir: php
  command: php-cgi
"#,
        root.display()
    );
    fs::write(&config_path, config).expect("failed to write config");
    config_path
}

#[test]
fn sigint_stops_the_stack_cleanly() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path().join("server");
    write_sleeping_stack(&root);
    let config_path = write_stack_config(temp.path(), &root);

    let mut child = Command::new(assert_cmd::cargo::cargo_bin!("pstack"))
        .arg("--config")
        .arg(&config_path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn pstack");

    wait_for_path(&root.join("nginx/nginx.pid"));
    // The startup entry is written after the signal listener is installed, so
    // once it appears the process is safe to signal.
    wait_for_contents(
        &root.join("logs/server.log"),
        "Web stack started successfully.",
    );

    signal::kill(Pid::from_raw(child.id() as i32), Signal::SIGINT)
        .expect("failed to deliver SIGINT");

    let status = child.wait().expect("failed to wait for pstack");
    assert!(status.success(), "expected clean exit, got {status:?}");

    let general = fs::read_to_string(root.join("logs/server.log")).unwrap();
    assert!(general.contains("Received signal to stop the stack (signal number: 2)."));
    assert!(general.contains("Web server stopped."));
    assert!(general.contains("Database server stopped."));
    assert!(general.contains("Script runtime stopped."));
    assert!(general.contains("Web stack stopped successfully."));
}

#[test]
fn web_server_start_failure_exits_with_its_code() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path().join("server");
    write_sleeping_stack(&root);
    fs::remove_file(root.join("nginx/nginx")).expect("failed to remove web server");
    let config_path = write_stack_config(temp.path(), &root);

    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("pstack"));
    cmd.arg("--config")
        .arg(&config_path)
        .assert()
        .code(1)
        .stderr(contains("web server"));

    let error_log = fs::read_to_string(root.join("logs/error.log")).unwrap();
    assert!(error_log.contains("Web server failed to start."));
    assert!(error_log.contains("Stack failed to start: Failed to start web server."));

    // The terminate path cleaned up the services that did start.
    let general = fs::read_to_string(root.join("logs/server.log")).unwrap();
    assert!(general.contains("Received signal to stop the stack (signal number: 15)."));
    assert!(general.contains("Database server stopped."));
    assert!(general.contains("Script runtime stopped."));
}

#[test]
fn database_start_failure_exits_with_its_code() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path().join("server");
    write_sleeping_stack(&root);
    fs::remove_file(root.join("mariadb/bin/mariadbd")).expect("failed to remove daemon");
    let config_path = write_stack_config(temp.path(), &root);

    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("pstack"));
    cmd.arg("--config").arg(&config_path).assert().code(2);

    let error_log = fs::read_to_string(root.join("logs/error.log")).unwrap();
    assert!(error_log.contains("Stack failed to start: Failed to start database server."));
}
