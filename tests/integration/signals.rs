#[path = "common/mod.rs"]
mod common;

use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use portastack::{
    config::StackConfig,
    logfile::EventLog,
    signals::{SignalDispatcher, SignalKind},
    supervisor::ServiceSupervisor,
};
use tempfile::tempdir;

/// Dispatcher over a never-started supervisor: shutdown entries reduce to
/// skips, leaving the signal narrative easy to assert on.
fn dispatcher_fixture(root: &Path) -> SignalDispatcher {
    let config = StackConfig {
        root: root.to_path_buf(),
        ..StackConfig::default()
    };

    let log = Arc::new(Mutex::new(
        EventLog::open(&config.general_log_path(), &config.error_log_path())
            .expect("failed to open event log"),
    ));
    let supervisor = Arc::new(Mutex::new(ServiceSupervisor::new(&config, Arc::clone(&log))));

    SignalDispatcher::new(supervisor, log)
}

fn read_channels(root: &Path) -> (String, String) {
    let general = fs::read_to_string(root.join("logs/server.log")).unwrap_or_default();
    let error = fs::read_to_string(root.join("logs/error.log")).unwrap_or_default();
    (general, error)
}

#[test]
fn interrupt_logs_a_clean_stop() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path().join("server");
    let dispatcher = dispatcher_fixture(&root);

    dispatcher.dispatch(SignalKind::Interrupt);

    let (general, error) = read_channels(&root);
    assert!(general.contains("Received signal to stop the stack (signal number: 2)."));
    assert!(general.contains("Web stack stopped successfully."));
    assert!(!error.contains("unexpectedly"));
}

#[test]
fn terminate_logs_on_both_channels() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path().join("server");
    let dispatcher = dispatcher_fixture(&root);

    dispatcher.dispatch(SignalKind::Terminate);

    let (general, error) = read_channels(&root);
    assert!(general.contains("Received signal to stop the stack (signal number: 15)."));
    assert!(general.contains("Web stack terminated."));
    assert!(error.contains("Web stack terminated unexpectedly."));
}

#[test]
fn abort_logs_on_both_channels() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path().join("server");
    let dispatcher = dispatcher_fixture(&root);

    dispatcher.dispatch(SignalKind::Abort);

    let (general, error) = read_channels(&root);
    assert!(general.contains("Web stack aborted."));
    assert!(error.contains("Web stack aborted unexpectedly."));
}

#[test]
fn unknown_signal_quotes_its_number() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path().join("server");
    let dispatcher = dispatcher_fixture(&root);

    dispatcher.dispatch(SignalKind::Unknown(31));

    let (general, error) = read_channels(&root);
    assert!(general.contains("Received signal to stop the stack (signal number: 31)."));
    assert!(general.contains("Web stack received unknown signal (31). Exiting..."));
    assert!(error.contains("Web stack received unknown signal (31). Exiting..."));
}

#[test]
fn every_dispatch_walks_the_shutdown_order() {
    let temp = tempdir().expect("failed to create tempdir");
    let root = temp.path().join("server");
    let dispatcher = dispatcher_fixture(&root);

    dispatcher.dispatch(SignalKind::Interrupt);

    let (general, _) = read_channels(&root);
    let web = general.find("Stopping web server...").expect("web entry");
    let db = general.find("Stopping database server...").expect("db entry");
    let script = general.find("Stopping script runtime...").expect("script entry");
    assert!(web < db && db < script, "shutdown entries out of order");
}
