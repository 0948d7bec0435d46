#[path = "common/mod.rs"]
mod common;

use std::fs;

use portastack::logfile::{EventLog, MAX_LOG_SIZE};
use tempfile::tempdir;

#[test]
fn entries_land_on_their_channel() {
    let temp = tempdir().expect("failed to create tempdir");
    let general = temp.path().join("server.log");
    let error = temp.path().join("error.log");

    let mut log = EventLog::open(&general, &error).expect("failed to open event log");
    log.general("stack started");
    log.error("stack exploded");
    drop(log);

    let general_contents = fs::read_to_string(&general).expect("missing general log");
    let error_contents = fs::read_to_string(&error).expect("missing error log");

    assert!(general_contents.contains("] stack started"));
    assert!(!general_contents.contains("exploded"));
    assert!(error_contents.contains("] stack exploded"));
    assert!(!error_contents.contains("stack started"));
}

#[test]
fn oversized_general_log_rotates_once() {
    let temp = tempdir().expect("failed to create tempdir");
    let general = temp.path().join("server.log");
    let error = temp.path().join("error.log");

    let filler = "x".repeat(MAX_LOG_SIZE as usize + 1024);
    fs::write(&general, &filler).expect("failed to seed log");

    let mut log = EventLog::open(&general, &error).expect("failed to open event log");
    log.general("first entry after rotation");
    drop(log);

    let backup = temp.path().join("server.log.old");
    assert!(backup.exists(), "rotation should have produced a backup");
    assert_eq!(fs::read_to_string(&backup).unwrap(), filler);

    let fresh = fs::read_to_string(&general).unwrap();
    assert!(fresh.len() < filler.len());
    assert!(fresh.contains("first entry after rotation"));
    assert_eq!(fresh.lines().count(), 1);
}

#[test]
fn rotation_overwrites_a_previous_backup() {
    let temp = tempdir().expect("failed to create tempdir");
    let general = temp.path().join("server.log");
    let error = temp.path().join("error.log");
    let backup = temp.path().join("server.log.old");

    fs::write(&backup, "stale backup contents").expect("failed to seed backup");
    let filler = "y".repeat(MAX_LOG_SIZE as usize + 1);
    fs::write(&general, &filler).expect("failed to seed log");

    let mut log = EventLog::open(&general, &error).expect("failed to open event log");
    log.general("entry");
    drop(log);

    let rotated = fs::read_to_string(&backup).unwrap();
    assert_eq!(rotated, filler, "old backup should be replaced, not appended to");
}

#[test]
fn error_log_rotates_on_its_own_size() {
    let temp = tempdir().expect("failed to create tempdir");
    let general = temp.path().join("server.log");
    let error = temp.path().join("error.log");

    let filler = "e".repeat(MAX_LOG_SIZE as usize + 1024);
    fs::write(&error, &filler).expect("failed to seed error log");

    let mut log = EventLog::open(&general, &error).expect("failed to open event log");
    log.error("first error after rotation");
    log.general("general stays put");
    drop(log);

    assert!(temp.path().join("error.log.old").exists());
    assert!(!temp.path().join("server.log.old").exists());

    let fresh = fs::read_to_string(&error).unwrap();
    assert!(fresh.contains("first error after rotation"));
    assert_eq!(fresh.lines().count(), 1);
}
