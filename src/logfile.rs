//! Append-only rotating event log for stack lifecycle events.
//!
//! Two channels, each backed by its own file: general lifecycle events and
//! errors. Entries are stamped with local time at second resolution and are
//! immutable once written. A channel whose file grows past [`MAX_LOG_SIZE`] is
//! rotated to a `.old` sibling before the next write lands.

use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Local};
use tracing::error;

/// Size threshold in bytes above which a log file is rotated.
pub const MAX_LOG_SIZE: u64 = 1024 * 1024;

/// Destination channel for a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogChannel {
    /// Routine lifecycle events.
    General,
    /// Failures and unexpected terminations.
    Error,
}

/// One open append-mode log file plus the path needed for rotation.
struct LogStream {
    path: PathBuf,
    file: File,
}

impl LogStream {
    fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// `<path>.old`, the rotation target.
    fn backup_path(&self) -> PathBuf {
        let mut backup = OsString::from(self.path.as_os_str());
        backup.push(".old");
        PathBuf::from(backup)
    }

    fn needs_rotation(&self) -> bool {
        fs::metadata(&self.path)
            .map(|meta| meta.len() > MAX_LOG_SIZE)
            .unwrap_or(false)
    }

    /// Renames the current file to `<path>.old` and reopens a fresh one.
    ///
    /// A rename failure is diagnostic-only: the stream keeps pointing at the
    /// original path so the pending write still lands. Rotation must never
    /// lose a log entry or take the supervisor down.
    fn rotate(&mut self) {
        let backup = self.backup_path();
        let _ = fs::remove_file(&backup);

        if let Err(err) = fs::rename(&self.path, &backup) {
            error!("Failed to rotate log file {:?}: {err}", self.path);
        }

        // The open descriptor follows a successful rename, so reopening swaps
        // the stream back to a fresh primary file; after a failed rename it
        // reattaches to the still-present original.
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => self.file = file,
            Err(err) => {
                error!("Failed to reopen log file {:?} after rotation: {err}", self.path);
            }
        }
    }

    fn append(&mut self, line: &str) {
        if self.needs_rotation() {
            self.rotate();
        }

        if let Err(err) = writeln!(self.file, "{line}") {
            error!("Failed to write log entry to {:?}: {err}", self.path);
        }
    }
}

/// The on-disk event log: a general stream and an error stream, each held open
/// in append mode for the value's lifetime.
pub struct EventLog {
    general: LogStream,
    error: LogStream,
}

impl EventLog {
    /// Opens both channel files in create+append mode.
    pub fn open(general_path: &Path, error_path: &Path) -> io::Result<Self> {
        Ok(Self {
            general: LogStream::open(general_path)?,
            error: LogStream::open(error_path)?,
        })
    }

    /// Appends a formatted entry to the requested channel, rotating that
    /// channel's file first when it has outgrown [`MAX_LOG_SIZE`]. At most one
    /// rotation happens per call.
    pub fn record(&mut self, channel: LogChannel, timestamp: DateTime<Local>, message: &str) {
        let line = format_line(timestamp, message);
        let stream = match channel {
            LogChannel::General => &mut self.general,
            LogChannel::Error => &mut self.error,
        };
        stream.append(&line);
    }

    /// Records a general-channel entry stamped with the current local time.
    pub fn general(&mut self, message: &str) {
        self.record(LogChannel::General, Local::now(), message);
    }

    /// Records an error-channel entry stamped with the current local time.
    pub fn error(&mut self, message: &str) {
        self.record(LogChannel::Error, Local::now(), message);
    }
}

/// Shared handle to the event log.
///
/// The signal listener runs on its own thread, so all writers serialise
/// through the mutex.
pub type SharedEventLog = Arc<Mutex<EventLog>>;

/// Records a general-channel entry through a shared log handle.
pub fn log_general(log: &SharedEventLog, message: &str) {
    log.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .general(message);
}

/// Records an error-channel entry through a shared log handle.
pub fn log_error(log: &SharedEventLog, message: &str) {
    log.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .error(message);
}

/// Formats a single entry line: `[YYYY-MM-DD HH:MM:SS] message`.
fn format_line(timestamp: DateTime<Local>, message: &str) -> String {
    format!("[{}] {message}", timestamp.format("%Y-%m-%d %H:%M:%S"))
}
