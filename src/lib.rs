//! Portastack is a lightweight supervisor for a portable web stack: an
//! externally supplied web server, database daemon, and script runtime. It
//! starts the three services in a fixed order, recovers the database's first
//! launch through its installer, records lifecycle events in a rotating
//! on-disk log, and maps stop signals onto an ordered graceful shutdown.

/// CLI interface.
pub mod cli;

/// Configuration management.
pub mod config;

/// Error handling.
pub mod error;

/// Process launching primitives.
pub mod launcher;

/// Rotating lifecycle event log.
pub mod logfile;

/// Signal handling and shutdown dispatch.
pub mod signals;

/// Service lifecycle supervision.
pub mod supervisor;
