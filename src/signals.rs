//! Maps process termination signals onto the supervisor's shutdown sequence.

use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
};

use signal_hook::{
    consts::signal::{SIGABRT, SIGINT, SIGTERM},
    iterator::Signals,
};
use strum_macros::AsRefStr;
use tracing::info;

use crate::{
    logfile::{SharedEventLog, log_error, log_general},
    supervisor::ServiceSupervisor,
};

/// External stop requests the supervisor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SignalKind {
    /// Interactive interrupt (Ctrl+C): the normal way to stop the stack.
    Interrupt,
    /// Termination request from the system or another process.
    Terminate,
    /// Abnormal termination of the supervisor itself.
    Abort,
    /// Anything else that reaches the handler.
    Unknown(i32),
}

impl SignalKind {
    /// Maps a raw signal number onto a known kind.
    pub fn from_raw(signal: i32) -> Self {
        match signal {
            SIGINT => SignalKind::Interrupt,
            SIGTERM => SignalKind::Terminate,
            SIGABRT => SignalKind::Abort,
            other => SignalKind::Unknown(other),
        }
    }

    /// The raw signal number behind this kind.
    pub fn raw(&self) -> i32 {
        match self {
            SignalKind::Interrupt => SIGINT,
            SignalKind::Terminate => SIGTERM,
            SignalKind::Abort => SIGABRT,
            SignalKind::Unknown(signal) => *signal,
        }
    }
}

/// Routes stop requests to [`ServiceSupervisor::shutdown_all`], recording the
/// signal-specific narrative in the event log.
#[derive(Clone)]
pub struct SignalDispatcher {
    supervisor: Arc<Mutex<ServiceSupervisor>>,
    log: SharedEventLog,
}

impl SignalDispatcher {
    pub fn new(supervisor: Arc<Mutex<ServiceSupervisor>>, log: SharedEventLog) -> Self {
        Self { supervisor, log }
    }

    /// Runs the full shutdown sequence for one received stop request.
    ///
    /// Never exits the hosting process: once the services are down, the
    /// orchestrator's wait loop observes the released handles and returns on
    /// its own.
    pub fn dispatch(&self, kind: SignalKind) {
        info!(
            "Dispatching shutdown for {} signal ({})",
            kind.as_ref(),
            kind.raw()
        );
        log_general(
            &self.log,
            &format!(
                "Received signal to stop the stack (signal number: {}).",
                kind.raw()
            ),
        );

        self.supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shutdown_all();

        match kind {
            SignalKind::Interrupt => {
                log_general(&self.log, "Web stack stopped successfully.");
            }
            SignalKind::Terminate => {
                log_general(&self.log, "Web stack terminated.");
                log_error(&self.log, "Web stack terminated unexpectedly.");
            }
            SignalKind::Abort => {
                log_general(&self.log, "Web stack aborted.");
                log_error(&self.log, "Web stack aborted unexpectedly.");
            }
            SignalKind::Unknown(signal) => {
                let message =
                    format!("Web stack received unknown signal ({signal}). Exiting...");
                log_general(&self.log, &message);
                log_error(&self.log, &message);
            }
        }
    }

    /// Spawns the listener thread that waits for SIGINT, SIGTERM and SIGABRT
    /// and dispatches each delivery in order.
    pub fn spawn_listener(self) -> io::Result<JoinHandle<()>> {
        let mut signals = Signals::new([SIGINT, SIGTERM, SIGABRT])?;

        Ok(thread::spawn(move || {
            for signal in signals.forever() {
                self.dispatch(SignalKind::from_raw(signal));
            }
        }))
    }
}
