//! Lifecycle supervision for the managed stack services.
//!
//! The supervisor owns the three managed services and drives each through the
//! state machine `NotStarted -> Starting -> Running -> Stopping -> Stopped`,
//! with `Failed` reserved for start-time failures. Starting and stopping
//! always walk the services in the same fixed order: web server, database,
//! script runtime.

use std::path::{Path, PathBuf};

use strum_macros::AsRefStr;
use tracing::{debug, error, info, warn};

use crate::{
    config::{ServiceConfig, StackConfig},
    error::StartError,
    launcher::{self, ServiceHandle},
    logfile::{SharedEventLog, log_error, log_general},
};

/// Identifies one of the three supervised services. Declaration order is the
/// start order and the shutdown order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum ServiceKind {
    /// Front-end HTTP server.
    #[strum(serialize = "web server")]
    WebServer,
    /// Database daemon.
    #[strum(serialize = "database server")]
    Database,
    /// Script interpreter daemon behind the web server.
    #[strum(serialize = "script runtime")]
    ScriptRuntime,
}

impl ServiceKind {
    /// Sentence-leading form of the service name.
    pub fn title(&self) -> &'static str {
        match self {
            ServiceKind::WebServer => "Web server",
            ServiceKind::Database => "Database server",
            ServiceKind::ScriptRuntime => "Script runtime",
        }
    }
}

/// Lifecycle states for a managed service.
///
/// `Failed` is only reachable from `NotStarted`/`Starting`; a running service
/// that refuses to stop cleanly is logged and still forced to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    NotStarted,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

/// Launch candidates for a service, in priority order.
#[derive(Debug, Clone)]
enum StartPlan {
    /// One launch attempt; no handle means the service has failed.
    Single(String),
    /// When the daemon's first launch yields no handle, run the one-shot
    /// installer to completion and try the daemon once more. A daemon pointed
    /// at a never-initialized data directory is expected to fail its first
    /// launch.
    InstallThenRetry { daemon: String, installer: String },
}

/// One supervised executable and its lifecycle bookkeeping.
///
/// The handle is present exactly while the state is `Starting`, `Running` or
/// `Stopping`.
pub struct ManagedService {
    kind: ServiceKind,
    working_dir: PathBuf,
    plan: StartPlan,
    quit_command: Option<String>,
    handle: Option<ServiceHandle>,
    state: ServiceState,
}

impl ManagedService {
    fn from_config(kind: ServiceKind, config: &StackConfig, service: &ServiceConfig) -> Self {
        let plan = match &service.install_command {
            Some(installer) => StartPlan::InstallThenRetry {
                daemon: service.command.clone(),
                installer: installer.clone(),
            },
            None => StartPlan::Single(service.command.clone()),
        };

        Self {
            kind,
            working_dir: config.service_dir(service),
            plan,
            quit_command: service.stop_command.clone(),
            handle: None,
            state: ServiceState::NotStarted,
        }
    }

    /// Which service this record tracks.
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// OS process id while the service holds a live handle.
    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().map(ServiceHandle::pid)
    }
}

/// Owns the three managed services and runs the ordered start and shutdown
/// sequences. No other component holds or mutates process handles.
pub struct ServiceSupervisor {
    services: Vec<ManagedService>,
    log: SharedEventLog,
}

impl ServiceSupervisor {
    /// Builds the supervisor from the configured layout.
    pub fn new(config: &StackConfig, log: SharedEventLog) -> Self {
        let services = vec![
            ManagedService::from_config(ServiceKind::WebServer, config, &config.web_server),
            ManagedService::from_config(ServiceKind::Database, config, &config.database),
            ManagedService::from_config(ServiceKind::ScriptRuntime, config, &config.script_runtime),
        ];

        Self { services, log }
    }

    /// Runs the ordered start sequence.
    ///
    /// All three services are always attempted so the logs cover every
    /// failure; the returned error is the first failure in start order. There
    /// is no rollback: services that did start stay `Running`, and the caller
    /// cleans them up through the shutdown path.
    pub fn start_all(&mut self) -> Result<(), StartError> {
        let mut first_failure = None;

        for service in &mut self.services {
            let started = Self::start_service(service, &self.log);
            if !started && first_failure.is_none() {
                first_failure = Some(StartError::for_service(service.kind));
            }
        }

        match first_failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    /// Stops every service that still holds a process handle, in start order.
    ///
    /// Safe to call repeatedly: a service with no handle is skipped with an
    /// "already stopped" entry, and no process is ever launched on behalf of
    /// an already-stopped service. Stop failures are logged and never
    /// escalated, so all three services are always attempted.
    pub fn shutdown_all(&mut self) {
        for service in &mut self.services {
            Self::stop_service(service, &self.log);
        }
    }

    /// Non-blocking sweep of the live handles, reaping any service process
    /// that has exited. Returns true once no service holds a handle.
    pub fn poll_exited(&mut self) -> bool {
        for service in &mut self.services {
            if let Some(handle) = service.handle.as_mut() {
                match handle.try_wait() {
                    Ok(Some(status)) => {
                        debug!("{} exited with {status}", service.kind.as_ref());
                        service.handle = None;
                        service.state = ServiceState::Stopped;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!("Failed to probe {}: {err}", service.kind.as_ref());
                    }
                }
            }
        }

        self.services.iter().all(|service| service.handle.is_none())
    }

    /// Read-only view of the managed services, in start order.
    pub fn services(&self) -> &[ManagedService] {
        &self.services
    }

    /// Current lifecycle state of one service.
    pub fn state(&self, kind: ServiceKind) -> ServiceState {
        self.services
            .iter()
            .find(|service| service.kind == kind)
            .map(|service| service.state)
            .unwrap_or(ServiceState::NotStarted)
    }

    fn start_service(service: &mut ManagedService, log: &SharedEventLog) -> bool {
        info!("Starting {}...", service.kind.as_ref());
        log_general(log, &format!("Starting {}...", service.kind.as_ref()));
        service.state = ServiceState::Starting;

        let handle = match &service.plan {
            StartPlan::Single(command) => launcher::launch(&service.working_dir, command),
            StartPlan::InstallThenRetry { daemon, installer } => Self::start_with_installer(
                service.kind,
                &service.working_dir,
                daemon,
                installer,
                log,
            ),
        };

        match handle {
            Some(handle) => {
                debug!("{} running with PID {}", service.kind.as_ref(), handle.pid());
                service.handle = Some(handle);
                service.state = ServiceState::Running;
                true
            }
            None => {
                error!("Error starting {}.", service.kind.as_ref());
                log_error(log, &format!("{} failed to start.", service.kind.title()));
                service.state = ServiceState::Failed;
                false
            }
        }
    }

    /// Install-then-retry start path: run the installer to completion, then
    /// give the daemon a second chance.
    fn start_with_installer(
        kind: ServiceKind,
        working_dir: &Path,
        daemon: &str,
        installer: &str,
        log: &SharedEventLog,
    ) -> Option<ServiceHandle> {
        if let Some(handle) = launcher::launch(working_dir, daemon) {
            return Some(handle);
        }

        warn!(
            "First {} launch failed; running installer `{installer}`",
            kind.as_ref()
        );
        log_general(
            log,
            &format!("First {} start failed; running installer.", kind.as_ref()),
        );

        let mut install = launcher::launch(working_dir, installer)?;
        if let Err(err) = install.wait() {
            warn!("Failed waiting for {} installer: {err}", kind.as_ref());
        }

        launcher::launch(working_dir, daemon)
    }

    fn stop_service(service: &mut ManagedService, log: &SharedEventLog) {
        log_general(log, &format!("Stopping {}...", service.kind.as_ref()));

        let Some(mut handle) = service.handle.take() else {
            log_general(log, &format!("{} already stopped.", service.kind.title()));
            return;
        };

        service.state = ServiceState::Stopping;

        match service.quit_command.clone() {
            Some(quit) => {
                Self::graceful_stop(service.kind, &service.working_dir, &quit, &mut handle, log)
            }
            None => Self::forced_stop(service.kind, &mut handle, log),
        }

        service.state = ServiceState::Stopped;
        log_general(log, &format!("{} stopped.", service.kind.title()));
    }

    /// Launches the service's quit command and drains the main process.
    ///
    /// Falls back to forced termination when the quit helper cannot be
    /// launched, so shutdown always completes.
    fn graceful_stop(
        kind: ServiceKind,
        working_dir: &Path,
        quit: &str,
        handle: &mut ServiceHandle,
        log: &SharedEventLog,
    ) {
        let Some(mut quit_process) = launcher::launch(working_dir, quit) else {
            log_error(
                log,
                &format!("{} quit command failed; terminating instead.", kind.title()),
            );
            Self::forced_stop(kind, handle, log);
            return;
        };

        // A quit helper that ran but reported failure has not stopped the
        // service; waiting on the main handle would hang shutdown.
        match quit_process.wait() {
            Ok(status) if !status.success() => {
                warn!("{} quit helper exited with {status}", kind.as_ref());
                log_error(
                    log,
                    &format!("{} quit command failed; terminating instead.", kind.title()),
                );
                Self::forced_stop(kind, handle, log);
                return;
            }
            Err(err) => {
                warn!("Failed waiting for {} quit helper: {err}", kind.as_ref());
            }
            Ok(_) => {}
        }

        if let Err(err) = handle.wait() {
            warn!("Failed waiting for {} to exit: {err}", kind.as_ref());
            log_error(log, &format!("{} did not stop cleanly.", kind.title()));
        }
    }

    fn forced_stop(kind: ServiceKind, handle: &mut ServiceHandle, log: &SharedEventLog) {
        if let Err(err) = handle.terminate() {
            warn!("Failed to terminate {}: {err}", kind.as_ref());
            log_error(log, &format!("{} did not stop cleanly.", kind.title()));
        }
    }
}
