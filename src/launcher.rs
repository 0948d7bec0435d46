//! Direct process creation for the supervised services.
//!
//! Services are launched without a shell: the command string is split on
//! whitespace and the executable is resolved inside the service's own
//! directory. A launch that the OS rejects is an ordinary outcome reported as
//! `None`, never a panic.

use std::{
    io,
    os::unix::process::CommandExt,
    path::Path,
    process::{Child, Command, ExitStatus},
};

use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::Pid,
};
use tracing::{debug, error, warn};

/// Handle to a launched service process.
///
/// The holder owns the underlying OS process exclusively and is responsible
/// for reaping it exactly once, either by waiting out a natural exit or by
/// calling [`ServiceHandle::terminate`].
pub struct ServiceHandle {
    child: Child,
}

impl ServiceHandle {
    /// OS process id of the service.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Blocks until the process exits and reaps it.
    pub fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait()
    }

    /// Non-blocking exit probe; reaps the process when it has exited.
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Forcefully terminates the service and reaps it.
    ///
    /// Signals the child's whole process group so helpers spawned by the
    /// service go down with it, then delivers SIGKILL to the child itself in
    /// case the group signal could not be sent. A process that is already gone
    /// is not an error.
    pub fn terminate(&mut self) -> io::Result<()> {
        let pid = Pid::from_raw(self.child.id() as i32);

        match signal::kill(pid, None) {
            Err(Errno::ESRCH) => {
                self.child.wait()?;
                return Ok(());
            }
            Err(err) => return Err(io::Error::from_raw_os_error(err as i32)),
            Ok(()) => {}
        }

        // Never signal our own group: the child normally sits in its own
        // process group, but pre_exec setup can be skipped by the OS shims in
        // exotic environments.
        let supervisor_pgid = unsafe { libc::getpgid(0) };
        let child_pgid = unsafe { libc::getpgid(pid.as_raw()) };
        if child_pgid >= 0 && child_pgid != supervisor_pgid {
            let killed = unsafe { libc::killpg(child_pgid, libc::SIGKILL) };
            if killed < 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::ESRCH) {
                    warn!(
                        "Failed to signal process group {child_pgid}: {err}; falling back to PID {pid}"
                    );
                }
            }
        }

        if let Err(err) = signal::kill(pid, Signal::SIGKILL)
            && err != Errno::ESRCH
        {
            return Err(io::Error::from_raw_os_error(err as i32));
        }

        self.child.wait()?;
        Ok(())
    }
}

/// Launches an executable inside `working_dir`.
///
/// `command` is the executable name followed by its arguments, split on
/// whitespace; there is no shell interpretation. The executable is resolved
/// relative to `working_dir`, which also becomes the child's working
/// directory. Returns `None` when the OS fails to create the process: start
/// failure is an expected outcome the caller must check, not an error to
/// propagate.
pub fn launch(working_dir: &Path, command: &str) -> Option<ServiceHandle> {
    let mut parts = command.split_whitespace();
    let program = match parts.next() {
        Some(program) => program,
        None => {
            error!("Refusing to launch empty command in {working_dir:?}");
            return None;
        }
    };

    // spawn resolves a relative program path after chdir, so pin the
    // executable to an absolute path first.
    let program_path = working_dir.join(program);
    let program_path = program_path.canonicalize().unwrap_or(program_path);

    let mut cmd = Command::new(&program_path);
    cmd.args(parts);
    cmd.current_dir(working_dir);

    debug!("Launching `{command}` in {working_dir:?}");

    unsafe {
        cmd.pre_exec(|| {
            // Each service gets its own process group so the whole tree can be
            // signalled without touching the supervisor's group.
            if libc::setpgid(0, 0) < 0 {
                return Err(io::Error::last_os_error());
            }

            // Services must not outlive the supervisor (Linux only).
            #[cfg(target_os = "linux")]
            {
                use libc::{PR_SET_PDEATHSIG, SIGTERM, prctl};
                if prctl(PR_SET_PDEATHSIG, SIGTERM, 0, 0, 0) < 0 {
                    return Err(io::Error::last_os_error());
                }
            }

            Ok(())
        });
    }

    match cmd.spawn() {
        Ok(child) => {
            debug!("Launched `{program}` with PID {}", child.id());
            Some(ServiceHandle { child })
        }
        Err(err) => {
            error!("Failed to launch `{program}` in {working_dir:?}: {err}");
            None
        }
    }
}
