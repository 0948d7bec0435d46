use std::{
    process,
    sync::{Arc, Mutex, PoisonError},
    thread,
    time::Duration,
};

use tracing::error;
use tracing_subscriber::EnvFilter;

use portastack::{
    cli::{Cli, parse_args},
    config::load_config,
    error::StackError,
    logfile::{EventLog, log_error, log_general},
    signals::{SignalDispatcher, SignalKind},
    supervisor::ServiceSupervisor,
};

/// Poll interval for the wait-for-exit loop.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exit code for failures outside the start sequence (config, log setup).
const UNKNOWN_ERROR_CODE: i32 = 99;

fn main() {
    let args = parse_args();
    init_logging(&args);

    match run(&args) {
        Ok(code) => process::exit(code),
        Err(err) => {
            error!("{err}");
            process::exit(UNKNOWN_ERROR_CODE);
        }
    }
}

fn run(args: &Cli) -> Result<i32, StackError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(root) = &args.root {
        config.root = root.clone();
    }

    let log = Arc::new(Mutex::new(
        EventLog::open(&config.general_log_path(), &config.error_log_path())
            .map_err(StackError::Log)?,
    ));

    let supervisor = Arc::new(Mutex::new(ServiceSupervisor::new(
        &config,
        Arc::clone(&log),
    )));
    let dispatcher = SignalDispatcher::new(Arc::clone(&supervisor), Arc::clone(&log));

    println!("Starting web stack...");
    let started = supervisor
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .start_all();

    print_firewall_banner();

    dispatcher
        .clone()
        .spawn_listener()
        .map_err(StackError::Signals)?;

    if let Err(failure) = started {
        eprintln!("Error starting web stack: {failure}");
        log_error(&log, &format!("Stack failed to start: {failure}"));
        // Drive the terminate path so services that did start are cleaned up.
        dispatcher.dispatch(SignalKind::Terminate);
        return Ok(failure.exit_code());
    }

    println!("Web stack is running!");
    println!("Press Ctrl+C to stop the stack.");
    log_general(&log, "Web stack started successfully.");

    wait_for_services(&supervisor);

    Ok(0)
}

/// Blocks until every managed service process has exited, naturally or via a
/// dispatched shutdown.
///
/// The signal listener needs the supervisor lock to run a shutdown, so the
/// wait is a cooperative poll rather than a blocking OS wait.
fn wait_for_services(supervisor: &Arc<Mutex<ServiceSupervisor>>) {
    loop {
        let all_exited = supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .poll_exited();
        if all_exited {
            return;
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

fn print_firewall_banner() {
    println!();
    println!("****************************************************************");
    println!("Allow any firewall prompts for the stack services, or the stack");
    println!("will not be reachable from the network.");
    println!("****************************************************************");
    println!();
}

fn init_logging(args: &Cli) {
    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
