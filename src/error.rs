//! Error handling for portastack.
use thiserror::Error;

use crate::supervisor::ServiceKind;

/// A managed service that never reached `Running` during the start sequence.
///
/// The start sequence always attempts all three services; the variant carried
/// back to the caller is the first failure in start order. The numeric codes
/// double as the supervisor's own exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StartError {
    /// The web server launch attempt returned no process handle.
    #[error("Failed to start web server.")]
    WebServer,

    /// Neither the database daemon nor its installer-then-retry fallback
    /// produced a running daemon.
    #[error("Failed to start database server.")]
    Database,

    /// The script runtime launch attempt returned no process handle.
    #[error("Failed to start script runtime.")]
    ScriptRuntime,
}

impl StartError {
    /// Process exit code reported when this failure aborts the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            StartError::WebServer => 1,
            StartError::Database => 2,
            StartError::ScriptRuntime => 3,
        }
    }

    /// The failure kind corresponding to a service.
    pub fn for_service(kind: ServiceKind) -> Self {
        match kind {
            ServiceKind::WebServer => StartError::WebServer,
            ServiceKind::Database => StartError::Database,
            ServiceKind::ScriptRuntime => StartError::ScriptRuntime,
        }
    }
}

/// Errors raised while loading or parsing the stack configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error reading or accessing the configuration file.
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Error parsing YAML configuration.
    #[error("Invalid YAML format: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A `${VAR}` reference in the config file has no value in the environment.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Top-level error type for the supervisor binary.
#[derive(Debug, Error)]
pub enum StackError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The event log files could not be opened.
    #[error("Failed to open event log: {0}")]
    Log(std::io::Error),

    /// The signal listener could not be installed.
    #[error("Failed to install signal handlers: {0}")]
    Signals(std::io::Error),
}
