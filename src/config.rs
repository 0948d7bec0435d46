//! Configuration management for portastack.
use regex::Regex;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::ConfigError;

/// On-disk layout of the supervised stack.
///
/// Every field defaults to the conventional portable layout, so a
/// configuration file is only needed to relocate pieces of the stack.
/// Overriding a service replaces that service's whole block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Directory all relative service and log paths resolve against.
    pub root: PathBuf,
    /// Web server layout.
    pub web_server: ServiceConfig,
    /// Database daemon layout.
    pub database: ServiceConfig,
    /// Script runtime layout.
    pub script_runtime: ServiceConfig,
    /// Event log file locations.
    pub logs: LogConfig,
}

/// Layout and launch commands for one managed service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service directory, relative to the stack root.
    pub dir: PathBuf,
    /// Launch command: executable plus arguments, no shell interpretation.
    pub command: String,
    /// One-shot initializer to run when the first launch attempt fails.
    #[serde(default)]
    pub install_command: Option<String>,
    /// Graceful-quit command used instead of forceful termination.
    #[serde(default)]
    pub stop_command: Option<String>,
}

/// Event log file locations, relative to the stack root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// General lifecycle event log.
    pub general: PathBuf,
    /// Error log.
    pub error: PathBuf,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("server"),
            web_server: ServiceConfig {
                dir: PathBuf::from("nginx"),
                command: "nginx".into(),
                install_command: None,
                stop_command: Some("nginx -s quit".into()),
            },
            database: ServiceConfig {
                dir: PathBuf::from("mariadb/bin"),
                command: "mariadbd".into(),
                install_command: Some("mariadb-install-db".into()),
                stop_command: None,
            },
            script_runtime: ServiceConfig {
                dir: PathBuf::from("php"),
                command: "php-cgi -b 127.0.0.1:9000".into(),
                install_command: None,
                stop_command: None,
            },
            logs: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            general: PathBuf::from("logs/server.log"),
            error: PathBuf::from("logs/error.log"),
        }
    }
}

impl StackConfig {
    /// Resolves a layout path against the stack root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Working directory of a service.
    pub fn service_dir(&self, service: &ServiceConfig) -> PathBuf {
        self.resolve(&service.dir)
    }

    /// Location of the general event log.
    pub fn general_log_path(&self) -> PathBuf {
        self.resolve(&self.logs.general)
    }

    /// Location of the error log.
    pub fn error_log_path(&self) -> PathBuf {
        self.resolve(&self.logs.error)
    }
}

/// Expands environment variables within a string.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").unwrap();
    let mut missing: Option<String> = None;

    let result = re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ConfigError::MissingEnvVar(name)),
        None => Ok(result.to_string()),
    }
}

/// Loads and parses the configuration file, expanding environment variables.
///
/// With no explicit path, `portastack.yaml` is used when present and the
/// default layout otherwise. An explicit path that does not exist is an error.
pub fn load_config(config_path: Option<&str>) -> Result<StackConfig, ConfigError> {
    let path = match config_path {
        Some(path) => Path::new(path),
        None => {
            let default = Path::new("portastack.yaml");
            if !default.exists() {
                debug!("No configuration file present; using the default stack layout");
                return Ok(StackConfig::default());
            }
            default
        }
    };

    let content = fs::read_to_string(path).map_err(|e| {
        ConfigError::Read(std::io::Error::new(
            e.kind(),
            format!("{} ({})", e, path.display()),
        ))
    })?;

    let expanded = expand_env_vars(&content)?;
    let config: StackConfig = serde_yaml::from_str(&expanded)?;
    Ok(config)
}
