//! Error types for the bootstrap procedure
//!
//! Every step of the procedure has its own variant. All of them are fatal:
//! the bootstrapper halts on the first one and never retries.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Top-level error returned by the bootstrapper and the command handlers
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Cloning the external repository failed (network, auth, directory conflict)
    #[error("Acquisition failed: {message}")]
    Acquisition {
        message: String,
        exit_code: Option<i32>,
    },

    /// The pinned revision could not be checked out
    #[error("Revision {revision} could not be checked out: {message}")]
    Revision {
        revision: String,
        message: String,
        exit_code: Option<i32>,
    },

    /// Pulling from the remote's default branch failed
    #[error("Synchronization failed: {message}")]
    Sync {
        message: String,
        exit_code: Option<i32>,
    },

    /// The environment setup script failed
    #[error("Environment setup failed: {0}")]
    EnvironmentSetup(ProvisionError),

    /// The package installation script failed
    #[error("Package installation failed: {0}")]
    PackageInstall(ProvisionError),

    /// Writing the disassembler path into the external tool's config failed
    #[error("Configuration of the external tool failed: {0}")]
    Configure(#[from] ConfigureError),

    /// The bootstrapper's own configuration is unusable
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of an external provisioning procedure
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("script {0} not found")]
    MissingScript(String),

    #[error("{script} exited with {}", describe_exit(.code))]
    Failed { script: String, code: Option<i32> },

    #[error("could not launch {script}: {source}")]
    Launch {
        script: String,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Failure while editing the external tool's configuration file
#[derive(Debug, Error)]
pub enum ConfigureError {
    #[error("disassembler path {0} must be an absolute path to an existing file")]
    InvalidDisassembler(String),

    #[error("config file {0} does not exist")]
    MissingConfigFile(String),

    #[error("setting {key} not found in {file}")]
    MissingSetting { key: String, file: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems loading or validating the bootstrapper configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse {path}: {reason}")]
    ParsingFailed { path: String, reason: String },

    #[error("No revision to pin: set `revision` in .fiber-bootstrap.toml, FIBER_REVISION or --revision")]
    MissingRevision,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Step-level error classification carried by a failed stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Acquisition,
    Revision,
    Sync,
    EnvironmentSetup,
    PackageInstall,
    Configure,
    Config,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Acquisition => "AcquisitionError",
            ErrorKind::Revision => "RevisionError",
            ErrorKind::Sync => "SyncError",
            ErrorKind::EnvironmentSetup => "EnvironmentSetupError",
            ErrorKind::PackageInstall => "PackageInstallError",
            ErrorKind::Configure => "ConfigureError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Io => "IoError",
        };
        f.write_str(name)
    }
}

impl BootstrapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BootstrapError::Acquisition { .. } => ErrorKind::Acquisition,
            BootstrapError::Revision { .. } => ErrorKind::Revision,
            BootstrapError::Sync { .. } => ErrorKind::Sync,
            BootstrapError::EnvironmentSetup(_) => ErrorKind::EnvironmentSetup,
            BootstrapError::PackageInstall(_) => ErrorKind::PackageInstall,
            BootstrapError::Configure(_) => ErrorKind::Configure,
            BootstrapError::Config(_) => ErrorKind::Config,
            BootstrapError::Io(_) | BootstrapError::Json(_) => ErrorKind::Io,
        }
    }

    /// Whether a bootstrap stage failed, as opposed to setup before any stage
    pub fn is_step_failure(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Config | ErrorKind::Io)
    }

    /// Process exit status for this error.
    ///
    /// Propagates the failing external command's own code when it exited
    /// with one, otherwise 1.
    pub fn exit_code(&self) -> i32 {
        let code = match self {
            BootstrapError::Acquisition { exit_code, .. }
            | BootstrapError::Revision { exit_code, .. }
            | BootstrapError::Sync { exit_code, .. } => *exit_code,
            BootstrapError::EnvironmentSetup(e) | BootstrapError::PackageInstall(e) => match e {
                ProvisionError::Failed { code, .. } => *code,
                _ => None,
            },
            _ => None,
        };
        match code {
            Some(c) if c != 0 => c,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
