//! Error types for forkterm-core, and the failure taxonomy shared by every
//! crate in the workspace.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::types::{InvalidTaskId, TaskId, TaskStatus};

/// Stable failure categories reported in the `error` field of the JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// No usable launch strategy on this host.
    PlatformUnsupported,
    /// Unknown task kind or a payload that cannot be rendered.
    CommandConstructionError,
    /// The OS refused to spawn the terminal.
    LaunchFailure,
    /// Operation named a task id the registry does not contain.
    RegistryNotFound,
    /// The registry file exists but is not a valid registry document.
    RegistryCorrupt,
    /// A status change out of a terminal status.
    InvalidTransition,
    InvalidArguments,
    ConfigError,
    IoError,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::PlatformUnsupported => "PlatformUnsupported",
            FailureKind::CommandConstructionError => "CommandConstructionError",
            FailureKind::LaunchFailure => "LaunchFailure",
            FailureKind::RegistryNotFound => "RegistryNotFound",
            FailureKind::RegistryCorrupt => "RegistryCorrupt",
            FailureKind::InvalidTransition => "InvalidTransition",
            FailureKind::InvalidArguments => "InvalidArguments",
            FailureKind::ConfigError => "ConfigError",
            FailureKind::IoError => "IoError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All errors that can arise from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure (permission denied, disk full, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (save path).
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The store file exists but does not parse. It is left untouched.
    #[error("registry at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Neither `FORKTERM_HOME` nor a home directory is available.
    #[error("cannot determine home directory; set $HOME or $FORKTERM_HOME")]
    HomeNotFound,

    #[error("task {id} not found")]
    TaskNotFound { id: TaskId },

    #[error("task {id} already exists")]
    DuplicateId { id: TaskId },

    #[error(transparent)]
    InvalidId(#[from] InvalidTaskId),

    #[error("task {id} is already {from}; cannot change status to {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("timed out after {waited:?} waiting for registry lock {path}")]
    LockTimeout { path: PathBuf, waited: Duration },
}

impl RegistryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RegistryError::TaskNotFound { .. } => FailureKind::RegistryNotFound,
            RegistryError::Corrupt { .. } => FailureKind::RegistryCorrupt,
            RegistryError::InvalidTransition { .. } => FailureKind::InvalidTransition,
            RegistryError::DuplicateId { .. } | RegistryError::InvalidId(_) => {
                FailureKind::InvalidArguments
            }
            RegistryError::Io { .. }
            | RegistryError::Serialize(_)
            | RegistryError::HomeNotFound
            | RegistryError::LockTimeout { .. } => FailureKind::IoError,
        }
    }
}

/// Errors loading `config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with the file path and serde_yaml's line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot determine home directory; set $HOME or $FORKTERM_HOME")]
    HomeNotFound,
}

impl ConfigError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::ConfigError
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_mapping() {
        let not_found = RegistryError::TaskNotFound { id: TaskId::from("x") };
        assert_eq!(not_found.kind(), FailureKind::RegistryNotFound);
        assert_eq!(not_found.to_string(), "task x not found");
        assert_eq!(RegistryError::HomeNotFound.kind(), FailureKind::IoError);
    }

    #[test]
    fn failure_kind_serializes_as_name() {
        let json = serde_json::to_string(&FailureKind::RegistryCorrupt).unwrap();
        assert_eq!(json, "\"RegistryCorrupt\"");
        assert_eq!(FailureKind::LaunchFailure.to_string(), "LaunchFailure");
    }
}
