use std::path::PathBuf;

use thiserror::Error;

use forkterm_core::FailureKind;

/// Everything that can stop a launch. Never leaves the crate as an `Err`:
/// [`crate::TerminalLauncher::launch`] folds it into a failed result.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Detect(#[from] forkterm_detector::DetectError),

    #[error(transparent)]
    Command(#[from] forkterm_command::CommandError),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            LaunchError::Io { .. } => FailureKind::IoError,
            LaunchError::Detect(e) => e.kind(),
            LaunchError::Command(e) => e.kind(),
            LaunchError::Spawn { .. } => FailureKind::LaunchFailure,
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LaunchError {
    LaunchError::Io {
        path: path.into(),
        source,
    }
}
