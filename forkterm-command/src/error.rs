//! Error types for forkterm-command.

use std::path::PathBuf;

use thiserror::Error;

use forkterm_core::{FailureKind, TaskKind, UnknownTaskKind};

use crate::dialect::ShellDialect;

/// All errors that can arise while rendering a command line.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    UnknownKind(#[from] UnknownTaskKind),

    #[error("{kind} task has an empty payload")]
    EmptyPayload { kind: TaskKind },

    /// The text cannot be expressed in the target dialect (e.g. a NUL byte).
    #[error("cannot render text for {dialect}: {reason}")]
    Unrenderable {
        dialect: ShellDialect,
        reason: String,
    },

    /// `--with-context` named a file that could not be read.
    #[error("cannot read context file {path}: {source}")]
    ContextUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CommandError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::CommandConstructionError
    }
}
